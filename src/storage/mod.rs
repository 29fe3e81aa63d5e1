//! Storage port for kek
//!
//! Everything above this module talks to storage only through
//! [`StorageBackend`]: a flat key/byte store with save, load, delete, exists
//! and list. Backends are injected into every component; nothing resolves a
//! storage location from ambient state.

mod backend;
mod errors;
pub mod keys;
mod local;
mod memory;

pub use backend::StorageBackend;
pub use errors::{StorageError, StorageResult};
pub use local::LocalBackend;
pub use memory::MemoryBackend;
