//! Revision chains
//!
//! Every document has an append-only, hash-linked history:
//!
//! - block 0 (`Genesis`) records the full initial attribute set
//! - every later block (`Delta`) records an added/modified/deleted diff
//! - each hash covers the space salt, index, previous hash and payload
//!
//! Chains are values. [`Chain::add_block`] returns a new chain; only
//! [`ChainStore`] touches storage.

mod block;
#[allow(clippy::module_inception)]
mod chain;
mod diff;
mod errors;
mod store;

pub use block::{digest, Block, BlockPayload, GENESIS_INDEX};
pub use chain::Chain;
pub use diff::AttributeDiff;
pub use errors::{ChainError, ChainResult};
pub use store::ChainStore;
