//! # Storage Backend Trait

use super::errors::StorageResult;

/// The storage port every higher component is built on.
///
/// Keys are `/`-separated paths. Implementations must be safe for
/// concurrent use by many in-flight tasks.
pub trait StorageBackend: Send + Sync + std::fmt::Debug {
    /// Write data to key, replacing any previous value
    fn write(&self, key: &str, data: &[u8]) -> StorageResult<()>;

    /// Read data from key (`NotFound` when absent)
    fn read(&self, key: &str) -> StorageResult<Vec<u8>>;

    /// Delete the value at key (`NotFound` when absent)
    fn delete(&self, key: &str) -> StorageResult<()>;

    /// Check if key exists
    fn exists(&self, key: &str) -> StorageResult<bool>;

    /// List the full keys directly under prefix. An absent prefix lists as empty.
    fn list(&self, prefix: &str) -> StorageResult<Vec<String>>;
}
