//! # Index Errors

use thiserror::Error;
use tokio::task::JoinError;

use crate::storage::StorageError;

/// Result type for index operations
pub type IndexResult<T> = Result<T, IndexError>;

/// Attribute index errors
#[derive(Debug, Clone, Error)]
pub enum IndexError {
    /// A marker write, delete or listing failed
    #[error("Index storage failure: {0}")]
    Storage(#[from] StorageError),

    /// Fan-out task panicked or was cancelled
    #[error("Index task failed: {0}")]
    Task(String),
}

impl IndexError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            IndexError::Storage(_) => "KEK_INDEX_STORAGE",
            IndexError::Task(_) => "KEK_TASK_FAILED",
        }
    }

    /// Underlying storage failure, if this error wraps one
    pub fn storage_source(&self) -> Option<&StorageError> {
        match self {
            IndexError::Storage(e) => Some(e),
            IndexError::Task(_) => None,
        }
    }
}

impl From<JoinError> for IndexError {
    fn from(e: JoinError) -> Self {
        IndexError::Task(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_source() {
        let err = IndexError::from(StorageError::Internal("poisoned".into()));
        assert_eq!(err.code(), "KEK_INDEX_STORAGE");
        assert!(err.storage_source().is_some());
        assert!(IndexError::Task("cancelled".into()).storage_source().is_none());
    }
}
