//! # Space Errors

use thiserror::Error;
use tokio::task::JoinError;

use crate::storage::StorageError;

/// Result type for space operations
pub type SpaceResult<T> = Result<T, SpaceError>;

/// Kekspace errors
#[derive(Debug, Clone, Error)]
pub enum SpaceError {
    /// No kekspace record in storage
    #[error("Kekspace not initialized")]
    NotInitialized,

    /// `create` called on a storage root that already holds a space
    #[error("Kekspace already initialized")]
    AlreadyInitialized,

    /// Space record could not be encoded or decoded
    #[error("Kekspace record unreadable: {0}")]
    Serialization(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Blocking task panicked or was cancelled
    #[error("Space task failed: {0}")]
    Task(String),
}

impl SpaceError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            SpaceError::NotInitialized => "KEK_SPACE_NOT_INITIALIZED",
            SpaceError::AlreadyInitialized => "KEK_SPACE_ALREADY_INITIALIZED",
            SpaceError::Serialization(_) => "KEK_SPACE_SERIALIZATION",
            SpaceError::Storage(e) => e.code(),
            SpaceError::Task(_) => "KEK_TASK_FAILED",
        }
    }
}

impl From<JoinError> for SpaceError {
    fn from(e: JoinError) -> Self {
        SpaceError::Task(e.to_string())
    }
}
