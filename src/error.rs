//! Crate-wide error type
//!
//! Lifecycle and query operations return [`KekError`]. Subsystem errors
//! convert into it; their "not found" kinds collapse into
//! [`KekError::NotFound`] so callers match on one variant.

use thiserror::Error;
use tokio::task::JoinError;

use crate::chain::ChainError;
use crate::index::IndexError;
use crate::space::SpaceError;
use crate::storage::StorageError;

/// Result type for lifecycle and query operations
pub type KekResult<T> = Result<T, KekError>;

/// Errors surfaced to callers of the document store
#[derive(Debug, Clone, Error)]
pub enum KekError {
    /// Bad input, e.g. an empty document name
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing document, chain or space
    #[error("Not found: {0}")]
    NotFound(String),

    /// Document body I/O failure
    #[error("Storage error: {0}")]
    Storage(StorageError),

    /// Body or attribute set could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Chain append or verification failure
    #[error("Chain error: {0}")]
    Chain(ChainError),

    /// Index write, remove or lookup failure
    #[error("Index error: {0}")]
    Index(IndexError),

    /// Sort key absent or not a string on some result
    #[error("Type mismatch on '{field}': {message}")]
    TypeMismatch { field: String, message: String },

    /// Kekspace could not be created or loaded
    #[error("Space error: {0}")]
    Space(SpaceError),

    /// Invalid or unreadable configuration
    #[error("Config error: {0}")]
    Config(String),

    /// Blocking task panicked or was cancelled
    #[error("Task failed: {0}")]
    Task(String),
}

impl KekError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound(resource.into())
    }

    pub fn type_mismatch(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TypeMismatch {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "KEK_VALIDATION_ERROR",
            Self::NotFound(_) => "KEK_NOT_FOUND",
            Self::Storage(e) => e.code(),
            Self::Serialization(_) => "KEK_SERIALIZATION_ERROR",
            Self::Chain(e) => e.code(),
            Self::Index(e) => e.code(),
            Self::TypeMismatch { .. } => "KEK_TYPE_MISMATCH",
            Self::Space(e) => e.code(),
            Self::Config(_) => "KEK_CONFIG_ERROR",
            Self::Task(_) => "KEK_TASK_FAILED",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// True only for underlying storage I/O failures. The core never
    /// retries; the caller may.
    pub fn is_retryable(&self) -> bool {
        let source = match self {
            Self::Storage(e) => Some(e),
            Self::Chain(e) => e.storage_source(),
            Self::Index(e) => e.storage_source(),
            Self::Space(SpaceError::Storage(e)) => Some(e),
            _ => None,
        };
        source.map_or(false, StorageError::is_retryable)
    }
}

impl From<StorageError> for KekError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(key) => Self::NotFound(key),
            other => Self::Storage(other),
        }
    }
}

impl From<ChainError> for KekError {
    fn from(e: ChainError) -> Self {
        match e {
            ChainError::NotFound(id) => Self::NotFound(format!("revision chain for {}", id)),
            ChainError::Serialization(msg) => Self::Serialization(msg),
            ChainError::Task(msg) => Self::Task(msg),
            ChainError::Space(e) => Self::from(e),
            other => Self::Chain(other),
        }
    }
}

impl From<IndexError> for KekError {
    fn from(e: IndexError) -> Self {
        match e {
            IndexError::Task(msg) => Self::Task(msg),
            other => Self::Index(other),
        }
    }
}

impl From<SpaceError> for KekError {
    fn from(e: SpaceError) -> Self {
        match e {
            SpaceError::NotInitialized => Self::NotFound("kekspace".to_string()),
            SpaceError::Task(msg) => Self::Task(msg),
            other => Self::Space(other),
        }
    }
}

impl From<JoinError> for KekError {
    fn from(e: JoinError) -> Self {
        Self::Task(e.to_string())
    }
}

impl From<serde_json::Error> for KekError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
