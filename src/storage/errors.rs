//! # Storage Errors

use thiserror::Error;

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage port errors
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// Nothing stored under the key
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Key is empty or would escape the storage root
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Underlying I/O failure
    #[error("I/O error on {key}: {message}")]
    Io { key: String, message: String },

    /// Backend state unusable (poisoned lock, etc.)
    #[error("Internal storage error: {0}")]
    Internal(String),
}

impl StorageError {
    /// I/O failure on a key
    pub fn io(key: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            key: key.into(),
            message: source.to_string(),
        }
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            StorageError::NotFound(_) => "KEK_STORAGE_NOT_FOUND",
            StorageError::InvalidKey(_) => "KEK_STORAGE_INVALID_KEY",
            StorageError::Io { .. } => "KEK_STORAGE_IO_ERROR",
            StorageError::Internal(_) => "KEK_STORAGE_INTERNAL",
        }
    }

    /// Whether this is the absent-key kind
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }

    /// I/O failures may succeed when the caller retries
    pub fn is_retryable(&self) -> bool {
        matches!(self, StorageError::Io { .. })
    }
}
