//! # Chain Errors

use thiserror::Error;
use tokio::task::JoinError;

use crate::space::SpaceError;
use crate::storage::StorageError;

/// Result type for chain operations
pub type ChainResult<T> = Result<T, ChainError>;

/// Revision chain errors
#[derive(Debug, Clone, Error)]
pub enum ChainError {
    /// No chain stored for the document
    #[error("Chain not found for document {0}")]
    NotFound(String),

    /// Chain holds no block to link a new one from
    #[error("Chain for document {0} has no block to link from")]
    NoBlocks(String),

    /// `previous_hash` does not match the prior block's hash
    #[error("Broken link at block {index}")]
    BrokenLink { index: u64 },

    /// Block index is not the prior index plus one
    #[error("Index gap at block {index}, expected {expected}")]
    IndexGap { index: u64, expected: u64 },

    /// Stored hash differs from the recomputed digest
    #[error("Hash mismatch at block {index}")]
    HashMismatch { index: u64 },

    /// Document body names a revision other than the chain head
    #[error("Revision of document {0} does not match its chain head")]
    HeadMismatch(String),

    /// Genesis payload after block 0, or a delta at block 0
    #[error("Unexpected payload kind at block {index}")]
    UnexpectedPayload { index: u64 },

    /// Payload or chain could not be encoded or decoded
    #[error("Chain serialization failed: {0}")]
    Serialization(String),

    #[error(transparent)]
    Space(#[from] SpaceError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Blocking task panicked or was cancelled
    #[error("Chain task failed: {0}")]
    Task(String),
}

impl ChainError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            ChainError::NotFound(_) => "KEK_CHAIN_NOT_FOUND",
            ChainError::NoBlocks(_) => "KEK_CHAIN_NO_BLOCKS",
            ChainError::BrokenLink { .. } => "KEK_CHAIN_BROKEN_LINK",
            ChainError::IndexGap { .. } => "KEK_CHAIN_INDEX_GAP",
            ChainError::HashMismatch { .. } => "KEK_CHAIN_HASH_MISMATCH",
            ChainError::HeadMismatch(_) => "KEK_CHAIN_HEAD_MISMATCH",
            ChainError::UnexpectedPayload { .. } => "KEK_CHAIN_UNEXPECTED_PAYLOAD",
            ChainError::Serialization(_) => "KEK_CHAIN_SERIALIZATION",
            ChainError::Space(e) => e.code(),
            ChainError::Storage(e) => e.code(),
            ChainError::Task(_) => "KEK_TASK_FAILED",
        }
    }

    /// Whether the chain itself is damaged, as opposed to being unreachable
    pub fn is_integrity_failure(&self) -> bool {
        matches!(
            self,
            ChainError::BrokenLink { .. }
                | ChainError::IndexGap { .. }
                | ChainError::HashMismatch { .. }
                | ChainError::HeadMismatch(_)
                | ChainError::UnexpectedPayload { .. }
        )
    }

    /// Underlying storage failure, if this error wraps one
    pub fn storage_source(&self) -> Option<&StorageError> {
        match self {
            ChainError::Storage(e) => Some(e),
            ChainError::Space(SpaceError::Storage(e)) => Some(e),
            _ => None,
        }
    }
}

impl From<JoinError> for ChainError {
    fn from(e: JoinError) -> Self {
        ChainError::Task(e.to_string())
    }
}
