//! Chain persistence
//!
//! One JSON record per document under `r/<id>`. Every operation that hashes
//! loads the kekspace once for its salt; a missing space is fatal.
//!
//! All methods are blocking. Callers on the async side run them through
//! `tasks::run_blocking`.

use std::sync::Arc;

use super::chain::Chain;
use super::diff::AttributeDiff;
use super::errors::{ChainError, ChainResult};
use crate::document::Attributes;
use crate::observability::{log_event_with_fields, Event};
use crate::space::Kekspace;
use crate::storage::keys::chain_key;
use crate::storage::{StorageBackend, StorageError};

/// Reads and writes revision chains through the storage port
#[derive(Debug, Clone)]
pub struct ChainStore {
    backend: Arc<dyn StorageBackend>,
}

impl ChainStore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    /// Start and persist the chain for a new document.
    pub fn create(&self, document_id: &str, attributes: Attributes) -> ChainResult<Chain> {
        let space = Kekspace::load(self.backend.as_ref())?;
        let chain = Chain::new(document_id, &space, attributes)?;
        self.save(&chain)?;

        log_event_with_fields(
            Event::ChainCreated,
            &[("id", document_id), ("head", chain.head_hash())],
        );
        Ok(chain)
    }

    /// Append one delta block and persist the result.
    pub fn append(&self, document_id: &str, diff: AttributeDiff) -> ChainResult<Chain> {
        let space = Kekspace::load(self.backend.as_ref())?;
        let chain = self.load(document_id)?.add_block(&space, diff)?;
        self.save(&chain)?;

        let length = chain.len().to_string();
        log_event_with_fields(
            Event::ChainAppend,
            &[
                ("id", document_id),
                ("head", chain.head_hash()),
                ("length", length.as_str()),
            ],
        );
        Ok(chain)
    }

    /// Full block sequence of a document.
    pub fn load(&self, document_id: &str) -> ChainResult<Chain> {
        let bytes = self
            .backend
            .read(&chain_key(document_id))
            .map_err(|e| not_found_or(document_id, e))?;
        serde_json::from_slice(&bytes).map_err(|e| ChainError::Serialization(e.to_string()))
    }

    /// Load a chain and verify it against the current space.
    pub fn load_verified(&self, document_id: &str) -> ChainResult<Chain> {
        let space = Kekspace::load(self.backend.as_ref())?;
        let chain = self.load(document_id)?;
        if let Err(e) = chain.verify(&space) {
            let reason = e.to_string();
            log_event_with_fields(
                Event::ChainVerifyFailed,
                &[("id", document_id), ("reason", reason.as_str())],
            );
            return Err(e);
        }
        Ok(chain)
    }

    /// Remove the whole chain. Returns whether a chain was there; an absent
    /// chain is not an error, so a retried delete succeeds.
    pub fn delete(&self, document_id: &str) -> ChainResult<bool> {
        match self.backend.delete(&chain_key(document_id)) {
            Ok(()) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(ChainError::Storage(e)),
        }
    }

    fn save(&self, chain: &Chain) -> ChainResult<()> {
        let bytes =
            serde_json::to_vec(chain).map_err(|e| ChainError::Serialization(e.to_string()))?;
        self.backend.write(&chain_key(chain.document_id()), &bytes)?;
        Ok(())
    }
}

fn not_found_or(document_id: &str, e: StorageError) -> ChainError {
    if e.is_not_found() {
        ChainError::NotFound(document_id.to_string())
    } else {
        ChainError::Storage(e)
    }
}
