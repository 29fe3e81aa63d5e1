//! Document lifecycle engine
//!
//! Per document: absent -> active -> deleted, deleted is terminal.
//!
//! Each mutation fans out into independent branches (index, chain, body)
//! that run concurrently and are always joined in full before the
//! operation returns. The body is written last, and only when the index
//! and chain branches both succeeded, so a stored body never names a
//! revision its chain does not have.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use super::document::{new_document_id, Document};
use super::value::Attributes;
use crate::chain::{AttributeDiff, Chain, ChainError, ChainStore};
use crate::config::KekConfig;
use crate::error::{KekError, KekResult};
use crate::index::AttributeIndex;
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};
use crate::storage::keys::{document_key, last_segment, DOCUMENTS_PREFIX};
use crate::storage::{LocalBackend, StorageBackend};
use crate::tasks::{first_error, log_suppressed, run_blocking};

/// What [`DocumentEngine::repair`] changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepairReport {
    pub id: String,
    /// Markers naming the document that its attributes no longer justify
    pub stale_markers_removed: usize,
    /// Markers (re)written for the current attributes
    pub markers_written: usize,
    /// A block was appended because the chain's history disagreed with the body
    pub history_block_appended: bool,
    /// The body's revision did not match the chain head
    pub revision_reset: bool,
    pub chain_length: usize,
}

/// Create / Get / Update / Delete over document bodies, their revision
/// chains and their index markers.
#[derive(Debug, Clone)]
pub struct DocumentEngine {
    backend: Arc<dyn StorageBackend>,
    chains: ChainStore,
    index: AttributeIndex,
    metrics: Arc<MetricsRegistry>,
}

impl DocumentEngine {
    pub fn new(backend: Arc<dyn StorageBackend>, config: &KekConfig) -> Self {
        Self::with_metrics(backend, config, Arc::new(MetricsRegistry::new()))
    }

    /// Engine reporting into a shared metrics registry
    pub fn with_metrics(
        backend: Arc<dyn StorageBackend>,
        config: &KekConfig,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            chains: ChainStore::new(Arc::clone(&backend)),
            index: AttributeIndex::with_concurrency(Arc::clone(&backend), config.max_concurrency),
            backend,
            metrics,
        }
    }

    /// Engine over the local filesystem rooted at `config.data_dir`
    pub fn open(config: &KekConfig) -> Self {
        Self::new(Arc::new(LocalBackend::new(config.data_dir.clone())), config)
    }

    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    pub fn index(&self) -> &AttributeIndex {
        &self.index
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    /// Create a document.
    ///
    /// Indexing and the genesis block run concurrently; the body is
    /// persisted once both have succeeded. Partial index or chain writes
    /// are not rolled back on failure.
    pub async fn create(&self, name: &str, attributes: Attributes) -> KekResult<Document> {
        if name.trim().is_empty() {
            return Err(KekError::validation("document name must not be empty"));
        }

        let id = new_document_id();
        log_event_with_fields(
            Event::DocumentCreateBegin,
            &[("id", id.as_str()), ("name", name)],
        );

        let result = self.create_document(&id, name, attributes).await;
        self.record(&result, &id, Event::DocumentCreateCommit, Event::DocumentCreateFailed);
        if result.is_ok() {
            self.metrics.increment_documents_created();
        }
        result
    }

    async fn create_document(
        &self,
        id: &str,
        name: &str,
        attributes: Attributes,
    ) -> KekResult<Document> {
        let chains = self.chains.clone();
        let chain_id = id.to_string();
        let genesis = attributes.clone();

        let (indexed, chain) = tokio::join!(
            self.index.index_attributes(id, &attributes),
            run_blocking(move || chains.create(&chain_id, genesis))
        );
        let (written, chain) = join_pair(
            "document.create",
            indexed.map_err(KekError::from),
            chain.map_err(KekError::from),
        )?;
        self.metrics.add_index_markers_written(written as u64);
        self.metrics.increment_chain_blocks();

        let document = Document::new(id, name, attributes, chain.head_hash());
        self.save_body(&document).await?;
        Ok(document)
    }

    /// Load a document, attaching its revision chain when asked.
    ///
    /// A body whose chain is missing fails with `NotFound` when the chain
    /// is requested.
    pub async fn get(&self, id: &str, with_revisions: bool) -> KekResult<Document> {
        let mut document = self.load_body(id).await?;
        if with_revisions {
            document.revisions = Some(self.load_chain(id).await?);
        }
        Ok(document)
    }

    /// Revision chain of a document, unverified.
    pub async fn revisions(&self, id: &str) -> KekResult<Chain> {
        self.load_chain(id).await
    }

    /// Update a document's attributes.
    ///
    /// `patch` overlays the given keys onto the current set; otherwise the
    /// set is replaced. The chain records the diff between the stored and
    /// the resulting attributes, concurrently with moving the index
    /// markers. Neither branch is rolled back if the other fails.
    pub async fn update(
        &self,
        id: &str,
        attributes: Attributes,
        patch: bool,
    ) -> KekResult<Document> {
        let mode = if patch { "patch" } else { "replace" };
        log_event_with_fields(Event::DocumentUpdateBegin, &[("id", id), ("mode", mode)]);

        let result = self.update_document(id, attributes, patch).await;
        self.record(&result, id, Event::DocumentUpdateCommit, Event::DocumentUpdateFailed);
        if result.is_ok() {
            self.metrics.increment_documents_updated();
        }
        result
    }

    async fn update_document(
        &self,
        id: &str,
        attributes: Attributes,
        patch: bool,
    ) -> KekResult<Document> {
        let current = self.load_body(id).await?;
        let merged = merge(&current.attributes, attributes, patch);
        let diff = AttributeDiff::between(&current.attributes, &merged);

        let chains = self.chains.clone();
        let chain_id = id.to_string();
        let (reindexed, chain) = tokio::join!(
            self.index.reindex(id, &current.attributes, &merged),
            run_blocking(move || chains.append(&chain_id, diff))
        );
        let (outcome, chain) = join_pair(
            "document.update",
            reindexed.map_err(KekError::from),
            chain.map_err(KekError::from),
        )?;
        self.metrics.add_index_markers_written(outcome.written as u64);
        self.metrics.add_index_markers_removed(outcome.removed as u64);
        self.metrics.increment_chain_blocks();

        let document = Document {
            attributes: merged,
            updated_at: Utc::now(),
            revision: chain.head_hash().to_string(),
            ..current
        };
        self.save_body(&document).await?;
        Ok(document)
    }

    /// Delete a document: its markers, its chain and its body, concurrently.
    ///
    /// All three branches run to completion; the first error is returned.
    /// Retrying after a partial failure finishes the job: when the body is
    /// already gone, every marker naming the id and the chain are removed.
    /// Fails with `NotFound` only when nothing of the document remains.
    pub async fn delete(&self, id: &str) -> KekResult<()> {
        log_event_with_fields(Event::DocumentDeleteBegin, &[("id", id)]);

        let result = self.delete_document(id).await;
        self.record(&result, id, Event::DocumentDeleteCommit, Event::DocumentDeleteFailed);
        if result.is_ok() {
            self.metrics.increment_documents_deleted();
        }
        result
    }

    async fn delete_document(&self, id: &str) -> KekResult<()> {
        let current = match self.load_body(id).await {
            Ok(document) => document,
            Err(e) if e.is_not_found() => return self.purge_remnants(id).await,
            Err(e) => return Err(e),
        };

        let chains = self.chains.clone();
        let chain_id = id.to_string();
        let backend = Arc::clone(&self.backend);
        let key = document_key(id);

        let (removed, chain, body) = tokio::join!(
            self.index.remove_attributes(id, &current.attributes),
            run_blocking(move || chains.delete(&chain_id).map(|_| ())),
            run_blocking(move || backend.delete(&key).map_err(KekError::from))
        );

        if let Ok(count) = &removed {
            self.metrics.add_index_markers_removed(*count as u64);
        }
        first_error(
            "document.delete",
            vec![
                removed.map(|_| ()).map_err(KekError::from),
                chain.map_err(KekError::from),
                body,
            ],
        )
    }

    /// Remove what an interrupted delete left behind for a body-less id.
    async fn purge_remnants(&self, id: &str) -> KekResult<()> {
        let stale = self.index.stale_markers(id, &Attributes::new()).await?;

        let chains = self.chains.clone();
        let chain_id = id.to_string();
        let (removed, chain) = tokio::join!(
            self.index.remove_markers(id, stale),
            run_blocking(move || chains.delete(&chain_id))
        );
        let (removed, chain_removed) = join_pair(
            "document.purge",
            removed.map_err(KekError::from),
            chain.map_err(KekError::from),
        )?;

        if removed == 0 && !chain_removed {
            return Err(KekError::not_found(format!("document {}", id)));
        }

        self.metrics.add_index_markers_removed(removed as u64);
        let markers = removed.to_string();
        log_event_with_fields(
            Event::DocumentRemnantsPurged,
            &[
                ("id", id),
                ("markers", markers.as_str()),
                ("chain", if chain_removed { "true" } else { "false" }),
            ],
        );
        Ok(())
    }

    /// Ids of every stored document body, sorted.
    pub async fn list_ids(&self) -> KekResult<Vec<String>> {
        let backend = Arc::clone(&self.backend);
        run_blocking(move || -> KekResult<Vec<String>> {
            let mut ids: Vec<String> = backend
                .list(DOCUMENTS_PREFIX)?
                .iter()
                .map(|key| last_segment(key))
                .collect();
            ids.sort();
            Ok(ids)
        })
        .await
    }

    /// Verify a document's chain and that its body names the chain head.
    /// Returns the verified chain.
    pub async fn verify(&self, id: &str) -> KekResult<Chain> {
        let document = self.load_body(id).await?;
        let chain = self.load_verified_chain(id).await?;

        if document.revision != chain.head_hash() {
            log_event_with_fields(
                Event::ChainVerifyFailed,
                &[("id", id), ("reason", "revision does not match chain head")],
            );
            return Err(ChainError::HeadMismatch(id.to_string()).into());
        }
        Ok(chain)
    }

    /// Bring a document's chain and markers back in line with its body.
    ///
    /// The body is taken as the truth. If the chain's replayed history
    /// disagrees with it, one block recording the difference is appended.
    /// Stale markers are removed, current markers rewritten, and the body's
    /// revision reset to the chain head. A chain that fails verification is
    /// reported, not rewritten.
    pub async fn repair(&self, id: &str) -> KekResult<RepairReport> {
        log_event_with_fields(Event::RepairBegin, &[("id", id)]);

        let mut document = self.load_body(id).await?;
        let chain = self.load_verified_chain(id).await?;

        let history = chain.replay()?;
        let history_block_appended = history != document.attributes;
        let chain = if history_block_appended {
            let chains = self.chains.clone();
            let chain_id = id.to_string();
            let diff = AttributeDiff::between(&history, &document.attributes);
            let chain = run_blocking(move || chains.append(&chain_id, diff)).await?;
            self.metrics.increment_chain_blocks();
            chain
        } else {
            chain
        };

        let stale = self.index.stale_markers(id, &document.attributes).await?;
        let (removed, written) = tokio::join!(
            self.index.remove_markers(id, stale),
            self.index.index_attributes(id, &document.attributes)
        );
        let (removed, written) = join_pair(
            "document.repair",
            removed.map_err(KekError::from),
            written.map_err(KekError::from),
        )?;
        self.metrics.add_index_markers_removed(removed as u64);
        self.metrics.add_index_markers_written(written as u64);

        let revision_reset = document.revision != chain.head_hash();
        if revision_reset {
            document.revision = chain.head_hash().to_string();
            self.save_body(&document).await?;
        }

        let report = RepairReport {
            id: id.to_string(),
            stale_markers_removed: removed,
            markers_written: written,
            history_block_appended,
            revision_reset,
            chain_length: chain.len(),
        };

        let stale_count = removed.to_string();
        log_event_with_fields(
            Event::RepairComplete,
            &[
                ("id", id),
                ("stale_markers_removed", stale_count.as_str()),
                ("revision_reset", if revision_reset { "true" } else { "false" }),
            ],
        );
        Ok(report)
    }

    async fn load_body(&self, id: &str) -> KekResult<Document> {
        let backend = Arc::clone(&self.backend);
        let key = document_key(id);
        let bytes = run_blocking(move || backend.read(&key).map_err(KekError::from))
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    KekError::not_found(format!("document {}", id))
                } else {
                    e
                }
            })?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn save_body(&self, document: &Document) -> KekResult<()> {
        let bytes = serde_json::to_vec(document)?;
        let backend = Arc::clone(&self.backend);
        let key = document_key(&document.id);
        run_blocking(move || backend.write(&key, &bytes).map_err(KekError::from)).await
    }

    async fn load_chain(&self, id: &str) -> KekResult<Chain> {
        let chains = self.chains.clone();
        let id = id.to_string();
        Ok(run_blocking(move || chains.load(&id)).await?)
    }

    async fn load_verified_chain(&self, id: &str) -> KekResult<Chain> {
        let chains = self.chains.clone();
        let id = id.to_string();
        Ok(run_blocking(move || chains.load_verified(&id)).await?)
    }

    fn record<T>(&self, result: &KekResult<T>, id: &str, commit: Event, failed: Event) {
        match result {
            Ok(_) => log_event_with_fields(commit, &[("id", id)]),
            Err(e) => {
                self.metrics.increment_failures();
                let reason = e.to_string();
                log_event_with_fields(
                    failed,
                    &[("id", id), ("code", e.code()), ("reason", reason.as_str())],
                );
            }
        }
    }
}

fn merge(current: &Attributes, incoming: Attributes, patch: bool) -> Attributes {
    if !patch {
        return incoming;
    }
    let mut merged = current.clone();
    merged.extend(incoming);
    merged
}

/// Both results, or the first error. A second error is logged.
fn join_pair<A, B>(label: &str, a: KekResult<A>, b: KekResult<B>) -> KekResult<(A, B)> {
    match (a, b) {
        (Ok(a), Ok(b)) => Ok((a, b)),
        (Err(e), Ok(_)) | (Ok(_), Err(e)) => Err(e),
        (Err(first), Err(second)) => {
            log_suppressed(label, &second);
            Err(first)
        }
    }
}
