//! Metrics registry for kek
//!
//! - Counters only, monotonic
//! - Reset only on process start
//! - Relaxed atomics: counters never feed back into behavior

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters shared by the engines
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    documents_created: AtomicU64,
    documents_updated: AtomicU64,
    documents_deleted: AtomicU64,
    chain_blocks_appended: AtomicU64,
    index_markers_written: AtomicU64,
    index_markers_removed: AtomicU64,
    queries_executed: AtomicU64,
    operation_failures: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_documents_created(&self) {
        self.documents_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_documents_updated(&self) {
        self.documents_updated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_documents_deleted(&self) {
        self.documents_deleted.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one block appended to any chain (genesis blocks included)
    pub fn increment_chain_blocks(&self) {
        self.chain_blocks_appended.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_index_markers_written(&self, count: u64) {
        self.index_markers_written.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_index_markers_removed(&self, count: u64) {
        self.index_markers_removed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_queries_executed(&self) {
        self.queries_executed.fetch_add(1, Ordering::Relaxed);
    }

    /// Count an operation that returned an error to its caller
    pub fn increment_failures(&self) {
        self.operation_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_created: self.documents_created.load(Ordering::Relaxed),
            documents_updated: self.documents_updated.load(Ordering::Relaxed),
            documents_deleted: self.documents_deleted.load(Ordering::Relaxed),
            chain_blocks_appended: self.chain_blocks_appended.load(Ordering::Relaxed),
            index_markers_written: self.index_markers_written.load(Ordering::Relaxed),
            index_markers_removed: self.index_markers_removed.load(Ordering::Relaxed),
            queries_executed: self.queries_executed.load(Ordering::Relaxed),
            operation_failures: self.operation_failures.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub documents_created: u64,
    pub documents_updated: u64,
    pub documents_deleted: u64,
    pub chain_blocks_appended: u64,
    pub index_markers_written: u64,
    pub index_markers_removed: u64,
    pub queries_executed: u64,
    pub operation_failures: u64,
}
