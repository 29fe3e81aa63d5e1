//! Attribute index operations
//!
//! # API
//!
//! - `index_attributes(id, attrs)` - write one marker per index term
//! - `remove_attributes(id, attrs)` - delete the markers `index_attributes` wrote
//! - `reindex(id, old, new)` - move a document from one attribute set to another
//! - `find_by_equal(field, value)` - posting list for one pair
//! - `stale_markers(id, attrs)` - marker keys naming `id` that `attrs` no longer justify
//!
//! Writes and removes fan out one blocking task per marker through a
//! [`TaskGroup`] and return only after every task has finished.

use std::collections::BTreeSet;
use std::sync::Arc;

use super::errors::{IndexError, IndexResult};
use crate::document::Attributes;
use crate::observability::{log_event_with_fields, Event};
use crate::storage::keys::{encode_segment, last_segment, marker_key, posting_key, FIELDS_PREFIX};
use crate::storage::StorageBackend;
use crate::tasks::{log_suppressed, run_blocking, TaskGroup, DEFAULT_MAX_CONCURRENCY};

/// One (field, value) pair as the index stores it
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IndexTerm {
    pub field: String,
    pub value: String,
}

impl IndexTerm {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Storage key of this term's marker for one document
    pub fn marker_key(&self, document_id: &str) -> String {
        marker_key(&self.field, &self.value, document_id)
    }
}

/// Marker counts from [`AttributeIndex::reindex`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReindexOutcome {
    pub written: usize,
    pub removed: usize,
}

/// Inverted index from (field, value) to document ids
#[derive(Debug, Clone)]
pub struct AttributeIndex {
    backend: Arc<dyn StorageBackend>,
    max_concurrency: usize,
}

impl AttributeIndex {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self::with_concurrency(backend, DEFAULT_MAX_CONCURRENCY)
    }

    /// Index whose fan-outs keep at most `max_concurrency` markers in flight
    pub fn with_concurrency(backend: Arc<dyn StorageBackend>, max_concurrency: usize) -> Self {
        Self {
            backend,
            max_concurrency,
        }
    }

    /// Exact marker set for an attribute set. Unindexed values contribute
    /// nothing; list values contribute one term per element.
    pub fn terms(attributes: &Attributes) -> BTreeSet<IndexTerm> {
        attributes
            .iter()
            .flat_map(|(field, value)| {
                value
                    .index_terms()
                    .into_iter()
                    .map(move |term| IndexTerm::new(field.clone(), term))
            })
            .collect()
    }

    /// Write every marker for `attributes`. Returns the number written.
    pub async fn index_attributes(
        &self,
        document_id: &str,
        attributes: &Attributes,
    ) -> IndexResult<usize> {
        self.write_terms(document_id, Self::terms(attributes)).await
    }

    /// Delete every marker `index_attributes` would write for `attributes`.
    ///
    /// Pass the attribute set as it was before the destructive change, or
    /// markers leak. Returns the number of markers that existed.
    pub async fn remove_attributes(
        &self,
        document_id: &str,
        attributes: &Attributes,
    ) -> IndexResult<usize> {
        self.remove_terms(document_id, Self::terms(attributes)).await
    }

    /// Move a document's markers from `old` to `new`.
    ///
    /// Only `old \ new` is removed and only `new \ old` is written, both
    /// concurrently. Terms present in both sets are never touched.
    pub async fn reindex(
        &self,
        document_id: &str,
        old: &Attributes,
        new: &Attributes,
    ) -> IndexResult<ReindexOutcome> {
        let old_terms = Self::terms(old);
        let new_terms = Self::terms(new);
        let stale = old_terms.difference(&new_terms).cloned().collect();
        let fresh = new_terms.difference(&old_terms).cloned().collect();

        let (removed, written) = tokio::join!(
            self.remove_terms(document_id, stale),
            self.write_terms(document_id, fresh)
        );

        match (removed, written) {
            (Ok(removed), Ok(written)) => Ok(ReindexOutcome { written, removed }),
            (Err(e), Ok(_)) | (Ok(_), Err(e)) => Err(e),
            (Err(first), Err(second)) => {
                log_suppressed("index.reindex", &second);
                Err(first)
            }
        }
    }

    /// Write the given markers.
    pub async fn write_terms(
        &self,
        document_id: &str,
        terms: BTreeSet<IndexTerm>,
    ) -> IndexResult<usize> {
        if terms.is_empty() {
            return Ok(0);
        }

        let mut group: TaskGroup<IndexError> = TaskGroup::new("index.write", self.max_concurrency);
        for term in terms {
            let backend = Arc::clone(&self.backend);
            let key = term.marker_key(document_id);
            group.spawn_blocking(move || {
                backend.write(&key, &[])?;
                Ok(())
            });
        }

        let written = group.join().await?;
        let count = written.to_string();
        log_event_with_fields(
            Event::IndexWrite,
            &[("id", document_id), ("markers", count.as_str())],
        );
        Ok(written)
    }

    /// Delete the given markers. An already-absent marker counts as removed,
    /// so retrying a partially failed removal is safe.
    pub async fn remove_terms(
        &self,
        document_id: &str,
        terms: BTreeSet<IndexTerm>,
    ) -> IndexResult<usize> {
        let keys = terms
            .iter()
            .map(|term| term.marker_key(document_id))
            .collect();
        self.remove_markers(document_id, keys).await
    }

    /// Delete markers by their full storage key.
    pub async fn remove_markers(
        &self,
        document_id: &str,
        keys: BTreeSet<String>,
    ) -> IndexResult<usize> {
        if keys.is_empty() {
            return Ok(0);
        }

        let mut group: TaskGroup<IndexError> = TaskGroup::new("index.remove", self.max_concurrency);
        for key in keys {
            let backend = Arc::clone(&self.backend);
            group.spawn_blocking(move || match backend.delete(&key) {
                Ok(()) => Ok(()),
                Err(e) if e.is_not_found() => Ok(()),
                Err(e) => Err(IndexError::Storage(e)),
            });
        }

        let removed = group.join().await?;
        let count = removed.to_string();
        log_event_with_fields(
            Event::IndexRemove,
            &[("id", document_id), ("markers", count.as_str())],
        );
        Ok(removed)
    }

    /// Every document id marked with `field = value`. Empty, not an error,
    /// when nothing matches.
    pub async fn find_by_equal(&self, field: &str, value: &str) -> IndexResult<BTreeSet<String>> {
        let backend = Arc::clone(&self.backend);
        let prefix = posting_key(field, value);
        run_blocking(move || -> IndexResult<BTreeSet<String>> {
            let keys = backend.list(&prefix)?;
            Ok(keys.iter().map(|key| last_segment(key)).collect())
        })
        .await
    }

    /// Keys of markers naming `document_id` whose term is not in `current`.
    ///
    /// Works on stored keys rather than decoded terms, so digested segments
    /// are found too. Walks the whole fields key-space, so this is a repair
    /// tool, not something a lifecycle operation calls.
    pub async fn stale_markers(
        &self,
        document_id: &str,
        current: &Attributes,
    ) -> IndexResult<BTreeSet<String>> {
        let backend = Arc::clone(&self.backend);
        let id_segment = encode_segment(document_id);
        let current: BTreeSet<String> = Self::terms(current)
            .iter()
            .map(|term| term.marker_key(document_id))
            .collect();

        run_blocking(move || -> IndexResult<BTreeSet<String>> {
            let mut stale = BTreeSet::new();
            for field_key in backend.list(FIELDS_PREFIX)? {
                for value_key in backend.list(&field_key)? {
                    let marker = format!("{}/{}", value_key, id_segment);
                    if !current.contains(&marker) && backend.exists(&marker)? {
                        stale.insert(marker);
                    }
                }
            }
            Ok(stale)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{attributes, AttributeValue};
    use crate::storage::MemoryBackend;

    fn index() -> (AttributeIndex, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        (AttributeIndex::with_concurrency(backend.clone(), 4), backend)
    }

    fn ids(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_terms_flatten_lists_and_skip_unindexed() {
        let mut attrs = attributes([("color", AttributeValue::from("red"))]);
        attrs.insert("count".into(), AttributeValue::from(3));
        attrs.insert("tags".into(), AttributeValue::from(vec!["a", "b"]));
        attrs.insert("sizes".into(), AttributeValue::from(vec![1i64, 2]));
        attrs.insert(
            "meta".into(),
            AttributeValue::from_json(serde_json::json!({"deep": true})),
        );

        let terms = AttributeIndex::terms(&attrs);
        let expected: BTreeSet<IndexTerm> = [
            ("color", "red"),
            ("count", "3"),
            ("sizes", "1"),
            ("sizes", "2"),
            ("tags", "a"),
            ("tags", "b"),
        ]
        .into_iter()
        .map(|(f, v)| IndexTerm::new(f, v))
        .collect();
        assert_eq!(terms, expected);
    }

    #[tokio::test]
    async fn test_index_then_find() {
        let (index, _) = index();
        index
            .index_attributes("dd1", &attributes([("color", "red")]))
            .await
            .unwrap();
        index
            .index_attributes("dd2", &attributes([("color", "red")]))
            .await
            .unwrap();

        assert_eq!(index.find_by_equal("color", "red").await.unwrap(), ids(&["dd1", "dd2"]));
        assert!(index.find_by_equal("color", "blue").await.unwrap().is_empty());
        assert!(index.find_by_equal("nope", "x").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_integer_matches_decimal_string() {
        let (index, _) = index();
        index
            .index_attributes("dd1", &attributes([("count", 3i64)]))
            .await
            .unwrap();
        assert_eq!(index.find_by_equal("count", "3").await.unwrap(), ids(&["dd1"]));
    }

    #[tokio::test]
    async fn test_remove_attributes() {
        let (index, backend) = index();
        let attrs = attributes([("color", "red"), ("shape", "round")]);
        assert_eq!(index.index_attributes("dd1", &attrs).await.unwrap(), 2);
        assert_eq!(index.remove_attributes("dd1", &attrs).await.unwrap(), 2);
        assert!(backend.keys_with_prefix(FIELDS_PREFIX).is_empty());
    }

    #[tokio::test]
    async fn test_remove_absent_marker_is_success() {
        let (index, _) = index();
        let removed = index
            .remove_attributes("dd1", &attributes([("color", "red")]))
            .await
            .unwrap();
        assert_eq!(removed, 1);
    }

    #[tokio::test]
    async fn test_reindex_touches_only_the_difference() {
        let (index, _) = index();
        let old = attributes([("color", "red"), ("count", "3")]);
        let new = attributes([("color", "red"), ("count", "5")]);
        index.index_attributes("dd1", &old).await.unwrap();

        let outcome = index.reindex("dd1", &old, &new).await.unwrap();
        assert_eq!(outcome, ReindexOutcome { written: 1, removed: 1 });

        assert_eq!(index.find_by_equal("color", "red").await.unwrap(), ids(&["dd1"]));
        assert_eq!(index.find_by_equal("count", "5").await.unwrap(), ids(&["dd1"]));
        assert!(index.find_by_equal("count", "3").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_hostile_values_stay_in_their_posting_list() {
        let (index, _) = index();
        index
            .index_attributes("dd1", &attributes([("path", "a/b"), ("dots", "..")]))
            .await
            .unwrap();

        assert_eq!(index.find_by_equal("path", "a/b").await.unwrap(), ids(&["dd1"]));
        assert!(index.find_by_equal("path", "a").await.unwrap().is_empty());
        assert_eq!(index.find_by_equal("dots", "..").await.unwrap(), ids(&["dd1"]));
    }

    #[tokio::test]
    async fn test_stale_markers() {
        let (index, _) = index();
        let old = attributes([("color", "red"), ("count", "3")]);
        let current = attributes([("color", "red"), ("count", "5")]);
        index.index_attributes("dd1", &old).await.unwrap();
        index.index_attributes("dd1", &current).await.unwrap();
        index.index_attributes("dd2", &old).await.unwrap();

        let stale = index.stale_markers("dd1", &current).await.unwrap();
        let expected: BTreeSet<String> = [IndexTerm::new("count", "3").marker_key("dd1")].into();
        assert_eq!(stale, expected);
    }

    #[tokio::test]
    async fn test_long_values_are_found_and_cleaned() {
        let (index, backend) = index();
        let long = "x".repeat(300);
        index
            .index_attributes("dd1", &attributes([("bio", long.as_str())]))
            .await
            .unwrap();

        assert_eq!(index.find_by_equal("bio", &long).await.unwrap(), ids(&["dd1"]));
        assert!(index.find_by_equal("bio", &"x".repeat(299)).await.unwrap().is_empty());

        let stale = index.stale_markers("dd1", &Attributes::new()).await.unwrap();
        assert_eq!(stale.len(), 1);
        assert_eq!(index.remove_markers("dd1", stale).await.unwrap(), 1);
        assert!(backend.keys_with_prefix(FIELDS_PREFIX).is_empty());
    }
}
