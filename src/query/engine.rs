//! Query engine
//!
//! 1. No predicates: list every document body.
//! 2. Otherwise resolve each predicate to its posting list in order. The
//!    first predicate seeds a match count of 1 per id; later predicates
//!    only increment ids already seeded.
//! 3. Keep ids whose count equals the number of predicates.
//! 4. Load the survivors' bodies and sort them.
//! 5. Skip `offset`, then take `limit`.
//! 6. Attach revision chains to the page only, when asked.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::query::{DocQuery, Operator, SearchQuery};
use super::sorter::ResultSorter;
use crate::config::KekConfig;
use crate::document::{Document, DocumentEngine};
use crate::error::{KekError, KekResult};
use crate::observability::{log_event_with_fields, Event};
use crate::tasks::log_suppressed;

/// Evaluates [`DocQuery`]s against the attribute index
#[derive(Debug, Clone)]
pub struct QueryEngine {
    documents: DocumentEngine,
    default_limit: usize,
    max_concurrency: usize,
}

impl QueryEngine {
    pub fn new(documents: DocumentEngine, config: &KekConfig) -> Self {
        Self {
            documents,
            default_limit: config.default_limit,
            max_concurrency: config.max_concurrency,
        }
    }

    /// Documents matching every predicate, sorted and paged.
    pub async fn find(&self, query: &DocQuery) -> KekResult<Vec<Document>> {
        let predicates = query.search_queries.len().to_string();
        log_event_with_fields(Event::QueryBegin, &[("predicates", predicates.as_str())]);

        let metrics = self.documents.metrics();
        metrics.increment_queries_executed();

        match self.execute(query).await {
            Ok(documents) => {
                let returned = documents.len().to_string();
                log_event_with_fields(Event::QueryComplete, &[("returned", returned.as_str())]);
                Ok(documents)
            }
            Err(e) => {
                metrics.increment_failures();
                let reason = e.to_string();
                log_event_with_fields(
                    Event::QueryFailed,
                    &[("code", e.code()), ("reason", reason.as_str())],
                );
                Err(e)
            }
        }
    }

    async fn execute(&self, query: &DocQuery) -> KekResult<Vec<Document>> {
        let limit = query.effective_limit(self.default_limit);
        if limit == 0 {
            return Ok(Vec::new());
        }

        let ids = if query.is_filtered() {
            self.matching_ids(&query.search_queries).await?
        } else {
            self.documents.list_ids().await?
        };

        let documents = self.load(ids).await?;
        let sorted = ResultSorter::sort(documents, query.order_by.as_deref())?;
        let page: Vec<Document> = sorted.into_iter().skip(query.offset).take(limit).collect();

        if query.with_doc_revs {
            self.attach_revisions(page).await
        } else {
            Ok(page)
        }
    }

    /// Ids matched by all predicates, sorted.
    async fn matching_ids(&self, predicates: &[SearchQuery]) -> KekResult<Vec<String>> {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();

        for (position, predicate) in predicates.iter().enumerate() {
            let posting = self.posting_list(predicate).await?;
            if position == 0 {
                counts.extend(posting.into_iter().map(|id| (id, 1)));
            } else {
                for id in posting {
                    if let Some(count) = counts.get_mut(&id) {
                        *count += 1;
                    }
                }
            }
        }

        Ok(counts
            .into_iter()
            .filter(|(_, count)| *count == predicates.len())
            .map(|(id, _)| id)
            .collect())
    }

    async fn posting_list(&self, predicate: &SearchQuery) -> KekResult<BTreeSet<String>> {
        match &predicate.operator {
            Operator::Eq => Ok(self
                .documents
                .index()
                .find_by_equal(&predicate.field, &predicate.value)
                .await?),
            Operator::Unsupported(op) => {
                log_event_with_fields(
                    Event::QueryOperatorIgnored,
                    &[("field", predicate.field.as_str()), ("operator", op.as_str())],
                );
                Ok(BTreeSet::new())
            }
        }
    }

    /// Load every body concurrently, at most `max_concurrency` at a time.
    async fn load(&self, ids: Vec<String>) -> KekResult<Vec<Document>> {
        let permits = Arc::new(Semaphore::new(self.max_concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for id in ids {
            let documents = self.documents.clone();
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await.ok();
                documents.get(&id, false).await
            });
        }

        join_all("query.load", tasks).await
    }

    /// Attach each document's revision chain, keeping the page order.
    async fn attach_revisions(&self, page: Vec<Document>) -> KekResult<Vec<Document>> {
        let permits = Arc::new(Semaphore::new(self.max_concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for (position, document) in page.into_iter().enumerate() {
            let documents = self.documents.clone();
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await.ok();
                let chain = documents.revisions(&document.id).await?;
                Ok::<_, KekError>((
                    position,
                    Document {
                        revisions: Some(chain),
                        ..document
                    },
                ))
            });
        }

        let mut hydrated = join_all("query.revisions", tasks).await?;
        hydrated.sort_by_key(|(position, _)| *position);
        Ok(hydrated.into_iter().map(|(_, document)| document).collect())
    }
}

/// Join every task. All tasks finish before this returns; the first error
/// wins and later ones are logged.
async fn join_all<T: 'static>(
    label: &str,
    mut tasks: JoinSet<KekResult<T>>,
) -> KekResult<Vec<T>> {
    let mut values = Vec::with_capacity(tasks.len());
    let mut first_error: Option<KekError> = None;
    while let Some(joined) = tasks.join_next().await {
        match joined.map_err(KekError::from).and_then(|result| result) {
            Ok(value) => values.push(value),
            Err(e) if first_error.is_none() => first_error = Some(e),
            Err(e) => log_suppressed(label, &e),
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(values),
    }
}
