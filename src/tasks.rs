//! Structured fan-out over blocking storage calls
//!
//! The storage port is synchronous, so every call runs on tokio's blocking
//! pool. A [`TaskGroup`] owns the tasks it spawns and [`TaskGroup::join`]
//! waits for all of them before returning, even after the first failure.
//! Nothing spawned here outlives the operation that spawned it.

use std::fmt::Display;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};

use crate::observability::{log_event_with_fields, Event};

/// Default upper bound on in-flight blocking tasks per group
pub const DEFAULT_MAX_CONCURRENCY: usize = 64;

/// A group of blocking tasks joined as a unit.
pub struct TaskGroup<E> {
    label: &'static str,
    tasks: JoinSet<Result<(), E>>,
    permits: Arc<Semaphore>,
}

impl<E> TaskGroup<E>
where
    E: From<JoinError> + Display + Send + 'static,
{
    /// Create a group allowing at most `max_concurrency` tasks to run at once.
    pub fn new(label: &'static str, max_concurrency: usize) -> Self {
        Self {
            label,
            tasks: JoinSet::new(),
            permits: Arc::new(Semaphore::new(max_concurrency.max(1))),
        }
    }

    /// Number of tasks spawned and not yet joined
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Run `f` on the blocking pool as part of this group.
    pub fn spawn_blocking<F>(&mut self, f: F)
    where
        F: FnOnce() -> Result<(), E> + Send + 'static,
    {
        let permits = Arc::clone(&self.permits);
        self.tasks.spawn(async move {
            // The semaphore is never closed, so acquisition only waits.
            let _permit = permits.acquire_owned().await.ok();
            match tokio::task::spawn_blocking(f).await {
                Ok(result) => result,
                Err(e) => Err(E::from(e)),
            }
        });
    }

    /// Wait for every task. Returns the number of tasks that succeeded, or the
    /// first error in completion order. Later errors are logged, not lost.
    pub async fn join(mut self) -> Result<usize, E> {
        let mut first_error: Option<E> = None;
        let mut succeeded = 0;

        while let Some(joined) = self.tasks.join_next().await {
            let outcome = joined.unwrap_or_else(|e| Err(E::from(e)));
            match outcome {
                Ok(()) => succeeded += 1,
                Err(e) if first_error.is_none() => first_error = Some(e),
                Err(e) => log_suppressed(self.label, &e),
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(succeeded),
        }
    }
}

/// Run one blocking closure to completion on the blocking pool.
pub async fn run_blocking<T, E, F>(f: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: From<JoinError> + Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(E::from)?
}

/// Pick the first error out of already-joined sibling branches, logging the rest.
pub fn first_error<E: Display>(label: &str, results: Vec<Result<(), E>>) -> Result<(), E> {
    let mut first = None;
    for result in results {
        if let Err(e) = result {
            if first.is_none() {
                first = Some(e);
            } else {
                log_suppressed(label, &e);
            }
        }
    }
    first.map_or(Ok(()), Err)
}

/// Record an error that lost the race to be reported.
pub fn log_suppressed<E: Display>(label: &str, error: &E) {
    let reason = error.to_string();
    log_event_with_fields(
        Event::TaskErrorSuppressed,
        &[("group", label), ("reason", reason.as_str())],
    );
}
