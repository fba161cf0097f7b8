//! Bounded-concurrency detail fetching
//!
//! Every item of a page gets its own task in a [`JoinSet`]; a shared
//! semaphore keeps at most `max_workers` of them talking to the source at
//! once. Workers only read from the source and return owned outcomes, so the
//! caller can dedup and order the results after the pool has joined.

use crate::crawler::retry::{RetryOutcome, RetryPolicy};
use crate::crawler::source::{ItemRef, ListingSource};
use crate::storage::Record;
use crate::HarvestError;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Outcome of one item's detail fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailOutcome {
    Fetched(Record),
    Exhausted {
        item: ItemRef,
        attempts: u32,
        error: String,
    },
}

/// Worker pool for detail fetches
pub struct DetailFetchPool {
    source: Arc<dyn ListingSource>,
    retry: RetryPolicy,
    semaphore: Arc<Semaphore>,
    max_workers: usize,
    fail_fast: bool,
}

impl DetailFetchPool {
    /// Creates a pool
    ///
    /// # Arguments
    ///
    /// * `source` - Listing source used for detail fetches
    /// * `retry` - Retry policy applied to every item
    /// * `max_workers` - Maximum simultaneous fetches (at least 1)
    /// * `fail_fast` - Cancel the remaining items on the first exhaustion
    pub fn new(
        source: Arc<dyn ListingSource>,
        retry: RetryPolicy,
        max_workers: usize,
        fail_fast: bool,
    ) -> Self {
        let max_workers = max_workers.max(1);
        Self {
            source,
            retry,
            semaphore: Arc::new(Semaphore::new(max_workers)),
            max_workers,
            fail_fast,
        }
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Fetches the details of every item
    ///
    /// Outcomes come back in completion order. In fail-fast mode the first
    /// `Exhausted` outcome aborts the tasks still running and waits for them
    /// to wind down before returning, so the result may hold fewer outcomes
    /// than items.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<DetailOutcome>)` - One outcome per completed item
    /// * `Err(HarvestError::TaskJoin)` - A worker panicked
    pub async fn run_all(&self, items: Vec<ItemRef>) -> Result<Vec<DetailOutcome>, HarvestError> {
        let mut tasks = JoinSet::new();

        for item in items {
            let source = Arc::clone(&self.source);
            let semaphore = Arc::clone(&self.semaphore);
            let retry = self.retry;

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                fetch_one(source.as_ref(), retry, item).await
            });
        }

        let mut outcomes = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            let outcome = joined.map_err(|e| HarvestError::TaskJoin(e.to_string()))?;
            let fatal = self.fail_fast && matches!(outcome, DetailOutcome::Exhausted { .. });
            outcomes.push(outcome);

            if fatal {
                let pending = tasks.len();
                tasks.shutdown().await;
                if pending > 0 {
                    tracing::warn!("Cancelled {} in-flight detail fetches", pending);
                }
                break;
            }
        }

        Ok(outcomes)
    }
}

async fn fetch_one(source: &dyn ListingSource, retry: RetryPolicy, item: ItemRef) -> DetailOutcome {
    let label = format!("Detail fetch {} (page {})", item.locator, item.page_number);

    match retry.execute(&label, || source.fetch_detail(&item)).await {
        RetryOutcome::Success { value, .. } => {
            let record = value.into_record(&item);
            tracing::info!(
                "Processed - page: {}, id: {}, title: {}",
                record.page_number,
                record.item_key,
                record.title
            );
            DetailOutcome::Fetched(record)
        }
        RetryOutcome::Exhausted {
            attempts,
            last_error,
        } => DetailOutcome::Exhausted {
            item,
            attempts,
            error: last_error.to_string(),
        },
    }
}
