//! Single-page processing
//!
//! Fetches one listing page, extracts its items, resolves them through the
//! detail pool and returns the records that are new to the dataset, in the
//! order the items appeared on the page.

use crate::config::DetailExhaustionPolicy;
use crate::crawler::dedup::Deduplicator;
use crate::crawler::pool::{DetailFetchPool, DetailOutcome};
use crate::crawler::retry::{RetryOutcome, RetryPolicy};
use crate::crawler::source::ListingSource;
use crate::storage::Record;
use crate::HarvestError;
use std::sync::Arc;

/// Result of processing one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// The page fetch failed on every attempt
    FetchExhausted { attempts: u32, error: String },

    /// The page was fetched but listed no items
    Empty,

    /// Items were resolved; `records` holds only new ones, in page order
    Processed {
        records: Vec<Record>,
        extracted: usize,
        duplicates: usize,
        skipped: usize,
    },
}

/// Turns a page number into ordered, deduplicated records
pub struct PageProcessor {
    source: Arc<dyn ListingSource>,
    retry: RetryPolicy,
    pool: DetailFetchPool,
    exhaustion: DetailExhaustionPolicy,
}

impl PageProcessor {
    /// Creates a page processor
    ///
    /// # Arguments
    ///
    /// * `source` - Listing source shared with the detail pool
    /// * `retry` - Retry policy for page and detail fetches
    /// * `max_workers` - Detail pool size
    /// * `exhaustion` - Whether an unreachable item aborts or is skipped
    pub fn new(
        source: Arc<dyn ListingSource>,
        retry: RetryPolicy,
        max_workers: usize,
        exhaustion: DetailExhaustionPolicy,
    ) -> Self {
        let fail_fast = exhaustion == DetailExhaustionPolicy::Abort;
        let pool = DetailFetchPool::new(Arc::clone(&source), retry, max_workers, fail_fast);
        Self {
            source,
            retry,
            pool,
            exhaustion,
        }
    }

    /// Processes one page
    ///
    /// # Flow
    ///
    /// 1. Fetch the page through the retry policy
    /// 2. Extract item references
    /// 3. Resolve all items concurrently
    /// 4. Drop items whose key is already known and mark the rest
    /// 5. Sort survivors by their position on the page
    ///
    /// `dedup` is only touched after every detail fetch has finished.
    ///
    /// # Returns
    ///
    /// * `Ok(PageOutcome)` - What happened to the page
    /// * `Err(HarvestError::DetailExhausted)` - An item could not be resolved
    ///   and the policy is `Abort`
    pub async fn process(
        &self,
        page_number: u32,
        dedup: &mut Deduplicator,
    ) -> Result<PageOutcome, HarvestError> {
        let label = format!("Page {}", page_number);
        let page = match self
            .retry
            .execute(&label, || self.source.fetch_page(page_number))
            .await
        {
            RetryOutcome::Success { value, .. } => value,
            RetryOutcome::Exhausted {
                attempts,
                last_error,
            } => {
                tracing::error!("Max retries reached for page {}. Skipping.", page_number);
                return Ok(PageOutcome::FetchExhausted {
                    attempts,
                    error: last_error.to_string(),
                });
            }
        };

        let items = self.source.extract(&page);
        if items.is_empty() {
            tracing::warn!("No items found on page {}", page_number);
            return Ok(PageOutcome::Empty);
        }

        let extracted = items.len();
        tracing::info!("Page {}: found {} item links", page_number, extracted);

        let outcomes = self.pool.run_all(items).await?;

        let mut fetched = Vec::with_capacity(outcomes.len());
        let mut skipped = 0;
        for outcome in outcomes {
            match outcome {
                DetailOutcome::Fetched(record) => fetched.push(record),
                DetailOutcome::Exhausted {
                    item,
                    attempts,
                    error,
                } => match self.exhaustion {
                    DetailExhaustionPolicy::Abort => {
                        tracing::error!(
                            "Detail fetch for {} exhausted after {} attempts. Terminating.",
                            item.locator,
                            attempts
                        );
                        return Err(HarvestError::DetailExhausted {
                            locator: item.locator,
                            page_number: item.page_number,
                            attempts,
                            reason: error,
                        });
                    }
                    DetailExhaustionPolicy::Skip => {
                        tracing::warn!(
                            "Skipping {} on page {} after {} attempts: {}",
                            item.locator,
                            item.page_number,
                            attempts,
                            error
                        );
                        skipped += 1;
                    }
                },
            }
        }

        // Sorting first means a key repeated within the page keeps its earliest slot
        fetched.sort_by_key(|record| record.original_index);

        let mut duplicates = 0;
        let mut records = Vec::with_capacity(fetched.len());
        for record in fetched {
            if dedup.mark(&record.item_key) {
                records.push(record);
            } else {
                tracing::debug!("Skipping known item {}", record.item_key);
                duplicates += 1;
            }
        }

        Ok(PageOutcome::Processed {
            records,
            extracted,
            duplicates,
            skipped,
        })
    }
}
