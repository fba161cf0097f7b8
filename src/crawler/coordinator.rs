//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the page loop that coordinates the crawl:
//! - Seeding deduplication from the record sink
//! - Walking the page range in either direction
//! - Counting consecutive page failures and opening the circuit
//! - Appending new records and checkpointing on a fixed cadence
//! - Pacing requests with a randomized delay between pages

use crate::checkpoint::{open_publisher, run_checkpoint, CheckpointPublisher};
use crate::config::{Config, CrawlerConfig};
use crate::crawler::dedup::Deduplicator;
use crate::crawler::fetcher::HttpListingSource;
use crate::crawler::processor::{PageOutcome, PageProcessor};
use crate::crawler::retry::RetryPolicy;
use crate::crawler::source::ListingSource;
use crate::state::{CrawlPhase, CrawlState};
use crate::storage::{open_sink, RecordSink};
use crate::HarvestError;
use chrono::{DateTime, Utc};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

/// Inclusive page range, walked from `start` toward `end`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub start: u32,
    pub end: u32,
}

impl PageRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn is_descending(&self) -> bool {
        self.start > self.end
    }

    pub fn len(&self) -> u32 {
        self.start.abs_diff(self.end) + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Page numbers in crawl order
    pub fn pages(&self) -> Box<dyn Iterator<Item = u32> + Send> {
        if self.is_descending() {
            Box::new((self.end..=self.start).rev())
        } else {
            Box::new(self.start..=self.end)
        }
    }
}

/// Outcome and counters of one crawl
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub range: PageRange,
    pub phase: CrawlPhase,
    pub pages_attempted: u32,
    pub pages_succeeded: u32,
    pub pages_failed: u32,
    pub pages_empty: u32,
    pub records_added: usize,
    pub duplicates_skipped: usize,
    pub items_skipped: usize,
    pub checkpoints: u32,
}

impl CrawlReport {
    fn new(range: PageRange) -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            range,
            phase: CrawlPhase::Running,
            pages_attempted: 0,
            pages_succeeded: 0,
            pages_failed: 0,
            pages_empty: 0,
            records_added: 0,
            duplicates_skipped: 0,
            items_skipped: 0,
            checkpoints: 0,
        }
    }

    pub fn duration_seconds(&self) -> Option<i64> {
        self.finished_at
            .map(|finished| (finished - self.started_at).num_seconds())
    }
}

/// Settings the page loop needs, lifted out of the crawler configuration
#[derive(Debug, Clone)]
struct LoopSettings {
    range: PageRange,
    commit_interval: u32,
    max_consecutive_failures: u32,
    pacing_min: Duration,
    pacing_max: Duration,
    empty_page_counts_as_failure: bool,
}

impl From<&CrawlerConfig> for LoopSettings {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            range: PageRange::new(config.start_page, config.end_page),
            commit_interval: config.commit_interval,
            max_consecutive_failures: config.max_consecutive_failures,
            pacing_min: Duration::from_millis(config.pacing_min_ms),
            pacing_max: Duration::from_millis(config.pacing_max_ms),
            empty_page_counts_as_failure: config.empty_page_counts_as_failure,
        }
    }
}

/// Main crawler coordinator structure
pub struct Coordinator {
    settings: LoopSettings,
    processor: PageProcessor,
    sink: Box<dyn RecordSink>,
    publisher: Box<dyn CheckpointPublisher>,
    state: CrawlState,
    report: CrawlReport,
}

impl Coordinator {
    /// Creates a coordinator from explicit collaborators
    ///
    /// Deduplication is seeded from every key already in `sink`.
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `source` - Listing transport and extraction
    /// * `sink` - Destination of new records
    /// * `publisher` - Checkpoint destination
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(HarvestError)` - Failed to load existing keys
    pub fn new(
        config: &Config,
        source: Arc<dyn ListingSource>,
        sink: Box<dyn RecordSink>,
        publisher: Box<dyn CheckpointPublisher>,
    ) -> Result<Self, HarvestError> {
        let crawler = &config.crawler;
        let settings = LoopSettings::from(crawler);

        let known_keys = Deduplicator::from_keys(sink.load_keys()?);
        tracing::info!("Loaded {} previously collected items", known_keys.len());

        let retry = RetryPolicy::new(crawler.max_retries, crawler.retry_delay());
        let processor = PageProcessor::new(
            source,
            retry,
            crawler.max_workers as usize,
            crawler.detail_exhaustion,
        );

        Ok(Self {
            state: CrawlState::new(settings.range.start, known_keys),
            report: CrawlReport::new(settings.range),
            settings,
            processor,
            sink,
            publisher,
        })
    }

    /// Creates a coordinator wired to the HTTP source, the configured sink
    /// and the configured checkpoint publisher
    pub fn from_config(config: &Config) -> Result<Self, HarvestError> {
        let source: Arc<dyn ListingSource> = Arc::new(HttpListingSource::new(config)?);
        let sink = open_sink(config)?;
        let publisher = open_publisher(config);
        Self::new(config, source, sink, publisher)
    }

    pub fn state(&self) -> &CrawlState {
        &self.state
    }

    pub fn report(&self) -> &CrawlReport {
        &self.report
    }

    pub fn sink(&self) -> &dyn RecordSink {
        self.sink.as_ref()
    }

    /// Runs the page loop to completion
    ///
    /// For every page in range order:
    /// 1. Process the page (fetch with retries, resolve items, dedup, order)
    /// 2. On fetch exhaustion or an empty page, count a failure and stop with
    ///    `CircuitOpen` once the threshold is reached
    /// 3. Otherwise reset the failure count and append the new records
    /// 4. Checkpoint after every `commit_interval` productive pages
    /// 5. Sleep a randomized pacing interval before the next page
    ///
    /// After the last page a final checkpoint covers any uncommitted records.
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlReport)` - The whole range was processed
    /// * `Err(HarvestError)` - Circuit opened, an item was unreachable, or
    ///   persistence/checkpointing failed
    pub async fn run(&mut self) -> Result<CrawlReport, HarvestError> {
        let range = self.settings.range;
        tracing::info!(
            "Starting crawl of {} pages ({} to {})",
            range.len(),
            range.start,
            range.end
        );

        match self.crawl_range().await {
            Ok(()) => {
                self.finish(true);
                tracing::info!(
                    "Crawl completed: {} new records from {} pages",
                    self.report.records_added,
                    self.report.pages_succeeded
                );
                Ok(self.report.clone())
            }
            Err(e) => {
                self.finish(false);
                Err(e)
            }
        }
    }

    async fn crawl_range(&mut self) -> Result<(), HarvestError> {
        let mut pages = self.settings.range.pages().peekable();

        while let Some(page_number) = pages.next() {
            self.state.current_page = page_number;
            self.report.pages_attempted += 1;

            let outcome = self
                .processor
                .process(page_number, &mut self.state.known_keys)
                .await?;

            self.handle_outcome(page_number, outcome).await?;

            if pages.peek().is_some() {
                self.pace().await;
            }
        }

        self.final_checkpoint().await
    }

    async fn handle_outcome(
        &mut self,
        page_number: u32,
        outcome: PageOutcome,
    ) -> Result<(), HarvestError> {
        match outcome {
            PageOutcome::FetchExhausted { .. } => self.page_failed(page_number),
            PageOutcome::Empty if self.settings.empty_page_counts_as_failure => {
                self.report.pages_empty += 1;
                self.page_failed(page_number)
            }
            PageOutcome::Empty => {
                self.report.pages_empty += 1;
                self.page_succeeded(page_number, 0).await
            }
            PageOutcome::Processed {
                records,
                duplicates,
                skipped,
                ..
            } => {
                self.report.duplicates_skipped += duplicates;
                self.report.items_skipped += skipped;

                let written = self.sink.append(&records)?;
                if written > 0 {
                    tracing::info!("Page {}: saved {} new records", page_number, written);
                } else {
                    tracing::info!("Page {}: no new records", page_number);
                }
                self.report.records_added += written;

                self.page_succeeded(page_number, written).await
            }
        }
    }

    fn page_failed(&mut self, page_number: u32) -> Result<(), HarvestError> {
        self.report.pages_failed += 1;
        let threshold = self.settings.max_consecutive_failures;

        if self.state.record_failure(threshold) {
            tracing::error!(
                "Consecutive failures reached {}. Terminating crawl at page {}.",
                threshold,
                page_number
            );
            return Err(HarvestError::CircuitOpen {
                consecutive_failures: self.state.consecutive_failures,
                last_page: page_number,
            });
        }

        tracing::warn!(
            "Page {} failed ({}/{} consecutive)",
            page_number,
            self.state.consecutive_failures,
            threshold
        );
        Ok(())
    }

    async fn page_succeeded(&mut self, page_number: u32, written: usize) -> Result<(), HarvestError> {
        self.state.record_success();
        self.report.pages_succeeded += 1;
        self.state.window.record_page(page_number, written);

        if self.state.window.is_due(self.settings.commit_interval) {
            if let Some((first, last)) = self.state.window.span() {
                let label = format!("Update data for pages {} to {}", first, last);
                self.checkpoint(&label).await?;
            }
        }

        Ok(())
    }

    async fn final_checkpoint(&mut self) -> Result<(), HarvestError> {
        if !self.state.window.has_uncommitted() {
            return Ok(());
        }

        if let Some((first, last)) = self.state.window.span() {
            let label = format!("Final update for pages {} to {}", first, last);
            self.checkpoint(&label).await?;
        }
        Ok(())
    }

    async fn checkpoint(&mut self, label: &str) -> Result<(), HarvestError> {
        tracing::info!(
            "Checkpointing {} records: {}",
            self.state.window.uncommitted_records(),
            label
        );
        let artifacts = self.sink.artifacts();
        run_checkpoint(self.publisher.as_ref(), &artifacts, label).await?;

        self.state.window.reset();
        self.report.checkpoints += 1;
        Ok(())
    }

    async fn pace(&mut self) {
        let delay = pacing_delay(self.settings.pacing_min, self.settings.pacing_max);
        if !delay.is_zero() {
            tracing::debug!("Pacing for {:?}", delay);
            tokio::time::sleep(delay).await;
        }
    }

    fn finish(&mut self, success: bool) {
        self.state.terminate(success);
        self.report.phase = self.state.phase;
        self.report.finished_at = Some(Utc::now());
    }
}

/// Picks a uniformly random delay in `[min, max]`
pub fn pacing_delay(min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    let millis = rand::thread_rng().gen_range(min.as_millis()..=max.as_millis());
    Duration::from_millis(millis as u64)
}

/// Runs a complete crawl with collaborators built from the configuration
///
/// # Example
///
/// ```no_run
/// use page_harvester::config::load_config;
/// use page_harvester::crawler::run_crawl;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(None)?;
/// let report = run_crawl(&config).await?;
/// println!("{} new records", report.records_added);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: &Config) -> Result<CrawlReport, HarvestError> {
    let mut coordinator = Coordinator::from_config(config)?;
    coordinator.run().await
}
