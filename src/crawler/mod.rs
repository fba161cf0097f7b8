//! Crawler module for listing traversal and item resolution
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching and error classification
//! - HTML parsing of listing and detail pages
//! - Fixed-delay retries and the bounded detail worker pool
//! - Per-page processing, deduplication and ordering
//! - Overall crawl coordination
//!
//! [`testing`] holds scripted collaborators that drive the crawl loop
//! without a network.

mod coordinator;
mod dedup;
mod fetcher;
mod parser;
mod pool;
mod processor;
mod retry;
mod source;

pub mod testing;

pub use coordinator::{pacing_delay, run_crawl, Coordinator, CrawlReport, PageRange};
pub use dedup::Deduplicator;
pub use fetcher::{build_http_client, HttpListingSource};
pub use parser::{extract_item_key, parse_detail, parse_listing, PageSelectors};
pub use pool::{DetailFetchPool, DetailOutcome};
pub use processor::{PageOutcome, PageProcessor};
pub use retry::{RetryOutcome, RetryPolicy};
pub use source::{FetchError, ItemDetail, ItemRef, ListingSource, RawPage};
