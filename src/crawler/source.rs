//! Listing source abstraction
//!
//! A listing source knows how to fetch one listing page, turn it into item
//! references, and resolve a single item reference into its detail fields.
//! The coordinator only talks to this trait, so the transport can be swapped
//! without touching orchestration.

use crate::storage::{Record, NOT_AVAILABLE};
use async_trait::async_trait;
use thiserror::Error;

/// Errors produced by a listing source; all of them are retryable
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Unexpected status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Request blocked by remote for {url} (status {status})")]
    Blocked { url: String, status: u16 },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Parse error for {url}: {message}")]
    Parse { url: String, message: String },

    #[error("Source unavailable for {locator}: {reason}")]
    Unavailable { locator: String, reason: String },
}

/// Body of one fetched listing page
#[derive(Debug, Clone)]
pub struct RawPage {
    pub page_number: u32,
    pub url: String,
    pub body: String,
}

/// Reference to an item that has not been resolved yet
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemRef {
    /// Where the detail lives (usually an absolute URL)
    pub locator: String,

    /// Listing page the item was found on
    pub page_number: u32,

    /// Position within that page's extracted sequence
    pub original_index: usize,
}

/// Fields resolved by a detail fetch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemDetail {
    pub item_key: String,
    pub title: Option<String>,
    pub size_label: Option<String>,
    pub category: Option<String>,
    pub magnet_link: Option<String>,
}

impl ItemDetail {
    /// Builds the record for `item`, filling missing fields with `N/A`
    pub fn into_record(self, item: &ItemRef) -> Record {
        let or_na = |field: Option<String>| field.unwrap_or_else(|| NOT_AVAILABLE.to_string());
        Record {
            page_number: item.page_number,
            item_key: self.item_key,
            title: or_na(self.title),
            size_label: or_na(self.size_label),
            category: or_na(self.category),
            magnet_link: or_na(self.magnet_link),
            original_index: item.original_index,
        }
    }
}

/// Transport and extraction for a paginated listing
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Fetches one listing page
    async fn fetch_page(&self, page_number: u32) -> Result<RawPage, FetchError>;

    /// Extracts item references from a fetched page, in page order
    fn extract(&self, page: &RawPage) -> Vec<ItemRef>;

    /// Resolves one item reference into its detail fields
    async fn fetch_detail(&self, item: &ItemRef) -> Result<ItemDetail, FetchError>;
}
