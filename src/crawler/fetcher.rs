//! HTTP listing source
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - GET requests for listing and detail pages
//! - Error classification (blocked, timeout, unexpected status)
//!
//! Retries are not handled here; the coordinator wraps every call in its
//! retry policy.

use crate::config::{Config, SourceConfig, UserAgentConfig};
use crate::crawler::parser::{parse_detail, parse_listing, PageSelectors};
use crate::crawler::source::{FetchError, ItemDetail, ItemRef, ListingSource, RawPage};
use crate::HarvestError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use url::Url;

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Whole-request timeout
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use page_harvester::config::UserAgentConfig;
/// use page_harvester::crawler::build_http_client;
/// use std::time::Duration;
///
/// let client = build_http_client(&UserAgentConfig::default(), Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    // Format: CrawlerName/Version (+ContactURL; ContactEmail)
    let user_agent = format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    );

    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Listing source that scrapes HTML over HTTP
pub struct HttpListingSource {
    client: Client,
    source: SourceConfig,
    selectors: PageSelectors,
}

impl HttpListingSource {
    /// Creates a source from the full configuration
    ///
    /// # Returns
    ///
    /// * `Ok(HttpListingSource)` - Client built and selectors compiled
    /// * `Err(HarvestError)` - Bad selector or client construction failure
    pub fn new(config: &Config) -> Result<Self, HarvestError> {
        let client = build_http_client(
            &config.user_agent,
            Duration::from_secs(config.source.request_timeout_secs),
        )?;
        let selectors = PageSelectors::from_config(&config.source)?;

        Ok(Self {
            client,
            source: config.source.clone(),
            selectors,
        })
    }

    /// Fetches a URL and returns its body
    ///
    /// # Error Classification
    ///
    /// | Condition | Error |
    /// |-----------|-------|
    /// | HTTP 403 / 429 / 503 | `Blocked` |
    /// | Other non-2xx | `Status` |
    /// | Timeout | `Timeout` |
    /// | Connection or body error | `Http` |
    async fn get(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status();
        if matches!(
            status,
            StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE
        ) {
            return Err(FetchError::Blocked {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| classify_error(url, e))
    }
}

fn classify_error(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Http {
            url: url.to_string(),
            source: error,
        }
    }
}

#[async_trait]
impl ListingSource for HttpListingSource {
    async fn fetch_page(&self, page_number: u32) -> Result<RawPage, FetchError> {
        let url = self.source.listing_url(page_number);
        tracing::debug!("Fetching listing page {}: {}", page_number, url);
        let body = self.get(&url).await?;
        Ok(RawPage {
            page_number,
            url,
            body,
        })
    }

    fn extract(&self, page: &RawPage) -> Vec<ItemRef> {
        let base = match Url::parse(&page.url) {
            Ok(base) => base,
            Err(e) => {
                tracing::warn!("Cannot resolve links on {}: {}", page.url, e);
                return Vec::new();
            }
        };

        parse_listing(&page.body, &base, &self.selectors)
            .into_iter()
            .enumerate()
            .map(|(original_index, locator)| ItemRef {
                locator,
                page_number: page.page_number,
                original_index,
            })
            .collect()
    }

    async fn fetch_detail(&self, item: &ItemRef) -> Result<ItemDetail, FetchError> {
        let url = Url::parse(&item.locator).map_err(|e| FetchError::Parse {
            url: item.locator.clone(),
            message: e.to_string(),
        })?;

        let body = self.get(url.as_str()).await?;

        parse_detail(&body, &url, &self.selectors).map_err(|message| FetchError::Parse {
            url: item.locator.clone(),
            message,
        })
    }
}
