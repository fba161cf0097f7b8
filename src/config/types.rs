use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Page-Harvester
///
/// Every section has defaults so the crawler can run from environment
/// overrides alone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub source: SourceConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    pub checkpoint: CheckpointConfig,
}

impl Config {
    /// Resolved path of the record output, derived from the target when unset
    pub fn output_path(&self) -> PathBuf {
        match &self.output.path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(format!(
                "{}.{}",
                self.source.target_id,
                self.output.format.extension()
            )),
        }
    }
}

/// What to do when a single item's detail fetch runs out of retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailExhaustionPolicy {
    /// Stop the whole crawl
    #[default]
    Abort,
    /// Log the item, count it and keep going
    Skip,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// First page to crawl (inclusive)
    #[serde(rename = "start-page")]
    pub start_page: u32,

    /// Last page to crawl (inclusive); may be below `start_page`
    #[serde(rename = "end-page")]
    pub end_page: u32,

    /// Additional attempts after the first failed fetch
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Fixed wait between fetch attempts (milliseconds)
    #[serde(rename = "retry-delay-ms")]
    pub retry_delay_ms: u64,

    /// Maximum number of detail fetches in flight
    #[serde(rename = "max-workers")]
    pub max_workers: u32,

    /// Productive pages between checkpoints
    #[serde(rename = "commit-interval")]
    pub commit_interval: u32,

    /// Consecutive failed pages before the crawl is aborted
    #[serde(rename = "max-consecutive-failures")]
    pub max_consecutive_failures: u32,

    /// Lower bound of the randomized delay between pages (milliseconds)
    #[serde(rename = "pacing-min-ms")]
    pub pacing_min_ms: u64,

    /// Upper bound of the randomized delay between pages (milliseconds)
    #[serde(rename = "pacing-max-ms")]
    pub pacing_max_ms: u64,

    /// Whether a page with no items counts toward the circuit breaker
    #[serde(rename = "empty-page-counts-as-failure")]
    pub empty_page_counts_as_failure: bool,

    #[serde(rename = "detail-exhaustion")]
    pub detail_exhaustion: DetailExhaustionPolicy,
}

impl CrawlerConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            start_page: 100,
            end_page: 1,
            max_retries: 3,
            retry_delay_ms: 5_000,
            max_workers: 10,
            commit_interval: 10,
            max_consecutive_failures: 5,
            pacing_min_ms: 1_000,
            pacing_max_ms: 3_000,
            empty_page_counts_as_failure: true,
            detail_exhaustion: DetailExhaustionPolicy::Abort,
        }
    }
}

/// Remote listing configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Which listing to crawl (substituted for `{target}`)
    #[serde(rename = "target-id")]
    pub target_id: String,

    /// Scheme and host of the remote site
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Listing page path template with `{target}` and `{page}` placeholders
    #[serde(rename = "listing-path")]
    pub listing_path: String,

    /// Selects the item links on a listing page
    #[serde(rename = "item-selector")]
    pub item_selector: String,

    #[serde(rename = "title-selector")]
    pub title_selector: String,

    #[serde(rename = "size-selector")]
    pub size_selector: String,

    #[serde(rename = "category-selector")]
    pub category_selector: String,

    #[serde(rename = "magnet-selector")]
    pub magnet_selector: String,

    /// Whole-request timeout (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,
}

impl SourceConfig {
    /// Builds the listing URL for one page
    pub fn listing_url(&self, page: u32) -> String {
        let path = self
            .listing_path
            .replace("{target}", &self.target_id)
            .replace("{page}", &page.to_string());
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            target_id: "mLisa".to_string(),
            base_url: "https://www.1337x.to".to_string(),
            listing_path: "/{target}-torrents/{page}/".to_string(),
            item_selector: "td.name a[href*='/torrent/']".to_string(),
            title_selector: "div.box-info-heading h1".to_string(),
            size_selector: "ul.list li:nth-child(4) span".to_string(),
            category_selector: "ul.list li:nth-child(1) span".to_string(),
            magnet_selector: "a[href^='magnet:']".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "PageHarvester".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "https://example.com/about".to_string(),
            contact_email: "admin@example.com".to_string(),
        }
    }
}

/// Record storage backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Sqlite,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Sqlite => "db",
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,

    /// Record file path; defaults to `{target}.csv` or `{target}.db`
    pub path: Option<String>,

    /// Path to the markdown summary file
    #[serde(rename = "summary-path")]
    pub summary_path: Option<String>,
}

/// Checkpoint publishing configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CheckpointConfig {
    pub enabled: bool,

    /// Working tree of the repository holding the output
    #[serde(rename = "repo-dir")]
    pub repo_dir: String,

    pub remote: String,

    pub branch: String,

    #[serde(rename = "author-name")]
    pub author_name: Option<String>,

    #[serde(rename = "author-email")]
    pub author_email: Option<String>,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            repo_dir: ".".to_string(),
            remote: "origin".to_string(),
            branch: "main".to_string(),
            author_name: None,
            author_email: None,
        }
    }
}
