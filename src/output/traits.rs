//! Output types
//!
//! This module defines the error type for output operations and the
//! summary structure rendered by the markdown generator.

use crate::crawler::CrawlReport;
use crate::output::stats::DatasetStatistics;
use crate::storage::StorageError;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Everything a dataset summary reports
#[derive(Debug, Clone)]
pub struct CrawlSummary {
    pub generated_at: DateTime<Utc>,
    pub target_id: String,
    pub output_path: String,
    pub config_hash: Option<String>,
    pub statistics: DatasetStatistics,

    /// The crawl that just ran, if the summary follows one
    pub last_run: Option<CrawlReport>,
}

impl CrawlSummary {
    pub fn new(target_id: &str, output_path: &str, statistics: DatasetStatistics) -> Self {
        Self {
            generated_at: Utc::now(),
            target_id: target_id.to_string(),
            output_path: output_path.to_string(),
            config_hash: None,
            statistics,
            last_run: None,
        }
    }

    pub fn with_config_hash(mut self, hash: Option<String>) -> Self {
        self.config_hash = hash;
        self
    }

    pub fn with_report(mut self, report: CrawlReport) -> Self {
        self.last_run = Some(report);
        self
    }

    /// Share of records carrying a magnet link, as a percentage
    pub fn magnet_coverage(&self) -> f64 {
        let total = self.statistics.total_records;
        if total == 0 {
            return 0.0;
        }
        let present = total - self.statistics.missing_magnet;
        (present as f64 / total as f64) * 100.0
    }
}
