//! Output module for dataset statistics and summaries
//!
//! This module handles:
//! - Computing statistics over the collected records
//! - Generating markdown summaries, optionally with the last crawl's report

mod markdown;
pub mod stats;
mod traits;

pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use stats::{load_statistics, print_statistics, DatasetStatistics};
pub use traits::{CrawlSummary, OutputError, OutputResult};

use crate::config::Config;
use crate::crawler::CrawlReport;
use crate::storage::RecordSink;

/// Builds a dataset summary from a record sink
///
/// # Arguments
///
/// * `config` - The configuration that names the target and output
/// * `sink` - The sink holding the dataset
/// * `report` - Report of the crawl that just ran, if any
///
/// # Returns
///
/// * `Ok(CrawlSummary)` - Successfully generated summary
/// * `Err(OutputError)` - Failed to read the dataset
pub fn generate_summary(
    config: &Config,
    sink: &dyn RecordSink,
    report: Option<CrawlReport>,
) -> OutputResult<CrawlSummary> {
    let statistics = load_statistics(sink)?;
    let summary = CrawlSummary::new(
        &config.source.target_id,
        &config.output_path().display().to_string(),
        statistics,
    );

    Ok(match report {
        Some(report) => summary.with_report(report),
        None => summary,
    })
}
