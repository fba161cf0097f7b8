//! Markdown summary generation
//!
//! This module generates human-readable markdown summaries of the collected
//! dataset, including the outcome of the last crawl when one just ran.

use crate::output::traits::{CrawlSummary, OutputResult};
use crate::state::CrawlPhase;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes a markdown summary to `output_path`
///
/// # Arguments
///
/// * `summary` - The summary data
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(OutputError)` - Failed to write summary
pub fn generate_markdown_summary(summary: &CrawlSummary, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_summary(summary);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

fn phase_label(phase: CrawlPhase) -> &'static str {
    match phase {
        CrawlPhase::Running => "running",
        CrawlPhase::Terminated { success: true } => "completed",
        CrawlPhase::Terminated { success: false } => "terminated early",
    }
}

/// Formats a summary as markdown
pub fn format_markdown_summary(summary: &CrawlSummary) -> String {
    let stats = &summary.statistics;
    let mut md = String::new();

    md.push_str(&format!("# Harvest Summary: {}\n\n", summary.target_id));

    md.push_str("## Dataset\n\n");
    md.push_str(&format!("- **Output**: {}\n", summary.output_path));
    md.push_str(&format!(
        "- **Generated**: {}\n",
        summary.generated_at.to_rfc3339()
    ));
    if let Some(hash) = &summary.config_hash {
        md.push_str(&format!("- **Config Hash**: {}\n", hash));
    }
    md.push_str(&format!("- **Total Records**: {}\n", stats.total_records));
    md.push_str(&format!("- **Distinct Pages**: {}\n", stats.distinct_pages));
    if let (Some(low), Some(high)) = (stats.lowest_page, stats.highest_page) {
        md.push_str(&format!("- **Page Span**: {} to {}\n", low, high));
    }
    md.push_str(&format!(
        "- **Magnet Coverage**: {:.2}% ({} missing)\n\n",
        summary.magnet_coverage(),
        stats.missing_magnet
    ));

    if !stats.records_by_category.is_empty() {
        md.push_str("## Records by Category\n\n");
        md.push_str("| Category | Records |\n");
        md.push_str("|----------|---------|\n");
        for (category, count) in &stats.records_by_category {
            md.push_str(&format!("| {} | {} |\n", category, count));
        }
        md.push('\n');
    }

    if let Some(run) = &summary.last_run {
        md.push_str("## Last Crawl\n\n");
        md.push_str(&format!(
            "- **Pages**: {} to {}\n",
            run.range.start, run.range.end
        ));
        md.push_str(&format!("- **Started**: {}\n", run.started_at.to_rfc3339()));
        if let Some(finished) = run.finished_at {
            md.push_str(&format!("- **Finished**: {}\n", finished.to_rfc3339()));
        }
        if let Some(duration) = run.duration_seconds() {
            md.push_str(&format!(
                "- **Duration**: {} seconds ({:.2} minutes)\n",
                duration,
                duration as f64 / 60.0
            ));
        }
        md.push_str(&format!("- **Status**: {}\n\n", phase_label(run.phase)));

        md.push_str("| Counter | Value |\n");
        md.push_str("|---------|-------|\n");
        md.push_str(&format!("| Pages attempted | {} |\n", run.pages_attempted));
        md.push_str(&format!("| Pages succeeded | {} |\n", run.pages_succeeded));
        md.push_str(&format!("| Pages failed | {} |\n", run.pages_failed));
        md.push_str(&format!("| Empty pages | {} |\n", run.pages_empty));
        md.push_str(&format!("| Records added | {} |\n", run.records_added));
        md.push_str(&format!(
            "| Duplicates skipped | {} |\n",
            run.duplicates_skipped
        ));
        md.push_str(&format!("| Items skipped | {} |\n", run.items_skipped));
        md.push_str(&format!("| Checkpoints | {} |\n\n", run.checkpoints));
    }

    md
}
