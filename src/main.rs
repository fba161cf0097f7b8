//! Page-Harvester main entry point
//!
//! This is the command-line interface for the Page-Harvester listing crawler.

use anyhow::Context;
use clap::Parser;
use page_harvester::config::{load_config_with_hash, Config};
use page_harvester::crawler::{Coordinator, CrawlReport, PageRange};
use page_harvester::output::{generate_markdown_summary, generate_summary, print_statistics};
use page_harvester::storage::open_sink;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Page-Harvester: a resumable listing crawler
///
/// Page-Harvester walks a paginated listing, resolves every item into a
/// record, skips items it already has and periodically checkpoints the
/// output to a git repository.
#[derive(Parser, Debug)]
#[command(name = "page-harvester")]
#[command(version = "1.0.0")]
#[command(about = "A resumable listing crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long, conflicts_with_all = ["stats", "export_summary"])]
    dry_run: bool,

    /// Show statistics from the collected dataset and exit
    #[arg(long, conflicts_with_all = ["dry_run", "export_summary"])]
    stats: bool,

    /// Generate markdown summary from the collected dataset and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    export_summary: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    match &cli.config {
        Some(path) => tracing::info!("Loading configuration from: {}", path.display()),
        None => tracing::info!("No configuration file given, using defaults"),
    }
    let (config, config_hash) = match load_config_with_hash(cli.config.as_deref()) {
        Ok((cfg, hash)) => {
            if let Some(hash) = &hash {
                tracing::info!("Configuration loaded successfully (hash: {})", hash);
            }
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return ExitCode::from(1);
        }
    };

    // Handle different modes
    let result = if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else if cli.export_summary {
        handle_export_summary(&config, config_hash)
    } else {
        return handle_crawl(&config, config_hash).await;
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::from(1)
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("page_harvester=info,warn"),
            1 => EnvFilter::new("page_harvester=debug,info"),
            2 => EnvFilter::new("page_harvester=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn summary_path(config: &Config) -> PathBuf {
    match &config.output.summary_path {
        Some(path) => PathBuf::from(path),
        None => PathBuf::from(format!("{}-summary.md", config.source.target_id)),
    }
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    let crawler = &config.crawler;
    let range = PageRange::new(crawler.start_page, crawler.end_page);

    println!("=== Page-Harvester Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Pages: {} to {} ({} pages)", range.start, range.end, range.len());
    println!("  Max retries: {}", crawler.max_retries);
    println!("  Retry delay: {}ms", crawler.retry_delay_ms);
    println!("  Detail workers: {}", crawler.max_workers);
    println!("  Commit interval: {} pages", crawler.commit_interval);
    println!(
        "  Max consecutive failures: {}",
        crawler.max_consecutive_failures
    );
    println!(
        "  Pacing: {}ms to {}ms",
        crawler.pacing_min_ms, crawler.pacing_max_ms
    );
    println!(
        "  Empty page counts as failure: {}",
        crawler.empty_page_counts_as_failure
    );
    println!("  Detail exhaustion: {:?}", crawler.detail_exhaustion);

    println!("\nSource:");
    println!("  Target: {}", config.source.target_id);
    println!("  First listing: {}", config.source.listing_url(range.start));

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nOutput:");
    println!(
        "  Records: {} ({:?})",
        config.output_path().display(),
        config.output.format
    );
    println!("  Summary: {}", summary_path(config).display());

    println!("\nCheckpoint:");
    if config.checkpoint.enabled {
        println!(
            "  git {} -> {}/{}",
            config.checkpoint.repo_dir, config.checkpoint.remote, config.checkpoint.branch
        );
    } else {
        println!("  disabled");
    }

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the --stats mode: shows statistics from the dataset
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    use page_harvester::output::load_statistics;

    println!("Dataset: {}\n", config.output_path().display());

    let sink = open_sink(config).context("failed to open dataset")?;
    let stats = load_statistics(sink.as_ref()).context("failed to read dataset")?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --export-summary mode: generates markdown summary
fn handle_export_summary(config: &Config, config_hash: Option<String>) -> anyhow::Result<()> {
    let output = summary_path(config);

    println!("=== Exporting Dataset Summary ===\n");
    println!("Dataset: {}", config.output_path().display());
    println!("Output: {}", output.display());
    println!();

    write_summary(config, config_hash, None, &output)?;
    println!("✓ Summary exported to: {}", output.display());

    Ok(())
}

fn write_summary(
    config: &Config,
    config_hash: Option<String>,
    report: Option<CrawlReport>,
    output: &Path,
) -> anyhow::Result<()> {
    let sink = open_sink(config).context("failed to open dataset")?;

    tracing::info!("Generating markdown summary...");
    let summary = generate_summary(config, sink.as_ref(), report)
        .context("failed to summarize dataset")?
        .with_config_hash(config_hash);
    generate_markdown_summary(&summary, output)
        .with_context(|| format!("failed to write {}", output.display()))?;

    Ok(())
}

/// Handles the main crawl operation
///
/// Exit status follows `HarvestError::exit_code`.
async fn handle_crawl(config: &Config, config_hash: Option<String>) -> ExitCode {
    tracing::info!(
        "Target: {}, output: {}",
        config.source.target_id,
        config.output_path().display()
    );

    let report = match Coordinator::from_config(config) {
        Ok(mut coordinator) => coordinator.run().await,
        Err(e) => Err(e),
    };

    match report {
        Ok(report) => {
            tracing::info!(
                "Crawl completed successfully: {} records added, {} checkpoints",
                report.records_added,
                report.checkpoints
            );

            if config.output.summary_path.is_some() {
                let output = summary_path(config);
                if let Err(e) = write_summary(config, config_hash, Some(report), &output) {
                    tracing::error!("{:#}", e);
                    return ExitCode::from(1);
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
