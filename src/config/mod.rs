//! Configuration module for Page-Harvester
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files, with `TARGET_ID`, `START_PAGE` and `END_PAGE` environment overrides
//! applied on top.
//!
//! # Example
//!
//! ```no_run
//! use page_harvester::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Some(Path::new("harvester.toml"))).unwrap();
//! println!("Detail workers: {}", config.crawler.max_workers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    CheckpointConfig, Config, CrawlerConfig, DetailExhaustionPolicy, OutputConfig, OutputFormat,
    SourceConfig, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{
    apply_overrides, compute_config_hash, load_config, load_config_with_hash, parse_config,
    ENV_END_PAGE, ENV_START_PAGE, ENV_TARGET_ID,
};
pub use validation::validate;
