//! Page-Harvester: a resumable listing crawler
//!
//! This crate walks a paginated listing page by page, resolves every listed
//! item into a detail record through a bounded worker pool, drops items that
//! were already collected, appends the new records in listing order and
//! periodically checkpoints the output to a shared repository.

pub mod checkpoint;
pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Page-Harvester operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] checkpoint::CheckpointError),

    #[error("Circuit open: {consecutive_failures} consecutive page failures (last page {last_page})")]
    CircuitOpen {
        consecutive_failures: u32,
        last_page: u32,
    },

    #[error("Detail fetch exhausted for {locator} on page {page_number} after {attempts} attempts: {reason}")]
    DetailExhausted {
        locator: String,
        page_number: u32,
        attempts: u32,
        reason: String,
    },

    #[error("Worker task failed: {0}")]
    TaskJoin(String),
}

impl HarvestError {
    /// Process exit status for this error
    ///
    /// Circuit-breaker trips and detail exhaustion get their own codes so
    /// schedulers can tell an unhealthy source from a broken setup.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::CircuitOpen { .. } => 2,
            Self::DetailExhausted { .. } => 3,
            _ => 1,
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid CSS selector: {0}")]
    InvalidSelector(String),
}

/// Result type alias for Page-Harvester operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, CrawlReport};
pub use state::{CrawlPhase, CrawlState};
pub use storage::Record;
