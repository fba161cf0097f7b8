use crate::config::types::{CheckpointConfig, Config, CrawlerConfig, SourceConfig};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_source_config(&config.source)?;
    validate_checkpoint_config(&config.checkpoint)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.start_page < 1 || config.end_page < 1 {
        return Err(ConfigError::Validation(format!(
            "page numbers start at 1, got range {}..={}",
            config.start_page, config.end_page
        )));
    }

    if config.max_workers < 1 || config.max_workers > 100 {
        return Err(ConfigError::Validation(format!(
            "max_workers must be between 1 and 100, got {}",
            config.max_workers
        )));
    }

    if config.commit_interval < 1 {
        return Err(ConfigError::Validation(
            "commit_interval must be >= 1".to_string(),
        ));
    }

    if config.max_consecutive_failures < 1 {
        return Err(ConfigError::Validation(
            "max_consecutive_failures must be >= 1".to_string(),
        ));
    }

    if config.pacing_min_ms > config.pacing_max_ms {
        return Err(ConfigError::Validation(format!(
            "pacing_min_ms ({}) must not exceed pacing_max_ms ({})",
            config.pacing_min_ms, config.pacing_max_ms
        )));
    }

    Ok(())
}

/// Validates the listing source configuration
fn validate_source_config(config: &SourceConfig) -> Result<(), ConfigError> {
    if config.target_id.trim().is_empty() {
        return Err(ConfigError::Validation(
            "target_id cannot be empty".to_string(),
        ));
    }

    let base = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if !matches!(base.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url must use http or https, got '{}'",
            base.scheme()
        )));
    }

    if !config.listing_path.contains("{page}") {
        return Err(ConfigError::Validation(format!(
            "listing_path must contain a {{page}} placeholder, got '{}'",
            config.listing_path
        )));
    }

    for (name, selector) in [
        ("item_selector", &config.item_selector),
        ("title_selector", &config.title_selector),
        ("size_selector", &config.size_selector),
        ("category_selector", &config.category_selector),
        ("magnet_selector", &config.magnet_selector),
    ] {
        Selector::parse(selector).map_err(|e| {
            ConfigError::InvalidSelector(format!("{} '{}': {:?}", name, selector, e))
        })?;
    }

    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates checkpoint configuration; only checked when enabled
fn validate_checkpoint_config(config: &CheckpointConfig) -> Result<(), ConfigError> {
    if !config.enabled {
        return Ok(());
    }

    if config.remote.trim().is_empty() {
        return Err(ConfigError::Validation(
            "checkpoint remote cannot be empty".to_string(),
        ));
    }

    if config.branch.trim().is_empty() {
        return Err(ConfigError::Validation(
            "checkpoint branch cannot be empty".to_string(),
        ));
    }

    Ok(())
}
