use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Environment variables that override the file configuration
pub const ENV_TARGET_ID: &str = "TARGET_ID";
pub const ENV_START_PAGE: &str = "START_PAGE";
pub const ENV_END_PAGE: &str = "END_PAGE";

/// Loads a configuration file, applies environment overrides and validates it
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file, or `None` to start from defaults
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use page_harvester::config::load_config;
///
/// let config = load_config(Some(Path::new("harvester.toml"))).unwrap();
/// println!("Crawling pages {} to {}", config.crawler.start_page, config.crawler.end_page);
/// ```
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(path) => parse_config(&std::fs::read_to_string(path)?)?,
        None => Config::default(),
    };

    apply_overrides(&mut config, |key| std::env::var(key).ok())?;

    validate(&config)?;

    Ok(config)
}

/// Parses TOML content into a configuration without validating it
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Applies `TARGET_ID`, `START_PAGE` and `END_PAGE` overrides
///
/// `lookup` resolves a variable name to its value, which keeps the
/// process environment out of tests.
pub fn apply_overrides<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(target) = lookup(ENV_TARGET_ID) {
        config.source.target_id = target;
    }

    if let Some(value) = lookup(ENV_START_PAGE) {
        config.crawler.start_page = parse_page(ENV_START_PAGE, &value)?;
    }

    if let Some(value) = lookup(ENV_END_PAGE) {
        config.crawler.end_page = parse_page(ENV_END_PAGE, &value)?;
    }

    Ok(())
}

fn parse_page(name: &str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse().map_err(|_| {
        ConfigError::Validation(format!("{} must be a page number, got '{}'", name, value))
    })
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so a run can be matched to the settings it used.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and the file hash
///
/// The hash is `None` when running from defaults.
pub fn load_config_with_hash(path: Option<&Path>) -> Result<(Config, Option<String>), ConfigError> {
    let config = load_config(path)?;
    let hash = path.map(compute_config_hash).transpose()?;
    Ok((config, hash))
}
