//! Storage module for persisting collected records
//!
//! This module handles:
//! - The record model shared by the crawler and every sink
//! - Delimited-file output (the canonical format)
//! - SQLite output as an alternative backend
//! - Loading the key set that seeds deduplication on resume

mod csv_sink;
mod schema;
mod sqlite;
mod traits;

pub use csv_sink::CsvSink;
pub use sqlite::SqliteSink;
pub use traits::{RecordSink, StorageError, StorageResult};

use crate::config::{Config, OutputFormat};
use crate::HarvestError;

/// Placeholder for descriptive fields the source did not provide
pub const NOT_AVAILABLE: &str = "N/A";

/// Persisted column order
pub const RECORD_COLUMNS: [&str; 6] = [
    "page_number",
    "sub_page_id",
    "title",
    "file_size",
    "category",
    "magnet_link",
];

/// One collected item
///
/// `item_key` is unique across the whole dataset. `original_index` is the
/// item's position on its listing page and is only used to restore page
/// order after concurrent detail fetches; it is not persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub page_number: u32,
    pub item_key: String,
    pub title: String,
    pub size_label: String,
    pub category: String,
    pub magnet_link: String,
    pub original_index: usize,
}

/// Opens the sink selected by the output configuration
///
/// # Arguments
///
/// * `config` - The full configuration; the path falls back to the target name
///
/// # Returns
///
/// * `Ok(Box<dyn RecordSink>)` - Sink ready for appends
/// * `Err(HarvestError)` - Failed to create or open the output
pub fn open_sink(config: &Config) -> Result<Box<dyn RecordSink>, HarvestError> {
    let path = config.output_path();
    let sink: Box<dyn RecordSink> = match config.output.format {
        OutputFormat::Csv => Box::new(CsvSink::open(&path)?),
        OutputFormat::Sqlite => Box::new(SqliteSink::open(&path)?),
    };
    Ok(sink)
}
