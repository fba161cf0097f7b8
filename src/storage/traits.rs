//! Storage traits and error types
//!
//! This module defines the trait interface for record sinks and
//! associated error types.

use crate::storage::Record;
use std::collections::HashSet;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Malformed record file {path}: {message}")]
    Malformed { path: String, message: String },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Append-only destination for collected records
///
/// The coordinator is the only writer. Implementations never rewrite or
/// delete a record once it has been appended.
pub trait RecordSink: Send {
    /// Loads the item keys of every persisted record
    ///
    /// Called once at startup to seed deduplication.
    fn load_keys(&self) -> StorageResult<HashSet<String>>;

    /// Appends records in the given order
    ///
    /// # Returns
    ///
    /// The number of records written
    fn append(&mut self, records: &[Record]) -> StorageResult<usize>;

    /// Loads every persisted record in insertion order
    fn load_records(&self) -> StorageResult<Vec<Record>>;

    /// Files a checkpoint must publish for the output to be complete
    fn artifacts(&self) -> Vec<PathBuf>;
}
