//! Delimited-file record sink
//!
//! Records are appended to a CSV file with a fixed header. The file is
//! created with its header on first open and only ever appended to.

use crate::storage::traits::{RecordSink, StorageError, StorageResult};
use crate::storage::{Record, RECORD_COLUMNS};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

/// On-disk row layout, in persisted column order
#[derive(Debug, Serialize, Deserialize)]
struct RecordRow {
    page_number: u32,
    sub_page_id: String,
    title: String,
    file_size: String,
    category: String,
    magnet_link: String,
}

impl From<&Record> for RecordRow {
    fn from(record: &Record) -> Self {
        Self {
            page_number: record.page_number,
            sub_page_id: record.item_key.clone(),
            title: record.title.clone(),
            file_size: record.size_label.clone(),
            category: record.category.clone(),
            magnet_link: record.magnet_link.clone(),
        }
    }
}

impl RecordRow {
    fn into_record(self, original_index: usize) -> Record {
        Record {
            page_number: self.page_number,
            item_key: self.sub_page_id,
            title: self.title,
            size_label: self.file_size,
            category: self.category,
            magnet_link: self.magnet_link,
            original_index,
        }
    }
}

/// CSV-backed record sink
#[derive(Debug)]
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    /// Opens a CSV sink, writing the header if the file is missing or empty
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the CSV file
    ///
    /// # Returns
    ///
    /// * `Ok(CsvSink)` - File exists with a header
    /// * `Err(StorageError)` - Failed to create the file
    pub fn open(path: &Path) -> StorageResult<Self> {
        let has_content = match std::fs::metadata(path) {
            Ok(metadata) => metadata.len() > 0,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => return Err(e.into()),
        };

        if has_content {
            tracing::info!("CSV file {} already exists, appending", path.display());
        } else {
            let mut writer = csv::Writer::from_path(path)?;
            writer.write_record(RECORD_COLUMNS)?;
            writer.flush()?;
            tracing::info!("Initialized new CSV file: {}", path.display());
        }

        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn reader(&self) -> StorageResult<csv::Reader<std::fs::File>> {
        let mut reader = csv::Reader::from_path(&self.path)?;
        let headers = reader.headers()?;
        if !headers.iter().any(|h| h == "sub_page_id") {
            return Err(StorageError::Malformed {
                path: self.path.display().to_string(),
                message: "missing sub_page_id column".to_string(),
            });
        }
        Ok(reader)
    }
}

impl RecordSink for CsvSink {
    fn load_keys(&self) -> StorageResult<HashSet<String>> {
        let mut reader = self.reader()?;
        let key_column = reader
            .headers()?
            .iter()
            .position(|h| h == "sub_page_id")
            .unwrap_or(1);

        let mut keys = HashSet::new();
        for row in reader.records() {
            let row = row?;
            if let Some(key) = row.get(key_column) {
                keys.insert(key.to_string());
            }
        }

        tracing::debug!("Loaded {} existing keys from {}", keys.len(), self.path.display());
        Ok(keys)
    }

    fn append(&mut self, records: &[Record]) -> StorageResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let file = OpenOptions::new().append(true).open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        for record in records {
            writer.serialize(RecordRow::from(record))?;
        }
        writer.flush()?;

        Ok(records.len())
    }

    fn load_records(&self) -> StorageResult<Vec<Record>> {
        let mut reader = self.reader()?;
        let mut records = Vec::new();
        for (index, row) in reader.deserialize::<RecordRow>().enumerate() {
            records.push(row?.into_record(index));
        }
        Ok(records)
    }

    fn artifacts(&self) -> Vec<PathBuf> {
        vec![self.path.clone()]
    }
}
