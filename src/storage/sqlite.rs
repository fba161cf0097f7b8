//! SQLite record sink
//!
//! This module provides a SQLite-based implementation of the RecordSink trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{RecordSink, StorageResult};
use crate::storage::Record;
use chrono::Utc;
use rusqlite::{params, Connection};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// SQLite record sink
pub struct SqliteSink {
    conn: Connection,
    path: PathBuf,
}

impl SqliteSink {
    /// Opens or creates a record database
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteSink)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        // Checkpoints commit the database file itself, so stay out of WAL mode
        conn.execute_batch(
            "
            PRAGMA journal_mode = DELETE;
            PRAGMA synchronous = FULL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn,
            path: PathBuf::from(":memory:"),
        })
    }

    /// Counts persisted records
    pub fn count_records(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

impl RecordSink for SqliteSink {
    fn load_keys(&self) -> StorageResult<HashSet<String>> {
        let mut stmt = self.conn.prepare("SELECT sub_page_id FROM records")?;
        let keys = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(keys)
    }

    fn append(&mut self, records: &[Record]) -> StorageResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO records (page_number, sub_page_id, title, file_size, category, magnet_link, collected_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for record in records {
                stmt.execute(params![
                    record.page_number,
                    record.item_key,
                    record.title,
                    record.size_label,
                    record.category,
                    record.magnet_link,
                    now,
                ])?;
            }
        }
        tx.commit()?;

        Ok(records.len())
    }

    fn load_records(&self) -> StorageResult<Vec<Record>> {
        let mut stmt = self.conn.prepare(
            "SELECT page_number, sub_page_id, title, file_size, category, magnet_link
             FROM records ORDER BY id",
        )?;

        let records = stmt
            .query_map([], |row| {
                Ok(Record {
                    page_number: row.get(0)?,
                    item_key: row.get(1)?,
                    title: row.get(2)?,
                    size_label: row.get(3)?,
                    category: row.get(4)?,
                    magnet_link: row.get(5)?,
                    original_index: 0,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records
            .into_iter()
            .enumerate()
            .map(|(index, record)| Record {
                original_index: index,
                ..record
            })
            .collect())
    }

    fn artifacts(&self) -> Vec<PathBuf> {
        vec![self.path.clone()]
    }
}
