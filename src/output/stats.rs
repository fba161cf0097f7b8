//! Statistics over the collected dataset
//!
//! This module provides functionality for extracting and displaying
//! dataset statistics from a record sink.

use crate::storage::{Record, RecordSink, StorageResult, NOT_AVAILABLE};
use std::collections::{BTreeMap, BTreeSet};

/// Dataset statistics summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetStatistics {
    /// Total number of persisted records
    pub total_records: u64,

    /// Number of distinct listing pages records came from
    pub distinct_pages: u64,

    pub lowest_page: Option<u32>,
    pub highest_page: Option<u32>,

    /// Record count per category, sorted by category name
    pub records_by_category: BTreeMap<String, u64>,

    /// Records stored without a magnet link
    pub missing_magnet: u64,
}

impl DatasetStatistics {
    /// Computes statistics over a slice of records
    pub fn from_records(records: &[Record]) -> Self {
        let mut pages = BTreeSet::new();
        let mut records_by_category = BTreeMap::new();
        let mut missing_magnet = 0;

        for record in records {
            pages.insert(record.page_number);
            *records_by_category
                .entry(record.category.clone())
                .or_insert(0) += 1;
            if record.magnet_link == NOT_AVAILABLE || record.magnet_link.is_empty() {
                missing_magnet += 1;
            }
        }

        Self {
            total_records: records.len() as u64,
            distinct_pages: pages.len() as u64,
            lowest_page: pages.first().copied(),
            highest_page: pages.last().copied(),
            records_by_category,
            missing_magnet,
        }
    }
}

/// Loads statistics from a record sink
///
/// # Arguments
///
/// * `sink` - The sink to read
///
/// # Returns
///
/// * `Ok(DatasetStatistics)` - Successfully computed statistics
/// * `Err(StorageError)` - Failed to read records
pub fn load_statistics(sink: &dyn RecordSink) -> StorageResult<DatasetStatistics> {
    let records = sink.load_records()?;
    Ok(DatasetStatistics::from_records(&records))
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &DatasetStatistics) {
    println!("=== Dataset Statistics ===\n");

    println!("Overview:");
    println!("  Total records: {}", stats.total_records);
    println!("  Distinct pages: {}", stats.distinct_pages);
    if let (Some(low), Some(high)) = (stats.lowest_page, stats.highest_page) {
        println!("  Page span: {} to {}", low, high);
    }
    println!();

    if !stats.records_by_category.is_empty() {
        println!("Records by Category:");
        let mut counts: Vec<_> = stats.records_by_category.iter().collect();
        counts.sort_by(|a, b| b.1.cmp(a.1));

        for (category, count) in counts {
            let percentage = (*count as f64 / stats.total_records as f64) * 100.0;
            println!("  {}: {} ({:.1}%)", category, count, percentage);
        }
        println!();
    }

    println!(
        "Missing magnet links: {} / {} records",
        stats.missing_magnet, stats.total_records
    );
}
