//! CSV snapshot of a session's cumulative queue.
//!
//! Produces the downloadable file offered next to the results table:
//! one header row, then one row per record in queue order, columns
//! Caption, Date, Link.

use anyhow::Result;

use crate::config::HeaderLabels;
use crate::models::Record;

pub const EXPORT_FILENAME: &str = "instamon_recap.csv";

/// Encode `records` as CSV bytes with a header row taken from `labels`.
pub fn records_to_csv(records: &[Record], labels: &HeaderLabels) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([&labels.caption, &labels.date, &labels.link])?;
    for record in records {
        writer.write_record([&record.caption, &record.date, &record.link])?;
    }
    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV export: {}", e.error()))
}
