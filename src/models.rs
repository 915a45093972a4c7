//! Core data models used throughout InstaMon.
//!
//! These types represent the records that flow from a paste through the
//! session queue and out to the spreadsheet.

use serde::Serialize;

/// A single post recap: the unit of data from parse to spreadsheet row.
///
/// `link` is the unique key. Comparison is exact string equality; no URL
/// normalization happens anywhere in the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    pub link: String,
    /// Caption after [`clean_caption`](crate::caption::clean_caption).
    pub caption: String,
    /// Calendar date formatted with [`DATE_FORMAT`](crate::ingest::DATE_FORMAT).
    pub date: String,
}

/// One pasted CSV row with named fields.
///
/// Built through [`RawRow::from_fields`], which rejects rows that carry
/// fewer than three fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub link: String,
    pub caption: String,
    pub timestamp: String,
}

impl RawRow {
    /// Build a row from positional CSV fields.
    ///
    /// Returns `None` for rows with fewer than three fields. Extra fields
    /// are ignored. The link is trimmed; caption and timestamp are kept raw.
    pub fn from_fields<'a, I>(fields: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut it = fields.into_iter();
        let link = it.next()?;
        let caption = it.next()?;
        let timestamp = it.next()?;
        Some(Self {
            link: link.trim().to_string(),
            caption: caption.to_string(),
            timestamp: timestamp.to_string(),
        })
    }
}

/// Result of parsing one paste.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOutcome {
    /// Accepted records, in row order.
    pub accepted: Vec<Record>,
    /// Rows rejected for an empty or already-known link.
    pub skipped: usize,
}

/// Summary of a successful spreadsheet write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WriteReport {
    /// 1-based sheet row where the block starts.
    pub start_row: u32,
    pub rows_written: usize,
    /// Number of header cells that were empty and got filled.
    pub headers_written: usize,
}

/// What [`SubmissionQueue::submit`](crate::queue::SubmissionQueue::submit) did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// `last_batch` was empty; no remote call was made.
    NothingToSend,
    Sent(WriteReport),
}
