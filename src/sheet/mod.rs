//! Spreadsheet writer and backend abstraction.
//!
//! The [`SheetBackend`] trait covers the four calls the writer needs from a
//! remote tabular store, enabling pluggable backends (Google Sheets over
//! REST, in-memory for tests and local runs).
//!
//! # Layout
//!
//! ```text
//!      A     B          C        D        E
//!   1        Caption    Date              Link      ← written once, lazily
//!   2        <caption>  <date>   (blank)  <link>    ← first data row
//!   …
//! ```
//!
//! [`SheetWriter::write`] appends a batch at the next free row with a
//! single range write. There is no locking: two sessions writing at the
//! same moment can compute the same start row and overwrite or interleave
//! each other's rows. That is an accepted limitation for a low-traffic
//! internal tool.

pub mod api;
pub mod memory;

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::config::{HeaderLabels, SheetConfig};
use crate::models::{Record, WriteReport};

pub const CAPTION_COL: u32 = 2;
pub const DATE_COL: u32 = 3;
pub const SPACER_COL: u32 = 4;
pub const LINK_COL: u32 = 5;
pub const HEADER_ROW: u32 = 1;
pub const FIRST_DATA_ROW: u32 = 2;

/// A 1-based (column, row) cell address. Displays in A1 notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRef {
    pub col: u32,
    pub row: u32,
}

impl CellRef {
    pub fn new(col: u32, row: u32) -> Self {
        Self { col, row }
    }

    /// Zero-based `(row, col)` grid indexes, or `None` if either is 0.
    pub fn index(self) -> Option<(usize, usize)> {
        let row = (self.row as usize).checked_sub(1)?;
        let col = (self.col as usize).checked_sub(1)?;
        Some((row, col))
    }

    /// `Ok(self)` for a cell that exists on a sheet.
    pub fn checked(self) -> Result<Self, SheetError> {
        match self.index() {
            Some(_) => Ok(self),
            None => Err(SheetError::InvalidCell(self)),
        }
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_letters(self.col), self.row)
    }
}

/// `1 → A`, `26 → Z`, `27 → AA`.
pub fn column_letters(col: u32) -> String {
    let mut n = col;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = ((n - 1) % 26) as u8;
        letters.push((b'A' + rem) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("spreadsheet token not set: export {0}")]
    MissingToken(String),
    #[error("invalid spreadsheet configuration: {0}")]
    Config(String),
    #[error("spreadsheet API returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("spreadsheet request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected spreadsheet response: {0}")]
    InvalidResponse(String),
    #[error("spreadsheet backend unavailable: {0}")]
    Unavailable(String),
    #[error("invalid cell (column {}, row {}): both start at 1", .0.col, .0.row)]
    InvalidCell(CellRef),
}

/// Remote tabular store addressed by a fixed spreadsheet and tab.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`read_all`](SheetBackend::read_all) | all populated rows, top to bottom |
/// | [`read_cell`](SheetBackend::read_cell) | one cell's value (empty if unset) |
/// | [`write_cell`](SheetBackend::write_cell) | set one cell |
/// | [`write_range`](SheetBackend::write_range) | set a rectangle starting at a cell |
#[async_trait]
pub trait SheetBackend: Send + Sync {
    /// Rows up to and including the last populated one. Trailing empty
    /// rows are not returned, so `len()` is the populated row count.
    async fn read_all(&self) -> Result<Vec<Vec<String>>, SheetError>;

    async fn read_cell(&self, cell: CellRef) -> Result<String, SheetError>;

    async fn write_cell(&self, cell: CellRef, value: &str) -> Result<(), SheetError>;

    /// Write `rows` as one rectangular block whose top-left is `start`.
    async fn write_range(&self, start: CellRef, rows: Vec<Vec<String>>) -> Result<(), SheetError>;
}

/// Maps records onto the fixed column layout and appends them.
#[derive(Clone)]
pub struct SheetWriter {
    backend: Arc<dyn SheetBackend>,
    headers: HeaderLabels,
}

impl SheetWriter {
    pub fn new(backend: Arc<dyn SheetBackend>, headers: HeaderLabels) -> Self {
        Self { backend, headers }
    }

    pub fn from_config(config: &SheetConfig) -> Result<Self> {
        Ok(Self::new(create_backend(config)?, config.headers.clone()))
    }

    /// Append `rows` below the last populated row.
    ///
    /// Empty header cells are filled first; existing header text is left
    /// alone. An empty `rows` slice makes no remote calls and reports
    /// `start_row` 0.
    pub async fn write(&self, rows: &[Record]) -> Result<WriteReport, SheetError> {
        if rows.is_empty() {
            return Ok(WriteReport {
                start_row: 0,
                rows_written: 0,
                headers_written: 0,
            });
        }

        let headers_written = self.ensure_headers().await?;

        let populated = self.backend.read_all().await?.len() as u32;
        let start_row = (populated + 1).max(FIRST_DATA_ROW);

        let block: Vec<Vec<String>> = rows.iter().map(record_to_row).collect();
        self.backend
            .write_range(CellRef::new(CAPTION_COL, start_row), block)
            .await?;

        tracing::info!(
            start_row,
            rows = rows.len(),
            headers_written,
            "appended rows to sheet"
        );

        Ok(WriteReport {
            start_row,
            rows_written: rows.len(),
            headers_written,
        })
    }

    async fn ensure_headers(&self) -> Result<usize, SheetError> {
        let labels = [
            (CAPTION_COL, &self.headers.caption),
            (DATE_COL, &self.headers.date),
            (LINK_COL, &self.headers.link),
        ];

        let mut written = 0;
        for (col, label) in labels {
            let cell = CellRef::new(col, HEADER_ROW);
            if self.backend.read_cell(cell).await?.trim().is_empty() {
                self.backend.write_cell(cell, label).await?;
                written += 1;
            }
        }
        Ok(written)
    }
}

/// One record as a B..E row: caption, date, blank spacer, link.
pub fn record_to_row(record: &Record) -> Vec<String> {
    vec![
        record.caption.clone(),
        record.date.clone(),
        String::new(),
        record.link.clone(),
    ]
}

/// Create the configured [`SheetBackend`].
///
/// | Config Value | Backend |
/// |-------------|---------|
/// | `"sheets"` | [`api::SheetsApiBackend`] |
/// | `"memory"` | [`memory::InMemorySheet`] |
pub fn create_backend(config: &SheetConfig) -> Result<Arc<dyn SheetBackend>> {
    match config.backend.as_str() {
        "sheets" => Ok(Arc::new(api::SheetsApiBackend::new(config)?)),
        "memory" => Ok(Arc::new(memory::InMemorySheet::new())),
        other => bail!("Unknown sheet backend: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memory::InMemorySheet;

    fn record(n: u32) -> Record {
        Record {
            link: format!("https://x/{n}"),
            caption: format!("Caption {n}."),
            date: "01/01/2024".to_string(),
        }
    }

    fn cells(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_column_letters() {
        assert_eq!(column_letters(1), "A");
        assert_eq!(column_letters(5), "E");
        assert_eq!(column_letters(26), "Z");
        assert_eq!(column_letters(27), "AA");
        assert_eq!(column_letters(52), "AZ");
        assert_eq!(column_letters(703), "AAA");
        assert_eq!(CellRef::new(LINK_COL, 12).to_string(), "E12");
    }

    #[test]
    fn test_zero_cell_is_invalid() {
        assert_eq!(CellRef::new(1, 1).index(), Some((0, 0)));
        assert_eq!(CellRef::new(0, 3).index(), None);
        assert!(matches!(
            CellRef::new(2, 0).checked(),
            Err(SheetError::InvalidCell(CellRef { col: 2, row: 0 }))
        ));
    }

    #[tokio::test]
    async fn test_empty_sheet_gets_headers_and_row_two() {
        let sheet = Arc::new(InMemorySheet::new());
        let writer = SheetWriter::new(sheet.clone(), HeaderLabels::default());

        let report = writer.write(&[record(1), record(2)]).await.unwrap();
        assert_eq!(report.start_row, 2);
        assert_eq!(report.rows_written, 2);
        assert_eq!(report.headers_written, 3);

        let rows = sheet.rows();
        assert_eq!(rows[0], cells(&["", "Caption", "Date", "", "Link"]));
        assert_eq!(
            rows[1],
            cells(&["", "Caption 1.", "01/01/2024", "", "https://x/1"])
        );
        assert_eq!(rows[2][4], "https://x/2");
    }

    #[tokio::test]
    async fn test_existing_headers_not_overwritten() {
        let sheet = Arc::new(InMemorySheet::with_rows(vec![cells(&[
            "", "Keterangan", "", "", "Tautan",
        ])]));
        let writer = SheetWriter::new(sheet.clone(), HeaderLabels::default());

        let report = writer.write(&[record(1)]).await.unwrap();
        assert_eq!(report.headers_written, 1);
        let header = &sheet.rows()[0];
        assert_eq!(header[1], "Keterangan");
        assert_eq!(header[2], "Date");
        assert_eq!(header[4], "Tautan");
    }

    #[tokio::test]
    async fn test_appends_after_populated_rows() {
        let sheet = Arc::new(InMemorySheet::with_rows(vec![
            cells(&["", "Caption", "Date", "", "Link"]),
            cells(&["", "a", "b", "", "c"]),
            cells(&["", "d", "e", "", "f"]),
        ]));
        let writer = SheetWriter::new(sheet.clone(), HeaderLabels::default());

        let report = writer.write(&[record(9)]).await.unwrap();
        assert_eq!(report.start_row, 4);
        assert_eq!(report.headers_written, 0);
        assert_eq!(sheet.cell(CellRef::new(LINK_COL, 4)), "https://x/9");
        assert_eq!(sheet.cell(CellRef::new(SPACER_COL, 4)), "");
    }

    #[tokio::test]
    async fn test_empty_batch_makes_no_calls() {
        let sheet = Arc::new(InMemorySheet::new());
        let writer = SheetWriter::new(sheet.clone(), HeaderLabels::default());
        let report = writer.write(&[]).await.unwrap();
        assert_eq!(report.rows_written, 0);
        assert_eq!(sheet.call_count(), 0);
    }

    #[tokio::test]
    async fn test_write_failure_surfaces() {
        let sheet = Arc::new(InMemorySheet::new());
        sheet.set_fail_writes(true);
        let writer = SheetWriter::new(sheet.clone(), HeaderLabels::default());
        let err = writer.write(&[record(1)]).await.unwrap_err();
        assert!(matches!(err, SheetError::Unavailable(_)));
        assert!(sheet.rows().is_empty());
    }

    #[test]
    fn test_create_memory_backend() {
        let config = SheetConfig {
            backend: "memory".to_string(),
            ..SheetConfig::default()
        };
        assert!(create_backend(&config).is_ok());

        let bad = SheetConfig {
            backend: "excel".to_string(),
            ..SheetConfig::default()
        };
        assert!(create_backend(&bad).is_err());
    }
}
