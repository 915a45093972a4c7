//! In-memory [`SheetBackend`] for tests and local runs.
//!
//! Stores a row-major grid of strings behind a `RwLock`. Reads mirror the
//! Sheets API: trailing empty cells and trailing empty rows are trimmed.
//! Writes can be made to fail on demand to exercise error paths.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use super::{CellRef, SheetBackend, SheetError};

pub struct InMemorySheet {
    grid: RwLock<Vec<Vec<String>>>,
    fail_writes: AtomicBool,
    calls: AtomicUsize,
}

impl InMemorySheet {
    pub fn new() -> Self {
        Self::with_rows(Vec::new())
    }

    /// Start from existing content; row 0 is sheet row 1, column 0 is A.
    pub fn with_rows(rows: Vec<Vec<String>>) -> Self {
        Self {
            grid: RwLock::new(rows),
            fail_writes: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    /// Make every subsequent write return [`SheetError::Unavailable`].
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of backend calls made so far, reads included.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Trimmed snapshot of the grid.
    pub fn rows(&self) -> Vec<Vec<String>> {
        let grid = self.grid.read().unwrap();
        let mut rows: Vec<Vec<String>> = grid
            .iter()
            .map(|row| {
                let len = row.iter().rposition(|c| !c.is_empty()).map_or(0, |i| i + 1);
                row[..len].to_vec()
            })
            .collect();
        while rows.last().is_some_and(|r| r.is_empty()) {
            rows.pop();
        }
        rows
    }

    /// Value at `cell`; empty for unset cells and for a 0 row or column.
    pub fn cell(&self, cell: CellRef) -> String {
        let Some((r, c)) = cell.index() else {
            return String::new();
        };
        let grid = self.grid.read().unwrap();
        grid.get(r)
            .and_then(|row| row.get(c))
            .cloned()
            .unwrap_or_default()
    }

    fn set(grid: &mut Vec<Vec<String>>, (r, c): (usize, usize), value: String) {
        if grid.len() <= r {
            grid.resize_with(r + 1, Vec::new);
        }
        let cells = &mut grid[r];
        if cells.len() <= c {
            cells.resize_with(c + 1, String::new);
        }
        cells[c] = value;
    }

    fn begin_call(&self, write: bool) -> Result<(), SheetError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if write && self.fail_writes.load(Ordering::SeqCst) {
            return Err(SheetError::Unavailable("injected write failure".to_string()));
        }
        Ok(())
    }
}

impl Default for InMemorySheet {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SheetBackend for InMemorySheet {
    async fn read_all(&self) -> Result<Vec<Vec<String>>, SheetError> {
        self.begin_call(false)?;
        Ok(self.rows())
    }

    async fn read_cell(&self, cell: CellRef) -> Result<String, SheetError> {
        self.begin_call(false)?;
        Ok(self.cell(cell.checked()?))
    }

    async fn write_cell(&self, cell: CellRef, value: &str) -> Result<(), SheetError> {
        self.begin_call(true)?;
        let index = cell.index().ok_or(SheetError::InvalidCell(cell))?;
        let mut grid = self.grid.write().unwrap();
        Self::set(&mut grid, index, value.to_string());
        Ok(())
    }

    async fn write_range(&self, start: CellRef, rows: Vec<Vec<String>>) -> Result<(), SheetError> {
        self.begin_call(true)?;
        let (r0, c0) = start.index().ok_or(SheetError::InvalidCell(start))?;
        let mut grid = self.grid.write().unwrap();
        for (i, row) in rows.into_iter().enumerate() {
            for (j, value) in row.into_iter().enumerate() {
                Self::set(&mut grid, (r0 + i, c0 + j), value);
            }
        }
        Ok(())
    }
}
