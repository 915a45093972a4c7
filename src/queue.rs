//! Session-scoped submission queue.
//!
//! Holds two ordered lists of [`Record`]s:
//!
//! - `all`: every record accepted in this session, append-only until
//!   [`reset`](SubmissionQueue::reset)
//! - `last_batch`: only the records accepted by the most recent paste;
//!   this is what [`submit`](SubmissionQueue::submit) sends
//!
//! Every mutation is all-or-nothing. A paste that fails to parse leaves
//! both lists untouched, and a failed submit keeps `last_batch` so the
//! user can retry without pasting again.

use std::collections::HashSet;

use crate::ingest::{self, IngestError};
use crate::models::{Record, SubmitOutcome};
use crate::sheet::{SheetError, SheetWriter};

/// Counts reported back after a successful paste.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasteSummary {
    pub accepted: usize,
    pub skipped: usize,
}

#[derive(Debug, Default)]
pub struct SubmissionQueue {
    all: Vec<Record>,
    last_batch: Vec<Record>,
}

impl SubmissionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> &[Record] {
        &self.all
    }

    pub fn last_batch(&self) -> &[Record] {
        &self.last_batch
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    /// Links already queued, used to deduplicate the next paste.
    pub fn existing_links(&self) -> HashSet<String> {
        self.all.iter().map(|r| r.link.clone()).collect()
    }

    /// Parse `text`, append accepted records to `all` and make them the
    /// new `last_batch`.
    ///
    /// A successful paste that accepts nothing still replaces `last_batch`
    /// with an empty list.
    pub fn process_paste(&mut self, text: &str) -> Result<PasteSummary, IngestError> {
        let mut links = self.existing_links();
        let outcome = ingest::parse(text, &mut links)?;

        let summary = PasteSummary {
            accepted: outcome.accepted.len(),
            skipped: outcome.skipped,
        };

        self.all.extend(outcome.accepted.iter().cloned());
        self.last_batch = outcome.accepted;

        Ok(summary)
    }

    pub fn reset(&mut self) {
        self.all.clear();
        self.last_batch.clear();
    }

    /// Send `last_batch` through `writer`.
    ///
    /// The batch is not consumed: submitting twice without a new paste
    /// sends the same rows twice.
    pub async fn submit(&self, writer: &SheetWriter) -> Result<SubmitOutcome, SheetError> {
        if self.last_batch.is_empty() {
            return Ok(SubmitOutcome::NothingToSend);
        }
        let report = writer.write(&self.last_batch).await?;
        Ok(SubmitOutcome::Sent(report))
    }
}
