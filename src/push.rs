//! Headless paste-and-submit (`instamon push`).
//!
//! Runs a file through the same queue a browser session uses, then sends
//! the accepted rows to the configured spreadsheet in one batch.

use anyhow::Result;
use std::path::Path;

use crate::config::Config;
use crate::ingest;
use crate::models::SubmitOutcome;
use crate::queue::SubmissionQueue;
use crate::sheet::SheetWriter;

pub async fn run_push(config: &Config, path: &Path) -> Result<()> {
    let text = ingest::read_input(path)?;

    let mut queue = SubmissionQueue::new();
    let summary = queue.process_paste(&text)?;
    println!("push {}", path.display());
    println!("  accepted: {}", summary.accepted);
    println!("  skipped: {}", summary.skipped);

    let writer = SheetWriter::from_config(&config.sheet)?;
    match queue.submit(&writer).await? {
        SubmitOutcome::NothingToSend => {
            println!("  nothing to send");
        }
        SubmitOutcome::Sent(report) => {
            println!("  rows written: {}", report.rows_written);
            println!("  start row: {}", report.start_row);
            println!("  headers written: {}", report.headers_written);
        }
    }
    println!("ok");

    Ok(())
}
