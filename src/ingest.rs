//! Ingestion parser.
//!
//! Turns pasted bookmarklet output into [`Record`]s. Each pasted row is
//! expected to look like:
//!
//! ```text
//! "https://www.instagram.com/p/abc123/","Caption text, maybe long","2024-03-05T10:00:00.000Z"
//! ```
//!
//! Rows are read with standard CSV quoting rules, so quoted captions may
//! carry commas, doubled quotes and line breaks.
//!
//! # Row handling
//!
//! | Row | Effect |
//! |-----|--------|
//! | fewer than 3 fields | dropped, not counted |
//! | empty link | counted as skipped |
//! | link already known | counted as skipped |
//! | bad timestamp | the whole call fails |
//! | otherwise | accepted, link added to the known set |

use anyhow::Context;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

use crate::caption::clean_caption;
use crate::models::{ParseOutcome, RawRow, Record};

/// Output format for [`Record::date`]: day/month/year.
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// Offset-carrying layouts tried after RFC 3339.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M%:z",
];

/// Layouts without an offset.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("line {line}: cannot parse timestamp {value:?} for {link}")]
    InvalidTimestamp {
        line: u64,
        link: String,
        value: String,
    },
    #[error("failed to read pasted CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// Parse pasted text against a set of already-known links.
///
/// `existing_links` is updated in place: every accepted link is inserted
/// as soon as its row is accepted, so a repeat later in the same paste is
/// skipped too. On error the set may already hold links from earlier rows
/// of this paste, so callers that need all-or-nothing semantics should
/// pass a scratch copy.
pub fn parse(
    raw_text: &str,
    existing_links: &mut HashSet<String>,
) -> Result<ParseOutcome, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(raw_text.as_bytes());

    let mut outcome = ParseOutcome::default();

    for (index, result) in reader.records().enumerate() {
        let fields = result?;
        let Some(row) = RawRow::from_fields(fields.iter()) else {
            continue;
        };

        if row.link.is_empty() || existing_links.contains(&row.link) {
            outcome.skipped += 1;
            continue;
        }

        let date = format_date(&row.timestamp).ok_or_else(|| IngestError::InvalidTimestamp {
            line: fields
                .position()
                .map_or(index as u64 + 1, |pos| pos.line()),
            link: row.link.clone(),
            value: row.timestamp.trim().to_string(),
        })?;

        existing_links.insert(row.link.clone());
        outcome.accepted.push(Record {
            caption: clean_caption(&row.caption),
            date,
            link: row.link,
        });
    }

    Ok(outcome)
}

/// Parse an ISO-8601 timestamp into its calendar date.
///
/// A trailing `Z` is read as `+00:00`. The date is taken in the offset
/// the timestamp carries, not converted to local time. Timestamps without
/// an offset and bare `YYYY-MM-DD` dates are accepted as-is.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    let value = match trimmed.strip_suffix('Z') {
        Some(head) => format!("{head}+00:00"),
        None => trimmed.to_string(),
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(&value) {
        return Some(dt.date_naive());
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&value, fmt) {
            return Some(dt.date_naive());
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&value, fmt) {
            return Some(dt.date());
        }
    }
    NaiveDate::parse_from_str(&value, "%Y-%m-%d").ok()
}

/// [`parse_timestamp`] followed by [`DATE_FORMAT`] formatting.
pub fn format_date(raw: &str) -> Option<String> {
    parse_timestamp(raw).map(|date| date.format(DATE_FORMAT).to_string())
}

/// Read paste text from a file, or from stdin when `path` is `-`.
pub fn read_input(path: &Path) -> anyhow::Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file: {}", path.display()))
}

/// `instamon parse`: parse a file with an empty link set and print the
/// result.
pub fn run_parse(path: &Path, json: bool) -> anyhow::Result<()> {
    let text = read_input(path)?;
    let mut links = HashSet::new();
    let outcome = parse(&text, &mut links)?;

    tracing::info!(
        accepted = outcome.accepted.len(),
        skipped = outcome.skipped,
        "parsed input"
    );

    if json {
        let body = serde_json::json!({
            "accepted": outcome.accepted,
            "skipped": outcome.skipped,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    for record in &outcome.accepted {
        println!("{:<12} {}  {}", record.date, record.link, record.caption);
    }
    println!("accepted: {}", outcome.accepted.len());
    println!("skipped: {}", outcome.skipped);
    Ok(())
}
