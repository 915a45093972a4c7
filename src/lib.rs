//! # InstaMon
//!
//! A paste-and-push recap tool. A browser bookmarklet copies one CSV line
//! per post (`link,caption,timestamp`); a person pastes a batch of those
//! lines into a web form, and InstaMon parses, cleans and deduplicates
//! them, then appends the new rows to a Google Sheet that feeds a BI
//! dashboard.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌──────────────┐   ┌─────────────┐
//! │  Paste   │──▶│ Ingest +     │──▶│ Session      │──▶│ Sheet       │
//! │  (form)  │   │ Caption      │   │ Queue        │   │ Writer      │
//! └──────────┘   └──────────────┘   └──────┬───────┘   └──────┬──────┘
//!                                          │                  │
//!                                          ▼                  ▼
//!                                     CSV export        Google Sheets
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! export INSTAMON_SHEETS_TOKEN=...           # OAuth access token
//! instamon serve                             # start the web form
//! instamon parse pasted.csv                  # dry-run a paste file
//! instamon push pasted.csv                   # parse and append headless
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`caption`] | Caption normalizer |
//! | [`ingest`] | Pasted-CSV parser |
//! | [`queue`] | Session submission queue |
//! | [`sheet`] | Spreadsheet writer and backends |
//! | [`session`] | Per-browser session context |
//! | [`auth`] | Shared-credential login |
//! | [`export`] | CSV download |
//! | [`pages`] | HTML templates |
//! | [`server`] | HTTP server |
//! | [`push`] | Headless submit |
//! | [`logging`] | Tracing setup |

pub mod auth;
pub mod caption;
pub mod config;
pub mod export;
pub mod ingest;
pub mod logging;
pub mod models;
pub mod pages;
pub mod push;
pub mod queue;
pub mod server;
pub mod session;
pub mod sheet;
