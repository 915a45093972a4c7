//! Google Sheets v4 REST backend.
//!
//! Uses the `spreadsheets.values` endpoints:
//!
//! | Operation | Call |
//! |-----------|------|
//! | read all rows | `GET  {base}/spreadsheets/{id}/values/'{sheet}'` |
//! | read a cell | `GET  {base}/spreadsheets/{id}/values/'{sheet}'!B1` |
//! | write a cell or block | `PUT  {base}/spreadsheets/{id}/values/'{sheet}'!B2?valueInputOption=…` |
//!
//! Requests carry an OAuth bearer token read once, at construction, from
//! the environment variable named by `sheet.token_env`. Every request is
//! bounded by `sheet.timeout_secs`.
//!
//! Writes are not retried. Any non-2xx status, transport error or
//! timeout becomes a [`SheetError`] and the caller decides what to do.

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;

use super::{CellRef, SheetBackend, SheetError};
use crate::config::SheetConfig;

/// Body of a `values.get` response. `values` is absent for an empty range.
#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

pub struct SheetsApiBackend {
    client: reqwest::Client,
    base: Url,
    spreadsheet_id: String,
    sheet_name: String,
    value_input: String,
    token: String,
}

impl SheetsApiBackend {
    /// Build a backend, reading the bearer token from `config.token_env`.
    ///
    /// # Errors
    ///
    /// [`SheetError::MissingToken`] if the variable is unset or empty, and
    /// [`SheetError::Config`] if `api_base` is not an absolute URL.
    pub fn new(config: &SheetConfig) -> Result<Self, SheetError> {
        let token = std::env::var(&config.token_env)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| SheetError::MissingToken(config.token_env.clone()))?;
        Self::with_token(config, token)
    }

    /// Build a backend with an explicit token.
    pub fn with_token(config: &SheetConfig, token: String) -> Result<Self, SheetError> {
        let base = Url::parse(&config.api_base)
            .map_err(|e| SheetError::Config(format!("api_base '{}': {}", config.api_base, e)))?;
        if base.cannot_be_a_base() {
            return Err(SheetError::Config(format!(
                "api_base '{}' cannot carry a path",
                config.api_base
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base,
            spreadsheet_id: config.spreadsheet_id.clone(),
            sheet_name: config.sheet_name.clone(),
            value_input: config.value_input.clone(),
            token,
        })
    }

    /// A1 range on this tab; `None` means the whole tab.
    fn range(&self, cell: Option<CellRef>) -> String {
        let sheet = quote_sheet_name(&self.sheet_name);
        match cell {
            Some(cell) => format!("{}!{}", sheet, cell),
            None => sheet,
        }
    }

    fn values_url(&self, range: &str) -> Result<Url, SheetError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| SheetError::Config("api_base cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(["spreadsheets", self.spreadsheet_id.as_str(), "values", range]);
        Ok(url)
    }

    async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>, SheetError> {
        let url = self.values_url(range)?;
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await?;
        let response = check_status(response).await?;

        let body: ValueRange = response
            .json()
            .await
            .map_err(|e| SheetError::InvalidResponse(e.to_string()))?;

        Ok(body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }

    async fn put_values(&self, range: &str, values: Vec<Vec<String>>) -> Result<(), SheetError> {
        let mut url = self.values_url(range)?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", &self.value_input);

        let body = serde_json::json!({
            "range": range,
            "majorDimension": "ROWS",
            "values": values,
        });

        let response = self
            .client
            .put(url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

#[async_trait]
impl SheetBackend for SheetsApiBackend {
    async fn read_all(&self) -> Result<Vec<Vec<String>>, SheetError> {
        self.get_values(&self.range(None)).await
    }

    async fn read_cell(&self, cell: CellRef) -> Result<String, SheetError> {
        let rows = self.get_values(&self.range(Some(cell.checked()?))).await?;
        Ok(rows
            .into_iter()
            .next()
            .and_then(|row| row.into_iter().next())
            .unwrap_or_default())
    }

    async fn write_cell(&self, cell: CellRef, value: &str) -> Result<(), SheetError> {
        self.put_values(&self.range(Some(cell.checked()?)), vec![vec![value.to_string()]])
            .await
    }

    async fn write_range(&self, start: CellRef, rows: Vec<Vec<String>>) -> Result<(), SheetError> {
        self.put_values(&self.range(Some(start.checked()?)), rows).await
    }
}

/// `'My Tab'` with embedded quotes doubled, as A1 notation requires.
fn quote_sheet_name(name: &str) -> String {
    format!("'{}'", name.replace('\'', "''"))
}

fn cell_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Pass 2xx responses through; turn anything else into
/// [`SheetError::Status`], preferring the API's own error message.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, SheetError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body_text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body_text)
        .ok()
        .and_then(|json| {
            json.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or(body_text);

    Err(SheetError::Status {
        status: status.as_u16(),
        message,
    })
}
