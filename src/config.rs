use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub sheet: SheetConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
    #[serde(default = "default_session_idle_mins")]
    pub session_idle_mins: u64,
}

fn default_session_idle_mins() -> u64 {
    720
}

/// The single shared login.
#[derive(Deserialize, Clone)]
pub struct AuthConfig {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SheetConfig {
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default)]
    pub spreadsheet_id: String,
    #[serde(default = "default_sheet_name")]
    pub sheet_name: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Environment variable holding the OAuth bearer token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// `valueInputOption` sent with every write.
    ///
    /// `RAW` (default) stores cells exactly as sent. `USER_ENTERED` lets
    /// the sheet reinterpret them in its own locale: `05/03/2024` may be
    /// read as May 3, numeric-looking captions become numbers, and text
    /// starting with `=` runs as a formula.
    #[serde(default = "default_value_input")]
    pub value_input: String,
    #[serde(default)]
    pub headers: HeaderLabels,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            spreadsheet_id: String::new(),
            sheet_name: default_sheet_name(),
            api_base: default_api_base(),
            token_env: default_token_env(),
            timeout_secs: default_timeout_secs(),
            value_input: default_value_input(),
            headers: HeaderLabels::default(),
        }
    }
}

fn default_backend() -> String {
    "sheets".to_string()
}
fn default_sheet_name() -> String {
    "Sheet1".to_string()
}
fn default_api_base() -> String {
    "https://sheets.googleapis.com/v4".to_string()
}
fn default_token_env() -> String {
    "INSTAMON_SHEETS_TOKEN".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_value_input() -> String {
    "RAW".to_string()
}

/// Labels written to the header row (B1, C1, E1) and used as CSV export
/// column names.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct HeaderLabels {
    #[serde(default = "default_caption_label")]
    pub caption: String,
    #[serde(default = "default_date_label")]
    pub date: String,
    #[serde(default = "default_link_label")]
    pub link: String,
}

impl Default for HeaderLabels {
    fn default() -> Self {
        Self {
            caption: default_caption_label(),
            date: default_date_label(),
            link: default_link_label(),
        }
    }
}

fn default_caption_label() -> String {
    "Caption".to_string()
}
fn default_date_label() -> String {
    "Date".to_string()
}
fn default_link_label() -> String {
    "Link".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    /// Empty means "not linked yet".
    #[serde(default)]
    pub embed_url: String,
    #[serde(default = "default_dashboard_width")]
    pub width: u32,
    #[serde(default = "default_dashboard_height")]
    pub height: u32,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            embed_url: String::new(),
            width: default_dashboard_width(),
            height: default_dashboard_height(),
        }
    }
}

fn default_dashboard_width() -> u32 {
    1200
}
fn default_dashboard_height() -> u32 {
    650
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    if config.auth.username.trim().is_empty() {
        anyhow::bail!("auth.username must not be empty");
    }

    if config.server.session_idle_mins == 0 {
        anyhow::bail!("server.session_idle_mins must be > 0");
    }

    if config.sheet.timeout_secs == 0 {
        anyhow::bail!("sheet.timeout_secs must be > 0");
    }

    match config.sheet.value_input.as_str() {
        "RAW" | "USER_ENTERED" => {}
        other => anyhow::bail!(
            "Unknown sheet.value_input: '{}'. Must be RAW or USER_ENTERED.",
            other
        ),
    }

    match config.sheet.backend.as_str() {
        "sheets" => {
            if config.sheet.spreadsheet_id.trim().is_empty() {
                anyhow::bail!("sheet.spreadsheet_id must be set when backend is 'sheets'");
            }
            if config.sheet.sheet_name.trim().is_empty() {
                anyhow::bail!("sheet.sheet_name must not be empty");
            }
        }
        "memory" => {}
        other => anyhow::bail!(
            "Unknown sheet backend: '{}'. Must be sheets or memory.",
            other
        ),
    }

    Ok(())
}
