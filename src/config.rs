use anyhow::{Context, Result};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SheetBackend {
    #[default]
    Google,
    Sqlite,
}

impl std::fmt::Display for SheetBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SheetBackend::Google => write!(f, "google"),
            SheetBackend::Sqlite => write!(f, "sqlite"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub registration: RegistrationConfig,
    pub sheets: SheetsConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub line: Option<LineConfig>,
    #[serde(default)]
    pub telegram: Option<TelegramConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RegistrationConfig {
    /// When false every message gets the "temporarily closed" reply.
    #[serde(default = "default_active")]
    pub active: bool,
    /// Offset used for the registration timestamp column (Asia/Bangkok is +7).
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
    /// Hold a per-type lock from reading the last code until the row is appended.
    #[serde(default)]
    pub serialize_code_allocation: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SheetsConfig {
    #[serde(default)]
    pub backend: SheetBackend,
    #[serde(default = "default_daily_worksheet")]
    pub daily_worksheet: String,
    #[serde(default = "default_monthly_worksheet")]
    pub monthly_worksheet: String,
    pub google: Option<GoogleSheetsConfig>,
    pub sqlite: Option<SqliteSheetsConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GoogleSheetsConfig {
    pub spreadsheet_id: String,
    #[serde(default)]
    pub access_token: String,
    #[serde(default = "default_sheets_base_url")]
    pub base_url: String,
    #[serde(default = "default_sheets_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SqliteSheetsConfig {
    #[serde(default = "default_db_path")]
    pub database_path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotifyConfig {
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default = "default_notify_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LineConfig {
    #[serde(default)]
    pub channel_access_token: String,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_line_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_line_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    /// Empty means anyone may register.
    #[serde(default)]
    pub allowed_user_ids: Vec<u64>,
}

fn default_active() -> bool {
    true
}

fn default_utc_offset_hours() -> i32 {
    7
}

fn default_daily_worksheet() -> String {
    "DailyEmployee".to_string()
}

fn default_monthly_worksheet() -> String {
    "MonthlyEmployee".to_string()
}

fn default_sheets_base_url() -> String {
    "https://sheets.googleapis.com".to_string()
}

fn default_sheets_timeout_secs() -> u64 {
    15
}

fn default_db_path() -> PathBuf {
    PathBuf::from("registrations.db")
}

fn default_notify_timeout_secs() -> u64 {
    10
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_line_api_base_url() -> String {
    "https://api.line.me".to_string()
}

fn default_line_timeout_secs() -> u64 {
    10
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            active: default_active(),
            utc_offset_hours: default_utc_offset_hours(),
            serialize_code_allocation: false,
        }
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_secs: default_notify_timeout_secs(),
        }
    }
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            channel_access_token: String::new(),
            bind_address: default_bind_address(),
            port: default_port(),
            api_base_url: default_line_api_base_url(),
            timeout_secs: default_line_timeout_secs(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        Self::load_with_env(path, |key| std::env::var(key).ok())
    }

    /// Read the file, apply overrides from `lookup`, then validate.
    pub fn load_with_env<F>(path: &Path, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config = Self::from_toml_str(&content)?;
        config.apply_env_overrides(lookup)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    /// Apply the deployment environment variables on top of the file.
    ///
    /// `SYSTEM_ACTIVE` is active only when it reads "true" (any case).
    /// An empty `APPS_SCRIPT_WEBHOOK` disables notification.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(active) = lookup("SYSTEM_ACTIVE") {
            self.registration.active = active.trim().eq_ignore_ascii_case("true");
        }

        if let Some(url) = lookup("APPS_SCRIPT_WEBHOOK") {
            let url = url.trim();
            self.notify.webhook_url = if url.is_empty() {
                None
            } else {
                Some(url.to_string())
            };
        }

        if let Some(token) = lookup("LINE_CHANNEL_ACCESS_TOKEN") {
            self.line.get_or_insert_with(LineConfig::default).channel_access_token = token;
        }

        if let Some(port) = lookup("PORT") {
            if let Some(line) = self.line.as_mut() {
                line.port = port
                    .trim()
                    .parse()
                    .with_context(|| format!("PORT is not a valid port number: {}", port))?;
            }
        }

        if let Some(token) = lookup("GOOGLE_SHEETS_ACCESS_TOKEN") {
            if let Some(google) = self.sheets.google.as_mut() {
                google.access_token = token;
            }
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        match self.sheets.backend {
            SheetBackend::Google => {
                let google = self
                    .sheets
                    .google
                    .as_ref()
                    .context("sheets.backend is \"google\" but [sheets.google] is missing")?;
                if google.access_token.trim().is_empty() {
                    anyhow::bail!("[sheets.google] access_token is empty");
                }
            }
            SheetBackend::Sqlite => {
                if self.sheets.sqlite.is_none() {
                    anyhow::bail!("sheets.backend is \"sqlite\" but [sheets.sqlite] is missing");
                }
            }
        }

        if self.sheets.daily_worksheet.trim().is_empty()
            || self.sheets.monthly_worksheet.trim().is_empty()
        {
            anyhow::bail!("worksheet names must not be empty");
        }

        if self.line.is_none() && self.telegram.is_none() {
            anyhow::bail!("no messaging platform configured: add [line] and/or [telegram]");
        }

        if let Some(line) = &self.line {
            if line.channel_access_token.trim().is_empty() {
                anyhow::bail!("[line] channel_access_token is empty");
            }
        }

        self.utc_offset()?;
        Ok(())
    }

    pub fn utc_offset(&self) -> Result<FixedOffset> {
        let hours = self.registration.utc_offset_hours;
        hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .with_context(|| format!("utc_offset_hours out of range: {}", hours))
    }
}
