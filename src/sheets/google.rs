use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{Row, SheetStore};
use crate::config::GoogleSheetsConfig;

/// RAW keeps codes and dates as typed instead of letting Sheets coerce them.
const APPEND_QUERY: [(&str, &str); 2] = [("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")];

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Serialize)]
struct AppendRequest<'a> {
    values: [&'a [String]; 1],
}

/// Google Sheets v4 values API, authenticated with a bearer access token.
pub struct GoogleSheetsStore {
    client: reqwest::Client,
    config: GoogleSheetsConfig,
}

impl GoogleSheetsStore {
    pub fn new(config: GoogleSheetsConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build Google Sheets HTTP client")?;
        Ok(Self { client, config })
    }

    /// `{base}/v4/spreadsheets/{id}/values/{range}{suffix}` with every segment escaped.
    fn values_url(&self, sheet: &str, suffix: &str) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.config.base_url)
            .with_context(|| format!("Invalid Google Sheets base URL: {}", self.config.base_url))?;
        let range = format!("{}{}", a1_sheet_range(sheet), suffix);
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("Google Sheets base URL cannot be a base: {}", self.config.base_url))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", self.config.spreadsheet_id.as_str(), "values", range.as_str()]);
        Ok(url)
    }
}

/// Quote a worksheet name so it is read as a whole-sheet A1 range.
fn a1_sheet_range(sheet: &str) -> String {
    format!("'{}'", sheet.replace('\'', "''"))
}

fn cell_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[async_trait]
impl SheetStore for GoogleSheetsStore {
    async fn get_all_rows(&self, sheet: &str) -> Result<Vec<Row>> {
        let url = self.values_url(sheet, "")?;
        debug!("Reading worksheet {} from {}", sheet, url);

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.config.access_token)
            .send()
            .await
            .with_context(|| format!("Failed to read worksheet {}", sheet))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("Google Sheets API error ({}): {}", status, error_body);
        }

        let range: ValueRange = response
            .json()
            .await
            .context("Failed to parse Google Sheets values response")?;

        Ok(range
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }

    async fn append_row(&self, sheet: &str, row: &[String]) -> Result<()> {
        let url = self.values_url(sheet, ":append")?;
        debug!("Appending {} cells to worksheet {}", row.len(), sheet);

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.config.access_token)
            .query(&APPEND_QUERY)
            .json(&AppendRequest { values: [row] })
            .send()
            .await
            .with_context(|| format!("Failed to append to worksheet {}", sheet))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("Google Sheets API error ({}): {}", status, error_body);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(base_url: &str) -> GoogleSheetsStore {
        GoogleSheetsStore::new(GoogleSheetsConfig {
            spreadsheet_id: "sheet-123".to_string(),
            access_token: "token".to_string(),
            base_url: base_url.to_string(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[test]
    fn test_values_url_layout() {
        let url = store("https://sheets.googleapis.com")
            .values_url("DailyEmployee", "")
            .unwrap();
        let text = url.as_str();
        assert!(text.starts_with("https://sheets.googleapis.com/v4/spreadsheets/sheet-123/values/"));
        assert!(text.contains("DailyEmployee"));
    }

    #[test]
    fn test_values_url_escapes_sheet_name() {
        let url = store("https://sheets.googleapis.com/")
            .values_url("Daily Employee", ":append")
            .unwrap();
        let text = url.as_str();
        assert!(text.contains("/v4/spreadsheets/sheet-123/values/"));
        assert!(text.contains("Daily%20Employee"));
        assert!(text.ends_with(":append"));
        assert!(!text.contains("//v4"));
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(store("not a url").values_url("Daily", "").is_err());
    }

    #[test]
    fn test_a1_range_quotes_apostrophes() {
        assert_eq!(a1_sheet_range("Daily"), "'Daily'");
        assert_eq!(a1_sheet_range("Bob's"), "'Bob''s'");
    }

    #[test]
    fn test_value_range_cells_become_text() {
        let range: ValueRange = serde_json::from_str(
            r#"{"range":"Daily!A1:C2","majorDimension":"ROWS","values":[["a","b"],["",20001,null]]}"#,
        )
        .unwrap();
        let rows: Vec<Row> = range
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect();
        assert_eq!(rows[0], vec!["a", "b"]);
        assert_eq!(rows[1], vec!["", "20001", ""]);
    }

    #[test]
    fn test_append_keeps_cells_as_text() {
        assert!(APPEND_QUERY.contains(&("valueInputOption", "RAW")));
        assert!(APPEND_QUERY.contains(&("insertDataOption", "INSERT_ROWS")));
    }

    #[test]
    fn test_empty_value_range() {
        let range: ValueRange = serde_json::from_str(r#"{"range":"Daily!A1:Z1000"}"#).unwrap();
        assert!(range.values.is_empty());
    }
}
