//! Interactive setup for the HR intake bot.
//!
//! Prompts for the spreadsheet, notification and platform settings and writes
//! a `config.toml` into the project root (`HR_INTAKE_ROOT`, or the current
//! directory).

use anyhow::{Context, Result};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

// ── Config formatting ──────────────────────────────────────────────────────────

struct ConfigParams<'a> {
    backend: &'a str,
    spreadsheet_id: &'a str,
    access_token: &'a str,
    db_path: &'a str,
    webhook_url: &'a str,
    line_token: &'a str,
    port: u16,
    tg_token: &'a str,
    user_ids: &'a str,
}

/// Produces a valid config.toml string. Extracted so it can be unit-tested.
fn format_config(p: &ConfigParams<'_>) -> String {
    let mut out = String::from(
        "[registration]\nactive = true\nutc_offset_hours = 7\nserialize_code_allocation = false\n\n",
    );

    out.push_str(&format!(
        "[sheets]\nbackend = \"{}\"\ndaily_worksheet = \"DailyEmployee\"\nmonthly_worksheet = \"MonthlyEmployee\"\n\n",
        p.backend
    ));

    if p.backend == "google" {
        out.push_str(&format!(
            "[sheets.google]\nspreadsheet_id = \"{}\"\naccess_token = \"{}\"\n\n",
            p.spreadsheet_id, p.access_token
        ));
    } else {
        out.push_str(&format!("[sheets.sqlite]\ndatabase_path = \"{}\"\n\n", p.db_path));
    }

    if p.webhook_url.is_empty() {
        out.push_str("[notify]\n# webhook_url = \"https://script.google.com/macros/s/.../exec\"\n\n");
    } else {
        out.push_str(&format!("[notify]\nwebhook_url = \"{}\"\n\n", p.webhook_url));
    }

    if !p.line_token.is_empty() {
        out.push_str(&format!(
            "[line]\nchannel_access_token = \"{}\"\nport = {}\n\n",
            p.line_token, p.port
        ));
    }

    if !p.tg_token.is_empty() {
        let ids: Vec<&str> = p
            .user_ids
            .split([',', ' '])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        out.push_str(&format!(
            "[telegram]\nbot_token = \"{}\"\nallowed_user_ids = [{}]\n",
            p.tg_token,
            ids.join(", ")
        ));
    }

    out
}

// ── CLI prompts ────────────────────────────────────────────────────────────────

fn run_cli(project_root: &Path) -> Result<()> {
    println!("=== HR Intake Bot Setup ===\n");

    let read_line = |prompt: &str| -> Result<String> {
        print!("{prompt}");
        io::stdout().flush()?;
        let mut buf = String::new();
        io::stdin().read_line(&mut buf)?;
        Ok(buf.trim().to_owned())
    };

    let or_default = |s: String, default: &str| {
        if s.is_empty() {
            default.to_owned()
        } else {
            s
        }
    };

    let backend = or_default(read_line("Sheet backend (google/sqlite) [google]: ")?, "google");
    let (spreadsheet_id, access_token, db_path) = if backend == "google" {
        (
            read_line("Google spreadsheet ID: ")?,
            read_line("Google Sheets access token: ")?,
            String::new(),
        )
    } else if backend == "sqlite" {
        (
            String::new(),
            String::new(),
            or_default(read_line("Database path [registrations.db]: ")?, "registrations.db"),
        )
    } else {
        anyhow::bail!("Unknown sheet backend: {}", backend);
    };

    let webhook_url = read_line("Notification webhook URL (optional): ")?;
    let line_token = read_line("LINE channel access token (blank to skip LINE): ")?;
    let port: u16 = if line_token.is_empty() {
        5000
    } else {
        or_default(read_line("Webhook port [5000]: ")?, "5000")
            .parse()
            .context("Port must be a number between 0 and 65535")?
    };
    let tg_token = read_line("Telegram bot token (blank to skip Telegram): ")?;
    let user_ids = if tg_token.is_empty() {
        String::new()
    } else {
        read_line("Allowed Telegram user IDs (comma-separated, blank for everyone): ")?
    };

    if line_token.is_empty() && tg_token.is_empty() {
        anyhow::bail!("At least one of LINE or Telegram must be configured");
    }

    let config = format_config(&ConfigParams {
        backend: &backend,
        spreadsheet_id: &spreadsheet_id,
        access_token: &access_token,
        db_path: &db_path,
        webhook_url: &webhook_url,
        line_token: &line_token,
        port,
        tg_token: &tg_token,
        user_ids: &user_ids,
    });

    let config_path = project_root.join("config.toml");
    std::fs::write(&config_path, &config)
        .with_context(|| format!("Could not write {}", config_path.display()))?;

    println!("\n✓  config.toml saved to {}", config_path.display());
    println!("   Run the bot with:  cargo run");
    Ok(())
}

fn main() -> Result<()> {
    // Resolve project root: prefer HR_INTAKE_ROOT env, fall back to cwd.
    let project_root =
        PathBuf::from(std::env::var("HR_INTAKE_ROOT").unwrap_or_else(|_| ".".to_string()));
    run_cli(&project_root)
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn params<'a>() -> ConfigParams<'a> {
        ConfigParams {
            backend: "google",
            spreadsheet_id: "sheet-1",
            access_token: "ya29.x",
            db_path: "",
            webhook_url: "",
            line_token: "line-tok",
            port: 5000,
            tg_token: "",
            user_ids: "",
        }
    }

    #[test]
    fn test_google_section_present() {
        let out = format_config(&params());
        assert!(out.contains("backend = \"google\""));
        assert!(out.contains("[sheets.google]"));
        assert!(out.contains(r#"spreadsheet_id = "sheet-1""#));
        assert!(!out.contains("[sheets.sqlite]"));
    }

    #[test]
    fn test_sqlite_section_present() {
        let out = format_config(&ConfigParams {
            backend: "sqlite",
            db_path: "local.db",
            ..params()
        });
        assert!(out.contains("[sheets.sqlite]"));
        assert!(out.contains(r#"database_path = "local.db""#));
        assert!(!out.contains("[sheets.google]"));
    }

    #[test]
    fn test_webhook_commented_when_empty() {
        let out = format_config(&params());
        assert!(out.contains("# webhook_url ="));

        let out = format_config(&ConfigParams {
            webhook_url: "https://example.com/hook",
            ..params()
        });
        assert!(out.contains(r#"webhook_url = "https://example.com/hook""#));
    }

    #[test]
    fn test_line_section() {
        let out = format_config(&ConfigParams {
            port: 8080,
            ..params()
        });
        assert!(out.contains("[line]"));
        assert!(out.contains(r#"channel_access_token = "line-tok""#));
        assert!(out.contains("port = 8080"));
        assert!(!out.contains("[telegram]"));
    }

    #[test]
    fn test_multiple_user_ids_comma_separated() {
        let out = format_config(&ConfigParams {
            line_token: "",
            tg_token: "123:abc",
            user_ids: "111, 222 333",
            ..params()
        });
        assert!(!out.contains("[line]"));
        assert!(out.contains("[telegram]"));
        assert!(out.contains("allowed_user_ids = [111, 222, 333]"));
    }

    #[test]
    fn test_output_is_valid_toml() {
        let out = format_config(&ConfigParams {
            tg_token: "123:abc",
            user_ids: "1",
            webhook_url: "https://example.com/hook",
            ..params()
        });
        let parsed: toml::Value = toml::from_str(&out).unwrap();
        assert_eq!(parsed["registration"]["active"].as_bool(), Some(true));
        assert_eq!(parsed["line"]["port"].as_integer(), Some(5000));
    }
}
