mod config;
mod notify;
mod platform;
mod registration;
mod sheets;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, SheetBackend};
use crate::notify::{Notifier, WebhookNotifier};
use crate::registration::{HandlerSettings, RegistrationHandler, SHEET_HEADER};
use crate::sheets::google::GoogleSheetsStore;
use crate::sheets::sqlite::SqliteSheetStore;
use crate::sheets::SheetStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,hr_intake_bot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  Registration active: {}", config.registration.active);
    info!("  Sheet backend: {}", config.sheets.backend);
    info!(
        "  Worksheets: {} / {}",
        config.sheets.daily_worksheet, config.sheets.monthly_worksheet
    );
    info!(
        "  Notification webhook: {}",
        if config.notify.webhook_url.is_some() { "configured" } else { "none" }
    );

    let sheets = open_sheet_store(&config).await?;

    let notifier = match &config.notify.webhook_url {
        Some(url) => {
            let webhook: Arc<dyn Notifier> = Arc::new(
                WebhookNotifier::new(&config.notify, url.clone())
                    .context("Failed to build notification client")?,
            );
            Some(webhook)
        }
        None => None,
    };

    let settings = HandlerSettings::from_config(&config)?;
    let handler = Arc::new(RegistrationHandler::new(settings, sheets, notifier));

    let mut platforms = tokio::task::JoinSet::new();
    if let Some(line) = config.line.clone() {
        platforms.spawn(platform::line::run(handler.clone(), line));
    }
    if let Some(telegram) = config.telegram.clone() {
        platforms.spawn(platform::telegram::run(handler.clone(), telegram));
    }

    info!("Bot is starting...");
    while let Some(finished) = platforms.join_next().await {
        match finished {
            Ok(Ok(())) => info!("Platform stopped"),
            Ok(Err(e)) => {
                error!("Platform failed: {:#}", e);
                return Err(e);
            }
            Err(e) => return Err(e).context("Platform task panicked"),
        }
    }

    Ok(())
}

async fn open_sheet_store(config: &Config) -> Result<Arc<dyn SheetStore>> {
    match config.sheets.backend {
        SheetBackend::Google => {
            let google = config
                .sheets
                .google
                .clone()
                .context("[sheets.google] section is required for the google backend")?;
            info!("  Spreadsheet: {}", google.spreadsheet_id);
            Ok(Arc::new(GoogleSheetsStore::new(google)?))
        }
        SheetBackend::Sqlite => {
            let sqlite = config
                .sheets
                .sqlite
                .as_ref()
                .context("[sheets.sqlite] section is required for the sqlite backend")?;
            let store = SqliteSheetStore::open(&sqlite.database_path)?;
            for sheet in [&config.sheets.daily_worksheet, &config.sheets.monthly_worksheet] {
                store.ensure_header(sheet, &SHEET_HEADER).await?;
            }
            Ok(Arc::new(store))
        }
    }
}
