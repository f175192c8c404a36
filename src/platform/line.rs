use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::LineConfig;
use crate::platform::{respond, IncomingMessage};
use crate::registration::RegistrationHandler;

// ── Webhook payload ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct WebhookBody {
    #[serde(default)]
    pub events: Vec<WebhookEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub reply_token: Option<String>,
    pub source: Option<EventSource>,
    pub message: Option<EventMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSource {
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EventMessage {
    #[serde(rename = "type")]
    pub message_type: String,
    pub text: Option<String>,
}

impl WebhookEvent {
    /// Reply token and message for text message events; `None` for anything else.
    fn into_text_message(self) -> Option<(String, IncomingMessage)> {
        if self.event_type != "message" {
            return None;
        }
        let message = self.message?;
        if message.message_type != "text" {
            return None;
        }
        let reply_token = self.reply_token?;
        let user_id = self.source.and_then(|s| s.user_id).unwrap_or_default();
        Some((
            reply_token,
            IncomingMessage {
                platform: "line".to_string(),
                user_id,
                text: message.text.unwrap_or_default(),
            },
        ))
    }
}

// ── Reply API ──────────────────────────────────────────────────────────────────

#[async_trait]
pub trait ReplySender: Send + Sync {
    async fn reply(&self, reply_token: &str, text: &str) -> Result<()>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplyRequest<'a> {
    reply_token: &'a str,
    messages: [TextMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct TextMessage<'a> {
    #[serde(rename = "type")]
    message_type: &'static str,
    text: &'a str,
}

pub struct LineClient {
    client: reqwest::Client,
    config: LineConfig,
}

impl LineClient {
    pub fn new(config: LineConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build LINE HTTP client")?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl ReplySender for LineClient {
    async fn reply(&self, reply_token: &str, text: &str) -> Result<()> {
        let url = format!(
            "{}/v2/bot/message/reply",
            self.config.api_base_url.trim_end_matches('/')
        );

        debug!("Sending LINE reply to {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.channel_access_token)
            .json(&ReplyRequest {
                reply_token,
                messages: [TextMessage {
                    message_type: "text",
                    text,
                }],
            })
            .send()
            .await
            .context("Failed to send request to LINE")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("LINE API error ({}): {}", status, error_body);
        }

        Ok(())
    }
}

// ── Webhook server ─────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct LineState {
    pub handler: Arc<RegistrationHandler>,
    pub replier: Arc<dyn ReplySender>,
}

pub fn router(state: LineState) -> Router {
    Router::new()
        .route("/callback", post(callback))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

async fn callback(State(state): State<LineState>, body: String) -> Result<&'static str, StatusCode> {
    let body: WebhookBody = serde_json::from_str(&body).map_err(|e| {
        warn!("Rejected malformed LINE webhook body: {}", e);
        StatusCode::BAD_REQUEST
    })?;

    for event in body.events {
        let Some((reply_token, incoming)) = event.into_text_message() else {
            continue;
        };

        info!("LINE message from {}: {}", incoming.user_id, incoming.text);

        let reply = respond(&state.handler, &incoming).await;

        if let Err(e) = state.replier.reply(&reply_token, &reply).await {
            error!("Failed to reply to {}: {:#}", incoming.user_id, e);
        }
    }

    Ok("OK")
}

/// Run the LINE webhook server
pub async fn run(handler: Arc<RegistrationHandler>, config: LineConfig) -> Result<()> {
    let addr = format!("{}:{}", config.bind_address, config.port);
    let state = LineState {
        handler,
        replier: Arc::new(LineClient::new(config)?),
    };

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    info!("LINE webhook listening on http://{}/callback", addr);

    axum::serve(listener, router(state))
        .await
        .context("LINE webhook server error")?;

    Ok(())
}
