use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::NotifyConfig;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("notification endpoint returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}

/// Tells a downstream automation which worksheet just received a row.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Returns the endpoint's response body.
    async fn notify(&self, sheet: &str) -> Result<String, NotifyError>;
}

#[derive(Debug, Serialize)]
struct NotifyPayload<'a> {
    sheet: &'a str,
}

/// POSTs `{"sheet": "<name>"}` to a webhook such as an Apps Script deployment.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(config: &NotifyConfig, url: String) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, sheet: &str) -> Result<String, NotifyError> {
        debug!("Sending notification for worksheet {} to {}", sheet, self.url);

        let response = self
            .client
            .post(&self.url)
            .json(&NotifyPayload { sheet })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(NotifyError::Status { status, body });
        }
        Ok(body)
    }
}

/// Fire the notification on the runtime and return immediately.
///
/// The outcome only reaches the log; nothing is retried.
pub fn dispatch(notifier: Arc<dyn Notifier>, sheet: String) -> JoinHandle<()> {
    tokio::spawn(async move {
        match notifier.notify(&sheet).await {
            Ok(body) => info!("Notification for worksheet {} delivered: {}", sheet, body),
            Err(e) => warn!("Notification for worksheet {} failed: {}", sheet, e),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::Mutex;

    struct Recording {
        sheets: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl Notifier for Recording {
        async fn notify(&self, sheet: &str) -> Result<String, NotifyError> {
            self.sheets.lock().await.push(sheet.to_string());
            if self.fail {
                return Err(NotifyError::Status {
                    status: reqwest::StatusCode::BAD_GATEWAY,
                    body: "down".to_string(),
                });
            }
            Ok("ok".to_string())
        }
    }

    #[tokio::test]
    async fn test_dispatch_calls_notifier() {
        let recorder = Arc::new(Recording {
            sheets: Mutex::new(Vec::new()),
            fail: false,
        });
        dispatch(recorder.clone(), "DailyEmployee".to_string())
            .await
            .unwrap();
        assert_eq!(*recorder.sheets.lock().await, vec!["DailyEmployee"]);
    }

    #[tokio::test]
    async fn test_dispatch_swallows_failure() {
        let recorder = Arc::new(Recording {
            sheets: Mutex::new(Vec::new()),
            fail: true,
        });
        let handle = dispatch(recorder.clone(), "MonthlyEmployee".to_string());
        assert!(handle.await.is_ok());
        assert_eq!(recorder.sheets.lock().await.len(), 1);
    }

    #[test]
    fn test_payload_shape() {
        let body = serde_json::to_string(&NotifyPayload {
            sheet: "DailyEmployee",
        })
        .unwrap();
        assert_eq!(body, r#"{"sheet":"DailyEmployee"}"#);
    }

    #[test]
    fn test_status_error_message() {
        let err = NotifyError::Status {
            status: reqwest::StatusCode::NOT_FOUND,
            body: "missing".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "notification endpoint returned 404 Not Found: missing"
        );
    }
}
