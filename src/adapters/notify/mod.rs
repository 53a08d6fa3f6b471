//! Notification channel
//!
//! Stage entry points report success and failure as `(subject, message)` pairs.
//! Delivery is fire-and-forget: [`notify_quietly`] logs a failed delivery and
//! never lets it change a stage's outcome.

use crate::config::NotificationConfig;
use crate::domain::{QuarryError, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Channel for stage outcome notifications
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends one notification
    async fn notify(&self, subject: &str, message: &str) -> Result<()>;
}

/// Writes notifications to the log only
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, subject: &str, message: &str) -> Result<()> {
        tracing::info!(subject = subject, message = message, "Notification");
        Ok(())
    }
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    subject: &'a str,
    message: &'a str,
    sent_at: String,
}

/// POSTs `{subject, message, sent_at}` as JSON to a webhook
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    /// Creates a notifier with a request timeout
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| QuarryError::Notification(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, subject: &str, message: &str) -> Result<()> {
        let payload = WebhookPayload {
            subject,
            message,
            sent_at: chrono::Utc::now().to_rfc3339(),
        };

        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| QuarryError::Notification(format!("Webhook request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(QuarryError::Notification(format!(
                "Webhook returned HTTP {status}"
            )));
        }

        tracing::debug!(subject = subject, "Notification delivered");
        Ok(())
    }
}

/// Sends a notification, logging instead of failing when delivery fails
pub async fn notify_quietly(notifier: &dyn Notifier, subject: &str, message: &str) {
    if let Err(e) = notifier.notify(subject, message).await {
        tracing::warn!(subject = subject, error = %e, "Failed to send notification");
    }
}

/// Create the notifier selected by configuration
pub fn create_notifier(config: &NotificationConfig) -> Result<Arc<dyn Notifier>> {
    match (&config.webhook_url, config.enabled) {
        (Some(url), true) => Ok(Arc::new(WebhookNotifier::new(
            url.clone(),
            Duration::from_secs(config.timeout_seconds),
        )?)),
        _ => Ok(Arc::new(LogNotifier)),
    }
}
