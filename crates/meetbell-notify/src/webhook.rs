//! Generic HTTP webhook: POST with JSON body.

use std::time::Duration;

use async_trait::async_trait;
use meetbell_core::config::WebhookConfig;
use meetbell_core::error::{MeetbellError, Result};
use meetbell_core::traits::NotificationSender;

pub struct WebhookSender {
    url: String,
    headers: Vec<(String, String)>,
    client: reqwest::Client,
}

impl WebhookSender {
    pub fn new(config: &WebhookConfig) -> Self {
        Self {
            url: config.url.clone(),
            headers: config.headers.clone(),
            client: reqwest::Client::new(),
        }
    }

    fn payload(recipients: &[String], subject: &str, body: &str) -> serde_json::Value {
        serde_json::json!({
            "recipients": recipients,
            "subject": subject,
            "body": body,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })
    }
}

#[async_trait]
impl NotificationSender for WebhookSender {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn send(&self, recipients: &[String], subject: &str, body: &str) -> Result<()> {
        let mut req = self
            .client
            .post(&self.url)
            .json(&Self::payload(recipients, subject, body))
            .timeout(Duration::from_secs(10));

        for (key, value) in &self.headers {
            req = req.header(key.as_str(), value.as_str());
        }

        let resp = req
            .send()
            .await
            .map_err(|e| MeetbellError::Notify(format!("Webhook send failed: {e}")))?;

        if resp.status().is_success() {
            tracing::info!("✅ Webhook notification sent to {}: {}", self.url, subject);
            Ok(())
        } else {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            Err(MeetbellError::Notify(format!("Webhook error {status}: {text}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_shape() {
        let payload = WebhookSender::payload(&["a@example.com".into()], "Subj", "Body");
        assert_eq!(payload["recipients"][0], "a@example.com");
        assert_eq!(payload["subject"], "Subj");
        assert_eq!(payload["body"], "Body");
        assert!(payload["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_unreachable_webhook_is_notify_error() {
        let sender = WebhookSender::new(&WebhookConfig {
            enabled: true,
            url: "http://127.0.0.1:9/hook".into(),
            headers: vec![],
        });
        let err = sender
            .send(&["a@example.com".into()], "Subj", "Body")
            .await
            .unwrap_err();
        assert!(err.is_delivery_failure());
    }
}
