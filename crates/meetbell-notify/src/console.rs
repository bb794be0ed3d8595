//! Log-only sender, used when no transport is configured.

use async_trait::async_trait;
use meetbell_core::error::Result;
use meetbell_core::traits::NotificationSender;

#[derive(Debug, Default)]
pub struct LogSender;

#[async_trait]
impl NotificationSender for LogSender {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, recipients: &[String], subject: &str, body: &str) -> Result<()> {
        tracing::info!("📢 [{}] {subject}", recipients.join(", "));
        tracing::debug!("{body}");
        Ok(())
    }
}
