//! # Meetbell Notify
//!
//! Message templates plus `NotificationSender` transports.
//!
//! ```text
//! Reminder engine ──► FanoutSender ──┬── SmtpSender (lettre)
//!                                    ├── WebhookSender (reqwest)
//!                                    └── LogSender (no transport configured)
//! ```

pub mod email;
pub mod console;
pub mod templates;
pub mod webhook;

use std::sync::Arc;

use async_trait::async_trait;
use meetbell_core::config::MeetbellConfig;
use meetbell_core::error::{MeetbellError, Result};
use meetbell_core::traits::NotificationSender;

pub use email::SmtpSender;
pub use console::LogSender;
pub use templates::Message;
pub use webhook::WebhookSender;

/// Sends through every inner transport concurrently. Succeeds if at least
/// one transport succeeded; the failures of the others are logged.
pub struct FanoutSender {
    senders: Vec<Arc<dyn NotificationSender>>,
}

impl FanoutSender {
    pub fn new(senders: Vec<Arc<dyn NotificationSender>>) -> Self {
        Self { senders }
    }
}

#[async_trait]
impl NotificationSender for FanoutSender {
    fn name(&self) -> &str {
        "fanout"
    }

    async fn send(&self, recipients: &[String], subject: &str, body: &str) -> Result<()> {
        let results = futures::future::join_all(self.senders.iter().map(|s| async move {
            (s.name().to_string(), s.send(recipients, subject, body).await)
        }))
        .await;

        let mut errors = Vec::new();
        for (name, result) in results {
            if let Err(e) = result {
                tracing::warn!("⚠️ {name} delivery failed: {e}");
                errors.push(format!("{name}: {e}"));
            }
        }

        if errors.len() == self.senders.len() && !errors.is_empty() {
            Err(MeetbellError::Notify(errors.join("; ")))
        } else {
            Ok(())
        }
    }
}

/// Build the sender from config. Falls back to [`LogSender`] when no
/// transport is enabled.
pub fn sender_from_config(config: &MeetbellConfig) -> Result<Arc<dyn NotificationSender>> {
    let mut senders: Vec<Arc<dyn NotificationSender>> = Vec::new();

    if config.email.enabled {
        senders.push(Arc::new(SmtpSender::new(&config.email)?));
    }
    if config.webhook.enabled {
        senders.push(Arc::new(WebhookSender::new(&config.webhook)));
    }

    Ok(match senders.len() {
        0 => {
            tracing::warn!(
                "⚠️ No notification transport configured, reminders will only be logged"
            );
            Arc::new(LogSender)
        }
        1 => senders.remove(0),
        _ => Arc::new(FanoutSender::new(senders)),
    })
}
