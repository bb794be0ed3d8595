//! SMTP delivery via async lettre.

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message as LettreMessage, Tokio1Executor};
use meetbell_core::config::EmailConfig;
use meetbell_core::error::{MeetbellError, Result};
use meetbell_core::traits::NotificationSender;

/// Sends one email per notification, addressed to every recipient.
pub struct SmtpSender {
    from: Mailbox,
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpSender {
    pub fn new(config: &EmailConfig) -> Result<Self> {
        let from: Mailbox = format!("{} <{}>", config.display_name, config.from)
            .parse()
            .map_err(|e| MeetbellError::Config(format!("Invalid from: {e}")))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .map_err(|e| MeetbellError::Config(format!("SMTP relay: {e}")))?
            .port(config.smtp_port);
        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));
        }

        Ok(Self {
            from,
            mailer: builder.build(),
        })
    }

    fn build(&self, recipients: &[String], subject: &str, body: &str) -> Result<LettreMessage> {
        let mut builder = LettreMessage::builder()
            .from(self.from.clone())
            .subject(subject)
            .header(ContentType::TEXT_PLAIN);

        let mut valid = 0;
        for to in recipients {
            match to.parse::<Mailbox>() {
                Ok(mailbox) => {
                    builder = builder.to(mailbox);
                    valid += 1;
                }
                Err(e) => tracing::warn!("⚠️ Skipping invalid recipient '{to}': {e}"),
            }
        }
        if valid == 0 {
            return Err(MeetbellError::Notify("No valid recipients".into()));
        }

        builder
            .body(body.to_string())
            .map_err(|e| MeetbellError::Notify(format!("Build email: {e}")))
    }
}

#[async_trait]
impl NotificationSender for SmtpSender {
    fn name(&self) -> &str {
        "email"
    }

    async fn send(&self, recipients: &[String], subject: &str, body: &str) -> Result<()> {
        let email = self.build(recipients, subject, body)?;
        self.mailer
            .send(email)
            .await
            .map_err(|e| MeetbellError::Notify(format!("SMTP send: {e}")))?;
        tracing::info!("📤 Email sent to {} recipient(s): {subject}", recipients.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EmailConfig {
        EmailConfig {
            enabled: true,
            smtp_host: "smtp.example.com".into(),
            from: "bot@example.com".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_build_skips_invalid_recipients() {
        let sender = SmtpSender::new(&config()).unwrap();
        let msg = sender
            .build(
                &["not an address".into(), "a@example.com".into()],
                "Hi",
                "Body",
            )
            .unwrap();
        let raw = String::from_utf8(msg.formatted()).unwrap();
        assert!(raw.contains("a@example.com"));
        assert!(!raw.contains("not an address"));
    }

    #[tokio::test]
    async fn test_build_without_valid_recipients_fails() {
        let sender = SmtpSender::new(&config()).unwrap();
        let err = sender.build(&["nope".into()], "Hi", "Body").unwrap_err();
        assert!(err.is_delivery_failure());
    }

    #[test]
    fn test_invalid_from_is_config_error() {
        let mut cfg = config();
        cfg.from = "broken".into();
        assert!(matches!(SmtpSender::new(&cfg), Err(MeetbellError::Config(_))));
    }
}
