use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;

use crate::config::EmailConfig;

use super::format::{Alert, EmailContent};
use super::{Delivery, NotificationChannel};

/// SMTP delivery, implicit TLS or STARTTLS depending on config
pub struct EmailChannel {
    config: EmailConfig,
}

impl EmailChannel {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    fn build_message(&self, content: &EmailContent) -> Result<Message> {
        let from: Mailbox = self.config.address.parse().context("Invalid EMAIL_ADDRESS")?;
        let to: Mailbox = self.config.recipient.parse().context("Invalid NOTIFY_EMAIL")?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(content.subject.clone())
            .multipart(MultiPart::alternative_plain_html(
                content.text.clone(),
                content.html.clone(),
            ))
            .context("Failed to build email")
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
        let server = self.config.smtp_server.as_str();
        let builder = if self.config.use_ssl {
            AsyncSmtpTransport::<Tokio1Executor>::relay(server)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(server)
        }
        .with_context(|| format!("Invalid SMTP server {server}"))?;

        Ok(builder
            .port(self.config.smtp_port)
            .credentials(Credentials::new(
                self.config.address.clone(),
                self.config.password.clone(),
            ))
            .timeout(Some(Duration::from_secs(30)))
            .build())
    }
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    fn name(&self) -> &'static str {
        "Email"
    }

    async fn deliver(&self, alert: &Alert) -> Result<Delivery> {
        let Some(content) = &alert.email else {
            return Ok(Delivery::Skipped);
        };

        let message = self.build_message(content)?;
        self.transport()?
            .send(message)
            .await
            .context("SMTP delivery failed")?;
        Ok(Delivery::Sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(recipient: &str) -> EmailConfig {
        EmailConfig {
            address: "watch@example.com".to_string(),
            password: "secret".to_string(),
            recipient: recipient.to_string(),
            smtp_server: "smtp.example.com".to_string(),
            smtp_port: 465,
            use_ssl: true,
        }
    }

    fn content() -> EmailContent {
        EmailContent {
            subject: "new results".to_string(),
            html: "<p>hello</p>".to_string(),
            text: "hello".to_string(),
        }
    }

    #[test]
    fn test_message_is_multipart_alternative() {
        let message = EmailChannel::new(config("you@example.com"))
            .build_message(&content())
            .unwrap();
        let raw = String::from_utf8_lossy(&message.formatted()).to_string();
        assert!(raw.contains("you@example.com"));
        assert!(raw.contains("multipart/alternative"));
        assert!(raw.contains("text/html"));
    }

    #[test]
    fn test_invalid_recipient_is_an_error() {
        let result = EmailChannel::new(config("not an address")).build_message(&content());
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_chat_only_alert_is_skipped() {
        let alert = Alert {
            chat: vec!["status".to_string()],
            email: None,
        };
        let delivery = EmailChannel::new(config("you@example.com"))
            .deliver(&alert)
            .await
            .unwrap();
        assert_eq!(delivery, Delivery::Skipped);
    }
}
