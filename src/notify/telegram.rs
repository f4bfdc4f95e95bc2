use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use crate::config::TelegramConfig;

use super::format::Alert;
use super::{Delivery, NotificationChannel};

pub const TELEGRAM_API: &str = "https://api.telegram.org";

/// Telegram Bot API `sendMessage` delivery
pub struct TelegramChannel {
    client: Client,
    api_base: String,
    config: TelegramConfig,
}

impl TelegramChannel {
    pub fn new(config: TelegramConfig) -> Result<Self> {
        Self::with_api_base(config, TELEGRAM_API)
    }

    pub fn with_api_base(config: TelegramConfig, api_base: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to create Telegram client")?;

        Ok(Self {
            client,
            api_base: api_base.into(),
            config,
        })
    }

    async fn send_message(&self, text: &str) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.config.bot_token);
        let payload = json!({
            "chat_id": self.config.chat_id,
            "text": text,
            "parse_mode": "HTML",
            "disable_web_page_preview": false,
        });

        // Strip the URL from transport errors; it carries the bot token
        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to reach Telegram: {}", e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Telegram returned {}: {}", status, body);
        }

        debug!("Telegram accepted message of {} chars", text.chars().count());
        Ok(())
    }
}

#[async_trait]
impl NotificationChannel for TelegramChannel {
    fn name(&self) -> &'static str {
        "Telegram"
    }

    async fn deliver(&self, alert: &Alert) -> Result<Delivery> {
        if alert.chat.is_empty() {
            return Ok(Delivery::Skipped);
        }
        let total = alert.chat.len();
        for (sent, message) in alert.chat.iter().enumerate() {
            self.send_message(message)
                .await
                .with_context(|| format!("Telegram delivered {sent} of {total} messages"))?;
        }
        Ok(Delivery::Sent)
    }
}
