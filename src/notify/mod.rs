pub mod email;
pub mod format;
pub mod telegram;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Offset, Timelike, Utc};
use tracing::{info, warn};

use crate::config::NotifyConfig;
use crate::models::{Listing, Price, Site};

pub use email::EmailChannel;
pub use format::Alert;
pub use telegram::TelegramChannel;

/// Israel standard time; the daily status window is evaluated against it
const ISRAEL_UTC_OFFSET_SECS: i32 = 2 * 3600;
const DAILY_STATUS_HOUR: u32 = 20;

/// Outcome of handing an alert to one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// The alert has nothing for this channel
    Skipped,
}

#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn name(&self) -> &'static str;

    async fn deliver(&self, alert: &Alert) -> Result<Delivery>;
}

/// Fans an alert out to every configured channel
pub struct Notifier {
    channels: Vec<Box<dyn NotificationChannel>>,
}

impl Notifier {
    pub fn new(channels: Vec<Box<dyn NotificationChannel>>) -> Self {
        Self { channels }
    }

    /// Channels with missing credentials are left out rather than treated as errors
    pub fn from_config(config: &NotifyConfig) -> Result<Self> {
        let mut channels: Vec<Box<dyn NotificationChannel>> = Vec::new();

        match &config.telegram {
            Some(telegram) => channels.push(Box::new(TelegramChannel::new(telegram.clone())?)),
            None => warn!("⚠️ Telegram credentials not configured"),
        }
        match &config.email {
            Some(email) => channels.push(Box::new(EmailChannel::new(email.clone()))),
            None => warn!("⚠️ Email credentials not configured"),
        }

        Ok(Self::new(channels))
    }

    /// Notify about new listings. True when at least one channel delivered.
    pub async fn notify(&self, listings: &[Listing]) -> bool {
        if listings.is_empty() {
            info!("ℹ️ No results to notify");
            return false;
        }
        self.dispatch(&Alert::new_results(listings, israel_time(Utc::now())))
            .await
    }

    pub async fn send_test_notification(&self) -> bool {
        let sample = Listing {
            site: Site::Yad2,
            title: "מודעת בדיקה - הכל עובד!".to_string(),
            url: "https://example.com".to_string(),
            price: Price::Known("₪1,234".to_string()),
            description: "זוהי מודעת בדיקה לוודא שהמערכת עובדת כראוי.".to_string(),
            phone: "050-1234567".to_string(),
            location: "תל אביב".to_string(),
        };
        self.notify(&[sample]).await
    }

    /// Chat-only heartbeat with a link to the management page
    pub async fn send_daily_status(&self, ui_url: &str) -> bool {
        self.dispatch(&Alert::status(ui_url, israel_time(Utc::now())))
            .await
    }

    async fn dispatch(&self, alert: &Alert) -> bool {
        if self.channels.is_empty() {
            warn!("No notification channel is configured");
            return false;
        }

        let mut delivered = false;
        for channel in &self.channels {
            match channel.deliver(alert).await {
                Ok(Delivery::Sent) => {
                    info!("✅ {} message sent successfully", channel.name());
                    delivered = true;
                }
                Ok(Delivery::Skipped) => {}
                Err(e) => warn!("❌ Error sending {} message: {:#}", channel.name(), e),
            }
        }
        delivered
    }
}

pub fn israel_time(now: DateTime<Utc>) -> DateTime<FixedOffset> {
    let offset = FixedOffset::east_opt(ISRAEL_UTC_OFFSET_SECS).unwrap_or_else(|| Utc.fix());
    now.with_timezone(&offset)
}

/// The heartbeat goes out with the run that lands between 20:00 and 21:00 Israel time
pub fn should_send_daily_status(now: DateTime<Utc>) -> bool {
    israel_time(now).hour() == DAILY_STATUS_HOUR
}
