//! Runtime configuration: search terms, the site registry and channel credentials.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_UI_URL: &str = "https://yad2-scraper-config.netlify.app";

/// One entry of the site registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SiteConfig {
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_url: Option<String>,
    /// Additional pages checked after `url` (e.g. a brand-filtered index)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_urls: Vec<String>,
    pub base_url: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl SiteConfig {
    /// The search page if one is configured, otherwise the landing page
    pub fn search_or_url(&self) -> &str {
        self.search_url.as_deref().unwrap_or(&self.url)
    }
}

/// Static list of sites; adapters look themselves up by name.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct SiteRegistry {
    sites: Vec<SiteConfig>,
}

impl SiteRegistry {
    pub fn new(sites: Vec<SiteConfig>) -> Self {
        Self { sites }
    }

    pub fn enabled(&self) -> impl Iterator<Item = &SiteConfig> {
        self.sites.iter().filter(|s| s.enabled)
    }

    /// Find an enabled site by registry name
    pub fn find_enabled(&self, name: &str) -> Option<&SiteConfig> {
        self.enabled().find(|s| s.name == name)
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_search_terms")]
    pub search_terms: Vec<String>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_seen_file")]
    pub seen_items_file: PathBuf,
    #[serde(default = "default_status_file")]
    pub status_file: PathBuf,
    #[serde(default = "default_sites")]
    pub sites: SiteRegistry,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            search_terms: default_search_terms(),
            user_agent: default_user_agent(),
            request_timeout_secs: default_timeout(),
            seen_items_file: default_seen_file(),
            status_file: default_status_file(),
            sites: default_sites(),
        }
    }
}

impl AppConfig {
    /// Load the config file, falling back to built-in defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid config file {}", path.display()))?;

        info!(
            "Loaded config from {} ({} terms, {} sites)",
            path.display(),
            config.search_terms.len(),
            config.sites.enabled().count()
        );
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Telegram bot credentials
#[derive(Debug, Clone, PartialEq)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
}

/// SMTP account and recipient
#[derive(Debug, Clone, PartialEq)]
pub struct EmailConfig {
    pub address: String,
    pub password: String,
    pub recipient: String,
    pub smtp_server: String,
    pub smtp_port: u16,
    pub use_ssl: bool,
}

/// Channel credentials. A channel is `None` when any of its credentials is missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotifyConfig {
    pub telegram: Option<TelegramConfig>,
    pub email: Option<EmailConfig>,
    pub ui_url: String,
}

impl NotifyConfig {
    /// Read credentials from the environment. `chat_id` and `recipient`
    /// override the corresponding variables when set.
    pub fn from_env(chat_id: Option<String>, recipient: Option<String>) -> Self {
        Self::from_lookup(|key| env::var(key).ok(), chat_id, recipient)
    }

    fn from_lookup<F>(lookup: F, chat_id: Option<String>, recipient: Option<String>) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let chat_id = chat_id.filter(|v| !v.trim().is_empty());
        let recipient = recipient.filter(|v| !v.trim().is_empty());

        let telegram = match (var("TELEGRAM_BOT_TOKEN"), chat_id.or_else(|| var("TELEGRAM_CHAT_ID"))) {
            (Some(bot_token), Some(chat_id)) => Some(TelegramConfig { bot_token, chat_id }),
            _ => None,
        };

        let email = match (
            var("EMAIL_ADDRESS"),
            var("EMAIL_PASSWORD"),
            recipient.or_else(|| var("NOTIFY_EMAIL")),
        ) {
            (Some(address), Some(password), Some(recipient)) => Some(EmailConfig {
                address,
                password,
                recipient,
                smtp_server: var("SMTP_SERVER").unwrap_or_else(|| "smtp.gmail.com".to_string()),
                smtp_port: var("SMTP_PORT")
                    .and_then(|p| p.trim().parse().ok())
                    .unwrap_or(465),
                use_ssl: var("SMTP_USE_SSL")
                    .map(|v| v.trim().eq_ignore_ascii_case("true"))
                    .unwrap_or(true),
            }),
            _ => None,
        };

        Self {
            telegram,
            email,
            ui_url: var("UI_URL").unwrap_or_else(|| DEFAULT_UI_URL.to_string()),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_seen_file() -> PathBuf {
    PathBuf::from("seen_items.json")
}

fn default_status_file() -> PathBuf {
    PathBuf::from("status.json")
}

fn default_search_terms() -> Vec<String> {
    [
        "glock 45 mos",
        "גלוק 45 מוס",
        "גלוק 45 מ.ו.ס",
        "glock45 mos",
        "גלוק45 מוס",
        "glock 45mos",
        "45 mos",
        "45 מוס",
    ]
    .iter()
    .map(|t| t.to_string())
    .collect()
}

fn default_sites() -> SiteRegistry {
    SiteRegistry::new(vec![
        SiteConfig {
            name: "BlueGun".to_string(),
            url: "https://bluegun.co.il/explore-classic/".to_string(),
            search_url: Some("https://bluegun.co.il/explore-classic/?type=cars&category=%25d7%2590%25d7%25a7%25d7%2593%25d7%2597%25d7%2599%25d7%259d-%25d7%2599%25d7%25932&sort=latest".to_string()),
            extra_urls: Vec::new(),
            base_url: "https://bluegun.co.il".to_string(),
            enabled: true,
        },
        SiteConfig {
            name: "Gun2".to_string(),
            url: "https://gun2.co.il/".to_string(),
            search_url: Some("https://gun2.co.il/".to_string()),
            extra_urls: vec!["https://gun2.co.il/weapon-brand/%d7%92%d7%9c%d7%95%d7%a7/".to_string()],
            base_url: "https://gun2.co.il".to_string(),
            enabled: true,
        },
        SiteConfig {
            name: "GunTrade".to_string(),
            url: "https://guntrade.co.il/".to_string(),
            search_url: Some("https://guntrade.co.il/%d7%9c%d7%95%d7%97-%d7%99%d7%932/".to_string()),
            extra_urls: Vec::new(),
            base_url: "https://guntrade.co.il".to_string(),
            enabled: true,
        },
        SiteConfig {
            name: "Yad2 נשק".to_string(),
            url: "https://www.yad2.co.il/products/weapons?category=27".to_string(),
            search_url: None,
            extra_urls: Vec::new(),
            base_url: "https://www.yad2.co.il".to_string(),
            enabled: true,
        },
        SiteConfig {
            name: "Yad2 Market נשק".to_string(),
            url: "https://market.yad2.co.il/collections/%D7%9B%D7%9C%D7%99-%D7%A0%D7%A9%D7%A7".to_string(),
            search_url: Some("https://market.yad2.co.il/collections/%D7%9B%D7%9C%D7%99-%D7%A0%D7%A9%D7%A7".to_string()),
            extra_urls: Vec::new(),
            base_url: "https://market.yad2.co.il".to_string(),
            enabled: true,
        },
    ])
}
