//! JSON files kept between runs: the set of already-notified listings and the run status.
//!
//! Both are read once at start and written once at the end. Unreadable or
//! corrupt files fall back to empty/default values and are never fatal.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::models::Listing;

/// Stable identity of a listing across runs
pub fn fingerprint(listing: &Listing) -> String {
    let key = format!("{}:{}:{}", listing.site.label(), listing.url, listing.title);
    hex::encode(Sha256::digest(key.as_bytes()))
}

#[derive(Debug, Serialize, Deserialize)]
struct SeenFile {
    items: Vec<String>,
    last_updated: DateTime<Utc>,
}

/// Fingerprints of listings that were already notified. Grows monotonically.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeenSet {
    items: BTreeSet<String>,
}

impl SeenSet {
    pub fn load(path: &Path) -> Self {
        match read_json::<SeenFile>(path) {
            Ok(Some(file)) => Self {
                items: file.items.into_iter().collect(),
            },
            Ok(None) => {
                debug!("No seen-items file at {}", path.display());
                Self::default()
            }
            Err(e) => {
                warn!("Error loading seen items: {:#}", e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = SeenFile {
            items: self.items.iter().cloned().collect(),
            last_updated: Utc::now(),
        };
        write_json(path, &file)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn contains(&self, listing: &Listing) -> bool {
        self.items.contains(&fingerprint(listing))
    }

    /// Listings not notified before, in input order
    pub fn filter_new(&self, listings: &[Listing]) -> Vec<Listing> {
        listings
            .iter()
            .filter(|listing| !self.contains(listing))
            .cloned()
            .collect()
    }

    pub fn mark_all<'a>(&mut self, listings: impl IntoIterator<Item = &'a Listing>) {
        self.items.extend(listings.into_iter().map(fingerprint));
    }
}

/// Persisted run switch and bookkeeping.
///
/// The management page edits this file too, so keys we do not know about are
/// carried through a save untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunStatus {
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub last_weekly_notification: Option<DateTime<Utc>>,
    #[serde(default = "Utc::now", deserialize_with = "lenient_timestamp_or_now")]
    pub created_at: DateTime<Utc>,
    /// Overrides `TELEGRAM_CHAT_ID` when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram_chat_id: Option<String>,
    /// Overrides `NOTIFY_EMAIL` when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notify_email: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for RunStatus {
    fn default() -> Self {
        Self {
            enabled: true,
            last_weekly_notification: None,
            created_at: Utc::now(),
            telegram_chat_id: None,
            notify_email: None,
            extra: Map::new(),
        }
    }
}

impl RunStatus {
    pub fn load(path: &Path) -> Self {
        let raw = match read_json::<Value>(path) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Self::default(),
            Err(e) => {
                warn!("Error loading status: {:#}", e);
                return Self::default();
            }
        };

        // A malformed field elsewhere must not flip a disabled scanner back on
        let enabled = raw.get("enabled").and_then(Value::as_bool);
        match serde_json::from_value::<RunStatus>(raw) {
            Ok(status) => status,
            Err(e) => {
                warn!("Error loading status: {:#}", e);
                Self {
                    enabled: enabled.unwrap_or(true),
                    ..Self::default()
                }
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_json(path, self)
    }
}

fn enabled_by_default() -> bool {
    true
}

/// RFC 3339, or a naive ISO 8601 timestamp taken as UTC
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .ok()
        .or_else(|| raw.parse::<NaiveDateTime>().ok().map(|t| t.and_utc()))
}

/// Unparseable timestamps read as absent instead of failing the whole file
fn lenient_timestamp<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(Value::as_str).and_then(parse_timestamp))
}

fn lenient_timestamp_or_now<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_timestamp(deserializer)?.unwrap_or_else(Utc::now))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let value = serde_json::from_str(&raw).with_context(|| format!("Corrupt file {}", path.display()))?;
    Ok(Some(value))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}
