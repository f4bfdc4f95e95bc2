use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder shown wherever a price could not be extracted
pub const PRICE_UNKNOWN: &str = "לא צוין";

/// Site a listing was scraped from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Site {
    BlueGun,
    Gun2,
    GunTrade,
    Yad2,
    Yad2Market,
}

impl Site {
    pub const ALL: [Site; 5] = [
        Site::BlueGun,
        Site::Gun2,
        Site::GunTrade,
        Site::Yad2,
        Site::Yad2Market,
    ];

    /// Name the site is registered under in the site registry
    pub fn registry_name(&self) -> &'static str {
        match self {
            Site::BlueGun => "BlueGun",
            Site::Gun2 => "Gun2",
            Site::GunTrade => "GunTrade",
            Site::Yad2 => "Yad2 נשק",
            Site::Yad2Market => "Yad2 Market נשק",
        }
    }

    /// Short label used in notifications and fingerprints
    pub fn label(&self) -> &'static str {
        match self {
            Site::BlueGun => "BlueGun",
            Site::Gun2 => "Gun2",
            Site::GunTrade => "GunTrade",
            Site::Yad2 => "Yad2",
            Site::Yad2Market => "Yad2 Market",
        }
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Extracted asking price
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Price {
    /// Formatted amount with a leading currency symbol, e.g. `₪3,500`
    Known(String),
    #[default]
    Unknown,
}

impl Price {
    pub fn is_unknown(&self) -> bool {
        matches!(self, Price::Unknown)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Price::Known(amount) => f.write_str(amount),
            Price::Unknown => f.write_str(PRICE_UNKNOWN),
        }
    }
}

/// A listing matched on one of the watched sites.
///
/// `url` is always populated; the remaining text fields use the empty
/// string when nothing could be extracted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Listing {
    pub site: Site,
    pub title: String,
    pub url: String,
    pub price: Price,
    pub description: String,
    pub phone: String,
    pub location: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_names_are_unique() {
        let mut names: Vec<_> = Site::ALL.iter().map(|s| s.registry_name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), Site::ALL.len());
    }

    #[test]
    fn test_price_display() {
        assert_eq!(Price::Known("₪3,500".to_string()).to_string(), "₪3,500");
        assert_eq!(Price::Unknown.to_string(), PRICE_UNKNOWN);
        assert!(Price::default().is_unknown());
    }
}
