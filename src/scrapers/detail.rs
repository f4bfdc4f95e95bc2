use anyhow::{Context, Result};
use regex::Regex;
use scraper::Html;

use crate::models::{Listing, Price};

use super::extract::{clean_text, element_text, find_by_class, FieldExtractor};

pub const DETAIL_LOCATION_MAX_CHARS: usize = 50;
/// Only reaches a listing whose card produced no description. Built-in
/// profiles that backfill take the card description from the fragment text,
/// which is never empty for a matched fragment.
pub const DETAIL_DESCRIPTION_MAX_CHARS: usize = 500;

/// Fields recovered from a listing's own page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailFields {
    pub price: Price,
    pub phone: String,
    pub location: String,
    pub description: String,
}

/// Tighter structural hints used on a detail page
#[derive(Debug, Clone)]
pub struct DetailExtractor {
    price_hint: Regex,
    location_hint: Regex,
    description_hint: Regex,
}

impl DetailExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            price_hint: hint(r"price|cost|מחיר")?,
            location_hint: hint(r"location|city|area|address|עיר|מיקום")?,
            description_hint: hint(r"description|content|details|תיאור|פרטים")?,
        })
    }

    pub fn extract(&self, document: &Html, fields: &FieldExtractor) -> DetailFields {
        let root = document.root_element();
        let page_text = element_text(root);

        let price = match find_by_class(root, &self.price_hint) {
            Some(el) => fields.price(&element_text(el)),
            None => fields.price(&page_text),
        };

        DetailFields {
            price,
            phone: fields.phone(&page_text),
            location: find_by_class(root, &self.location_hint)
                .map(|el| clean_text(&element_text(el), DETAIL_LOCATION_MAX_CHARS))
                .unwrap_or_default(),
            description: find_by_class(root, &self.description_hint)
                .map(|el| clean_text(&element_text(el), DETAIL_DESCRIPTION_MAX_CHARS))
                .unwrap_or_default(),
        }
    }
}

fn hint(vocabulary: &str) -> Result<Regex> {
    Regex::new(&format!("(?i){vocabulary}")).with_context(|| format!("Invalid hint {vocabulary}"))
}

/// Whether the listing card left out something a detail page could supply
pub fn needs_detail(listing: &Listing) -> bool {
    listing.price.is_unknown() || listing.phone.is_empty()
}

/// Fill only the fields the card left empty; populated fields are never replaced
pub fn backfill(listing: &mut Listing, detail: DetailFields) {
    if listing.price.is_unknown() && !detail.price.is_unknown() {
        listing.price = detail.price;
    }
    if listing.phone.is_empty() {
        listing.phone = detail.phone;
    }
    if listing.location.is_empty() {
        listing.location = detail.location;
    }
    if listing.description.is_empty() {
        listing.description = detail.description;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Site;

    fn listing(price: Price, phone: &str) -> Listing {
        Listing {
            site: Site::Yad2,
            title: "Glock 45 MOS".to_string(),
            url: "https://www.yad2.co.il/item/1".to_string(),
            price,
            description: "card text".to_string(),
            phone: phone.to_string(),
            location: String::new(),
        }
    }

    #[test]
    fn test_extract_uses_structural_hints() {
        let html = Html::parse_document(
            r#"<html><body>
                <div class="item-Price">₪ 3,900</div>
                <p>מחיר קודם 5000 שקל</p>
                <span class="city-name">  חיפה </span>
                <div class="ad-description">  גלוק 45 מוס,
                    שמור מאוד </div>
                <div>לפרטים: 052-7654321</div>
            </body></html>"#,
        );
        let detail = DetailExtractor::new()
            .unwrap()
            .extract(&html, &FieldExtractor::new().unwrap());

        assert_eq!(detail.price, Price::Known("₪3,900".to_string()));
        assert_eq!(detail.phone, "052-7654321");
        assert_eq!(detail.location, "חיפה");
        assert_eq!(detail.description, "גלוק 45 מוס, שמור מאוד");
    }

    #[test]
    fn test_extract_price_falls_back_to_page_text() {
        let html = Html::parse_document("<p>רק 4500 שקל</p>");
        let detail = DetailExtractor::new()
            .unwrap()
            .extract(&html, &FieldExtractor::new().unwrap());
        assert_eq!(detail.price, Price::Known("₪4500".to_string()));
        assert_eq!(detail.location, "");
        assert_eq!(detail.description, "");
    }

    #[test]
    fn test_needs_detail() {
        assert!(needs_detail(&listing(Price::Unknown, "050-1234567")));
        assert!(needs_detail(&listing(Price::Known("₪1".to_string()), "")));
        assert!(!needs_detail(&listing(Price::Known("₪1".to_string()), "050-1234567")));
    }

    #[test]
    fn test_backfill_never_overwrites() {
        let mut card = listing(Price::Known("₪3,500".to_string()), "");
        backfill(
            &mut card,
            DetailFields {
                price: Price::Known("₪9,999".to_string()),
                phone: "050-1111111".to_string(),
                location: "אילת".to_string(),
                description: "long detail text".to_string(),
            },
        );
        assert_eq!(card.price, Price::Known("₪3,500".to_string()));
        assert_eq!(card.phone, "050-1111111");
        assert_eq!(card.location, "אילת");
        assert_eq!(card.description, "card text");
    }

    #[test]
    fn test_backfill_keeps_unknown_when_detail_has_nothing() {
        let mut card = listing(Price::Unknown, "");
        backfill(&mut card, DetailFields::default());
        assert!(card.price.is_unknown());
        assert_eq!(card.phone, "");
    }

    #[test]
    fn test_backfill_fills_missing_description() {
        let mut card = listing(Price::Unknown, "");
        card.description.clear();
        backfill(
            &mut card,
            DetailFields {
                description: "long detail text".to_string(),
                ..DetailFields::default()
            },
        );
        assert_eq!(card.description, "long detail text");
    }
}
