//! Heuristic field extraction from free text and loosely structured fragments.
//!
//! Every extractor walks an ordered pattern list and returns the first hit;
//! when nothing matches it degrades to a sentinel instead of failing.

use anyhow::{Context, Result};
use regex::Regex;
use scraper::ElementRef;

use crate::models::Price;

/// Thousands-separated or plain run of digits
const NUMBER: &str = r"\d{1,3}(?:,\d{3})+|\d+";

const LOCATION_HINT: &str = r"(?i)location|city|area|address";

pub const LOCATION_MAX_CHARS: usize = 50;

/// Compiled price, phone and location patterns
#[derive(Debug, Clone)]
pub struct FieldExtractor {
    price_patterns: Vec<Regex>,
    phone_patterns: Vec<Regex>,
    location_hint: Regex,
}

impl FieldExtractor {
    pub fn new() -> Result<Self> {
        let price_patterns = [
            format!(r"({NUMBER})\s*₪"),
            format!(r"₪\s*({NUMBER})"),
            format!(r#"({NUMBER})\s*ש[״'"]?ח"#),
            r"(\d{4,5})\s*(?:שקל|שח)".to_string(),
            format!(r"מחיר[:\s]*({NUMBER})"),
        ];
        let phone_patterns = [
            r"(0\d{1,2}[-\s]?\d{7})",
            r"(05\d[-\s]?\d{7})",
            r"(\d{3}[-\s]?\d{7})",
        ];

        Ok(Self {
            price_patterns: compile_all(price_patterns.iter().map(String::as_str))?,
            phone_patterns: compile_all(phone_patterns)?,
            location_hint: Regex::new(LOCATION_HINT).context("Invalid location pattern")?,
        })
    }

    /// First price-looking amount in `text`, reformatted as `₪<amount>`
    pub fn price(&self, text: &str) -> Price {
        first_capture(&self.price_patterns, text)
            .map(|amount| Price::Known(format!("₪{amount}")))
            .unwrap_or(Price::Unknown)
    }

    /// First phone-looking number in `text`, verbatim; empty when none
    pub fn phone(&self, text: &str) -> String {
        first_capture(&self.phone_patterns, text)
            .map(str::to_string)
            .unwrap_or_default()
    }

    /// Text of the first element under `fragment` whose class looks like a
    /// location field, cut to a short bound
    pub fn location(&self, fragment: ElementRef<'_>) -> String {
        find_by_class(fragment, &self.location_hint)
            .map(|el| truncate_chars(element_text(el).trim(), LOCATION_MAX_CHARS))
            .unwrap_or_default()
    }
}

fn compile_all<'a>(patterns: impl IntoIterator<Item = &'a str>) -> Result<Vec<Regex>> {
    patterns
        .into_iter()
        .map(|p| Regex::new(p).with_context(|| format!("Invalid pattern {p}")))
        .collect()
}

fn first_capture<'t>(patterns: &[Regex], text: &'t str) -> Option<&'t str> {
    if text.is_empty() {
        return None;
    }
    patterns
        .iter()
        .find_map(|re| re.captures(text).and_then(|caps| caps.get(1)))
        .map(|m| m.as_str())
}

/// Collapse whitespace runs, trim, and cut to `max_chars` with a trailing `...`
pub fn clean_text(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() > max_chars {
        let mut cut = truncate_chars(&collapsed, max_chars);
        cut.push_str("...");
        cut
    } else {
        collapsed
    }
}

pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// All text nodes under `el`, concatenated
pub fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect()
}

pub fn class_matches(el: ElementRef<'_>, vocabulary: &Regex) -> bool {
    el.value()
        .attr("class")
        .map(|class| vocabulary.is_match(class))
        .unwrap_or(false)
}

/// First descendant of `root` (not `root` itself) whose class matches `vocabulary`
pub fn find_by_class<'a>(root: ElementRef<'a>, vocabulary: &Regex) -> Option<ElementRef<'a>> {
    root.descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .find(|el| class_matches(*el, vocabulary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn extractor() -> FieldExtractor {
        FieldExtractor::new().unwrap()
    }

    fn known(amount: &str) -> Price {
        Price::Known(amount.to_string())
    }

    #[test]
    fn test_price_patterns_in_priority_order() {
        let ex = extractor();
        assert_eq!(ex.price("Glock 45, 3,500 ₪ only"), known("₪3,500"));
        assert_eq!(ex.price("asking ₪ 4200"), known("₪4200"));
        assert_eq!(ex.price("2,800 ש\"ח"), known("₪2,800"));
        assert_eq!(ex.price("במחיר 3100 ש״ח"), known("₪3100"));
        assert_eq!(ex.price("3900 שקל לא כולל משלוח"), known("₪3900"));
        assert_eq!(ex.price("מחיר: 3500, טלפון 050-1234567"), known("₪3500"));
    }

    #[test]
    fn test_symbol_beats_label() {
        let ex = extractor();
        assert_eq!(ex.price("מחיר: 100, בפועל 3,300 ₪"), known("₪3,300"));
    }

    #[test]
    fn test_plain_number_is_not_cut_short() {
        assert_eq!(extractor().price("3500 ₪"), known("₪3500"));
    }

    #[test]
    fn test_price_without_pattern_is_unknown() {
        let ex = extractor();
        assert_eq!(ex.price(""), Price::Unknown);
        assert_eq!(ex.price("Glock 45 MOS, like new"), Price::Unknown);
        assert_eq!(ex.price("call 050-1234567"), Price::Unknown);
    }

    #[test]
    fn test_phone_is_returned_verbatim() {
        let ex = extractor();
        assert_eq!(ex.phone("טלפון 050-1234567, עיר תל אביב"), "050-1234567");
        assert_eq!(ex.phone("office 03 1234567"), "03 1234567");
        assert_eq!(ex.phone("0521234567"), "0521234567");
        assert_eq!(ex.phone("no phone here 12-34"), "");
        assert_eq!(ex.phone(""), "");
    }

    #[test]
    fn test_location_needs_structural_hint() {
        let ex = extractor();
        let html = Html::parse_fragment(
            r#"<div class="card"><span class="item-City">  תל אביב - יפו, מרכז הארץ, ישראל, קרוב לתחנה המרכזית </span></div>"#,
        );
        let selector = scraper::Selector::parse("div.card").unwrap();
        let card = html.select(&selector).next().unwrap();
        assert_eq!(
            ex.location(card),
            truncate_chars("תל אביב - יפו, מרכז הארץ, ישראל, קרוב לתחנה המרכזית", LOCATION_MAX_CHARS)
        );

        let bare = Html::parse_fragment(r#"<div class="card">עיר תל אביב</div>"#);
        let card = bare.select(&selector).next().unwrap();
        assert_eq!(ex.location(card), "");
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  a \n\t b   c ", 200), "a b c");
        assert_eq!(clean_text("abcdef", 3), "abc...");
        assert_eq!(clean_text("abc", 3), "abc");
        assert_eq!(clean_text("", 10), "");
        assert_eq!(clean_text("שלום עולם", 4), "שלום...");
    }
}
