use scraper::{ElementRef, Html};
use url::Url;

use crate::models::{Listing, Price, Site};

use super::extract::{clean_text, element_text, truncate_chars, FieldExtractor};
use super::matcher::KeywordMatcher;
use super::types::{DescriptionSource, FragmentRule, LinkSource, TitleFallback};

pub const TITLE_MAX_CHARS: usize = 200;
pub const CARD_DESCRIPTION_MAX_CHARS: usize = 300;

pub const MANUAL_CHECK_TITLE: &str = "נמצאה התאמה באתר - בדוק ידנית";
pub const MANUAL_CHECK_DESCRIPTION: &str = "נמצאה התאמה למילות החיפוש בדף. מומלץ לבדוק את האתר.";

/// Applies a site's fragment rule to a parsed page
pub struct FragmentScanner<'a> {
    pub site: Site,
    pub rule: &'a FragmentRule,
    pub matcher: &'a KeywordMatcher,
    pub extractor: &'a FieldExtractor,
}

impl FragmentScanner<'_> {
    /// Every fragment whose text matches a search term, in document order.
    ///
    /// Nested fragments are not collapsed; duplicates by URL are left to the aggregator.
    pub fn scan(&self, document: &Html, page_url: &str, base_url: &str) -> Vec<Listing> {
        document
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|el| self.rule.fragment.accepts(*el))
            .filter_map(|el| self.listing_from(el, page_url, base_url))
            .collect()
    }

    fn listing_from(&self, fragment: ElementRef<'_>, page_url: &str, base_url: &str) -> Option<Listing> {
        let text = element_text(fragment);
        let term = self.matcher.first_match(&text)?;

        let href = self
            .link_element(fragment)
            .and_then(|a| a.value().attr("href"))
            .unwrap_or("");

        let title = self
            .rule
            .title
            .first_in(fragment)
            .map(|el| clean_text(&element_text(el), TITLE_MAX_CHARS))
            .filter(|title| !title.is_empty())
            .unwrap_or_else(|| match self.rule.title_fallback {
                TitleFallback::FragmentPrefix(n) => clean_text(&truncate_chars(&text, n), TITLE_MAX_CHARS),
                TitleFallback::MatchedTerm => term.to_string(),
            });

        let description = match &self.rule.description {
            DescriptionSource::Element(query, max) => query
                .first_in(fragment)
                .map(|el| clean_text(&element_text(el), *max))
                .unwrap_or_default(),
            DescriptionSource::FragmentText(max) => clean_text(&text, *max),
        };

        Some(Listing {
            site: self.site,
            title,
            url: resolve_url(base_url, href, page_url),
            price: self.extractor.price(&text),
            description,
            phone: self.extractor.phone(&text),
            location: self.extractor.location(fragment),
        })
    }

    fn link_element<'b>(&self, fragment: ElementRef<'b>) -> Option<ElementRef<'b>> {
        if self.rule.link == LinkSource::SelfOrFirstAnchor && fragment.value().name() == "a" {
            return Some(fragment);
        }
        fragment
            .descendants()
            .skip(1)
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "a" && el.value().attr("href").is_some())
    }

    /// Whether the page as a whole mentions a search term
    pub fn page_matches(&self, document: &Html) -> bool {
        self.matcher.matches(&element_text(document.root_element()))
    }
}

/// Low-confidence record for a page whose text matches although no fragment did
pub fn manual_check(site: Site, page_url: &str) -> Listing {
    Listing {
        site,
        title: MANUAL_CHECK_TITLE.to_string(),
        url: page_url.to_string(),
        price: Price::Unknown,
        description: MANUAL_CHECK_DESCRIPTION.to_string(),
        phone: String::new(),
        location: String::new(),
    }
}

/// Absolute URL for a link found on `page_url`.
///
/// Absolute hrefs are kept; relative ones are joined onto `base_url`.
/// A missing href yields `base_url`, or the page itself when no base is configured.
pub fn resolve_url(base_url: &str, href: &str, page_url: &str) -> String {
    let href = href.trim();
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }

    let base = if base_url.is_empty() { page_url } else { base_url };
    if href.is_empty() {
        return base.to_string();
    }

    Url::parse(base)
        .and_then(|b| b.join(href))
        .map(|u| u.to_string())
        .unwrap_or_else(|_| format!("{base}{href}"))
}
