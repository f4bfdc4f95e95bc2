use anyhow::{Context, Result};
use regex::Regex;
use scraper::ElementRef;

use crate::config::SiteConfig;
use crate::models::Site;

use super::extract::class_matches;

/// Tag-in-set plus optional class-vocabulary predicate over a single element
#[derive(Debug, Clone)]
pub struct ElementQuery {
    pub tags: &'static [&'static str],
    pub class: Option<Regex>,
}

impl ElementQuery {
    pub fn tags(tags: &'static [&'static str]) -> Self {
        Self { tags, class: None }
    }

    pub fn with_class(tags: &'static [&'static str], vocabulary: &str) -> Result<Self> {
        let class = Regex::new(&format!("(?i){vocabulary}"))
            .with_context(|| format!("Invalid class vocabulary {vocabulary}"))?;
        Ok(Self {
            tags,
            class: Some(class),
        })
    }

    pub fn accepts(&self, el: ElementRef<'_>) -> bool {
        let name = el.value().name();
        self.tags.iter().any(|tag| *tag == name)
            && self
                .class
                .as_ref()
                .map_or(true, |vocabulary| class_matches(el, vocabulary))
    }

    /// First descendant of `root` (excluding `root`) accepted by this query
    pub fn first_in<'a>(&self, root: ElementRef<'a>) -> Option<ElementRef<'a>> {
        root.descendants()
            .skip(1)
            .filter_map(ElementRef::wrap)
            .find(|el| self.accepts(*el))
    }
}

/// What to use as the title when no title element is found
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TitleFallback {
    /// Leading characters of the fragment text
    FragmentPrefix(usize),
    /// The search term that matched the fragment
    MatchedTerm,
}

/// Where a fragment's description comes from
#[derive(Debug, Clone)]
pub enum DescriptionSource {
    /// Text of a dedicated element; empty when the element is absent
    Element(ElementQuery, usize),
    /// The whole fragment text
    FragmentText(usize),
}

/// Where the representative link of a fragment is found
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LinkSource {
    /// The first `a[href]` inside the fragment
    FirstAnchor,
    /// The fragment itself when it is an anchor, otherwise the first `a[href]`
    SelfOrFirstAnchor,
}

/// Which configured URLs a site adapter fetches
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PageSelection {
    /// `url` only
    Landing,
    /// `search_url`, falling back to `url`
    Search,
    /// `url` followed by every extra url
    LandingAndExtras,
}

impl PageSelection {
    pub fn urls<'a>(&self, site: &'a SiteConfig) -> Vec<&'a str> {
        match self {
            PageSelection::Landing => vec![site.url.as_str()],
            PageSelection::Search => vec![site.search_or_url()],
            PageSelection::LandingAndExtras => std::iter::once(site.url.as_str())
                .chain(site.extra_urls.iter().map(String::as_str))
                .filter(|url| !url.is_empty())
                .collect(),
        }
    }
}

/// Heuristic description of what one listing looks like on a site.
///
/// A fragment is any element accepted by `fragment`; the remaining queries
/// are evaluated inside it.
#[derive(Debug, Clone)]
pub struct FragmentRule {
    pub fragment: ElementQuery,
    pub title: ElementQuery,
    pub title_fallback: TitleFallback,
    pub description: DescriptionSource,
    pub link: LinkSource,
}

/// Everything that distinguishes one site adapter from another
#[derive(Debug, Clone)]
pub struct SiteProfile {
    pub site: Site,
    pub pages: PageSelection,
    pub rule: FragmentRule,
    /// Fetch each candidate's own page to fill a missing price or phone
    pub detail_backfill: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    fn site() -> SiteConfig {
        SiteConfig {
            name: "Gun2".to_string(),
            url: "https://gun2.example/".to_string(),
            search_url: Some("https://gun2.example/search".to_string()),
            extra_urls: vec![String::new(), "https://gun2.example/glock".to_string()],
            base_url: "https://gun2.example".to_string(),
            enabled: true,
        }
    }

    #[test]
    fn test_page_selection() {
        let site = site();
        assert_eq!(PageSelection::Landing.urls(&site), vec!["https://gun2.example/"]);
        assert_eq!(PageSelection::Search.urls(&site), vec!["https://gun2.example/search"]);
        assert_eq!(
            PageSelection::LandingAndExtras.urls(&site),
            vec!["https://gun2.example/", "https://gun2.example/glock"]
        );
    }

    #[test]
    fn test_query_checks_tag_and_class() {
        let html = Html::parse_fragment(
            r#"<section id="root"><span class="x">a</span><h3 class="Post-Title">b</h3><h3>c</h3></section>"#,
        );
        let root = html
            .select(&Selector::parse("section").unwrap())
            .next()
            .unwrap();

        let titled = ElementQuery::with_class(&["h2", "h3", "span"], "title|name").unwrap();
        let found = titled.first_in(root).unwrap();
        assert_eq!(found.text().collect::<String>(), "b");

        let any_heading = ElementQuery::tags(&["h2", "h3"]);
        assert_eq!(any_heading.first_in(root).unwrap().text().collect::<String>(), "b");

        let nothing = ElementQuery::with_class(&["div"], "title").unwrap();
        assert!(nothing.first_in(root).is_none());
    }
}
