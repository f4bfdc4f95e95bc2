//! Built-in site profiles.
//!
//! Each site is a composition of loose predicates; none of them relies on
//! exact selectors, so markup changes degrade matching instead of breaking it.

use anyhow::Result;

use crate::models::Site;

use super::fragment::CARD_DESCRIPTION_MAX_CHARS;
use super::types::{
    DescriptionSource, ElementQuery, FragmentRule, LinkSource, PageSelection, SiteProfile,
    TitleFallback,
};

const HEADINGS_OR_LINK: &[&str] = &["h2", "h3", "h4", "a"];

pub fn profile(site: Site) -> Result<SiteProfile> {
    match site {
        Site::BlueGun => bluegun(),
        Site::Gun2 => gun2(),
        Site::GunTrade => guntrade(),
        Site::Yad2 => yad2(),
        Site::Yad2Market => yad2_market(),
    }
}

fn bluegun() -> Result<SiteProfile> {
    Ok(SiteProfile {
        site: Site::BlueGun,
        pages: PageSelection::Search,
        rule: FragmentRule {
            fragment: ElementQuery::with_class(&["article", "div", "a"], "card|listing|item|product")?,
            title: ElementQuery::with_class(&["h2", "h3", "h4", "span"], "title|name")?,
            title_fallback: TitleFallback::FragmentPrefix(80),
            description: DescriptionSource::Element(
                ElementQuery::with_class(&["p", "div"], "desc|content|text")?,
                CARD_DESCRIPTION_MAX_CHARS,
            ),
            link: LinkSource::SelfOrFirstAnchor,
        },
        detail_backfill: false,
    })
}

fn gun2() -> Result<SiteProfile> {
    Ok(SiteProfile {
        site: Site::Gun2,
        pages: PageSelection::LandingAndExtras,
        rule: FragmentRule {
            fragment: ElementQuery::with_class(
                &["article", "div"],
                "card|listing|product|weapon|jet-listing",
            )?,
            title: ElementQuery::tags(HEADINGS_OR_LINK),
            title_fallback: TitleFallback::MatchedTerm,
            description: DescriptionSource::FragmentText(CARD_DESCRIPTION_MAX_CHARS),
            link: LinkSource::FirstAnchor,
        },
        detail_backfill: false,
    })
}

fn guntrade() -> Result<SiteProfile> {
    Ok(SiteProfile {
        site: Site::GunTrade,
        pages: PageSelection::Search,
        rule: FragmentRule {
            fragment: ElementQuery::with_class(&["article", "div", "li"], "post|listing|item|card|product")?,
            title: ElementQuery::tags(HEADINGS_OR_LINK),
            title_fallback: TitleFallback::MatchedTerm,
            description: DescriptionSource::FragmentText(CARD_DESCRIPTION_MAX_CHARS),
            link: LinkSource::FirstAnchor,
        },
        detail_backfill: false,
    })
}

fn yad2() -> Result<SiteProfile> {
    Ok(SiteProfile {
        site: Site::Yad2,
        pages: PageSelection::Landing,
        rule: FragmentRule {
            fragment: ElementQuery::with_class(&["div", "article"], "feed-item|product|card|item")?,
            title: ElementQuery::with_class(&["h2", "h3", "span"], "title|name")?,
            title_fallback: TitleFallback::MatchedTerm,
            description: DescriptionSource::FragmentText(CARD_DESCRIPTION_MAX_CHARS),
            link: LinkSource::FirstAnchor,
        },
        detail_backfill: true,
    })
}

fn yad2_market() -> Result<SiteProfile> {
    Ok(SiteProfile {
        site: Site::Yad2Market,
        pages: PageSelection::Search,
        rule: FragmentRule {
            fragment: ElementQuery::with_class(&["div", "article"], "product|item|card")?,
            title: ElementQuery::tags(&["h2", "h3", "span"]),
            title_fallback: TitleFallback::MatchedTerm,
            description: DescriptionSource::FragmentText(CARD_DESCRIPTION_MAX_CHARS),
            link: LinkSource::FirstAnchor,
        },
        detail_backfill: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_site_has_a_profile() {
        for site in Site::ALL {
            let profile = profile(site).unwrap();
            assert_eq!(profile.site, site);
        }
    }

    #[test]
    fn test_only_yad2_backfills() {
        let backfilling: Vec<Site> = Site::ALL
            .into_iter()
            .filter(|s| profile(*s).unwrap().detail_backfill)
            .collect();
        assert_eq!(backfilling, vec![Site::Yad2]);
    }
}
