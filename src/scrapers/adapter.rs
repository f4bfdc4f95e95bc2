use crate::config::{AppConfig, SiteRegistry};
use crate::models::{Listing, Site};
use crate::scrapers::client::PageFetcher;
use crate::scrapers::detail::{backfill, needs_detail, DetailExtractor, DetailFields};
use crate::scrapers::extract::FieldExtractor;
use crate::scrapers::fragment::{manual_check, FragmentScanner};
use crate::scrapers::matcher::KeywordMatcher;
use crate::scrapers::sites::profile;
use crate::scrapers::traits::ScraperTrait;
use crate::scrapers::types::SiteProfile;
use anyhow::Result;
use async_trait::async_trait;
use scraper::Html;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Collaborators shared by every adapter in a run
pub struct ScanContext {
    pub registry: Arc<SiteRegistry>,
    pub matcher: KeywordMatcher,
    pub fetcher: PageFetcher,
    pub fields: FieldExtractor,
    pub detail: DetailExtractor,
}

impl ScanContext {
    pub fn new(registry: Arc<SiteRegistry>, matcher: KeywordMatcher, fetcher: PageFetcher) -> Result<Self> {
        Ok(Self {
            registry,
            matcher,
            fetcher,
            fields: FieldExtractor::new()?,
            detail: DetailExtractor::new()?,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(
            Arc::new(config.sites.clone()),
            KeywordMatcher::new(config.search_terms.iter().cloned()),
            PageFetcher::new(&config.user_agent, config.request_timeout())?,
        )
    }
}

/// Result of scanning one fetched page
struct PageScan {
    listings: Vec<Listing>,
    page_matched: bool,
}

/// Profile-driven adapter used for every built-in site
pub struct SiteScraper {
    profile: SiteProfile,
    ctx: Arc<ScanContext>,
}

impl SiteScraper {
    pub fn new(profile: SiteProfile, ctx: Arc<ScanContext>) -> Self {
        Self { profile, ctx }
    }

    /// One adapter per built-in site
    pub fn all(ctx: Arc<ScanContext>) -> Result<Vec<Box<dyn ScraperTrait>>> {
        Site::ALL
            .into_iter()
            .map(|site| {
                let scraper: Box<dyn ScraperTrait> = Box::new(Self::new(profile(site)?, ctx.clone()));
                Ok(scraper)
            })
            .collect()
    }

    fn scan_page(&self, html: &str, page_url: &str, base_url: &str) -> PageScan {
        let document = Html::parse_document(html);
        let scanner = FragmentScanner {
            site: self.profile.site,
            rule: &self.profile.rule,
            matcher: &self.ctx.matcher,
            extractor: &self.ctx.fields,
        };

        let listings = scanner.scan(&document, page_url, base_url);
        let page_matched = listings.is_empty() && scanner.page_matches(&document);
        PageScan { listings, page_matched }
    }

    fn detail_fields(&self, html: &str) -> DetailFields {
        let document = Html::parse_document(html);
        self.ctx.detail.extract(&document, &self.ctx.fields)
    }

    /// Best-effort: a failed detail fetch leaves the listing as it was
    async fn enrich(&self, listing: &mut Listing) {
        match self.ctx.fetcher.fetch(&listing.url).await {
            Ok(html) => {
                let detail = self.detail_fields(&html);
                backfill(listing, detail);
            }
            Err(e) => debug!("Could not fetch detail page {}: {:#}", listing.url, e),
        }
    }
}

#[async_trait]
impl ScraperTrait for SiteScraper {
    async fn scrape(&self) -> Result<Vec<Listing>> {
        let site = self.profile.site;
        let Some(config) = self.ctx.registry.find_enabled(site.registry_name()) else {
            debug!("{} is not enabled, skipping", site);
            return Ok(Vec::new());
        };

        let mut listings: Vec<Listing> = Vec::new();

        for page_url in self.profile.pages.urls(config) {
            let html = match self.ctx.fetcher.fetch(page_url).await {
                Ok(html) => html,
                Err(e) => {
                    warn!("❌ Error scraping {} ({}): {:#}", site, page_url, e);
                    continue;
                }
            };

            let PageScan {
                listings: mut found,
                page_matched,
            } = self.scan_page(&html, page_url, &config.base_url);

            if self.profile.detail_backfill {
                for listing in found.iter_mut() {
                    let has_own_page = listing.url != config.base_url && listing.url != page_url;
                    if has_own_page && needs_detail(listing) {
                        self.enrich(listing).await;
                    }
                }
            }

            if found.is_empty() && listings.is_empty() && page_matched {
                info!("{}: page matched but no listing fragment did, flagging for manual check", site);
                found.push(manual_check(site, page_url));
            }

            listings.extend(found);
        }

        Ok(listings)
    }

    fn site(&self) -> Site {
        self.profile.site
    }
}
