use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::SiteRegistry;
use crate::models::Listing;
use crate::scrapers::ScraperTrait;

/// Runs every enabled site's adapter in turn and merges the results
pub struct Aggregator {
    registry: Arc<SiteRegistry>,
    scrapers: Vec<Box<dyn ScraperTrait>>,
}

impl Aggregator {
    pub fn new(registry: Arc<SiteRegistry>, scrapers: Vec<Box<dyn ScraperTrait>>) -> Self {
        Self { registry, scrapers }
    }

    /// Scrape all enabled sites sequentially.
    ///
    /// Sites without an adapter are skipped; a failing adapter contributes nothing.
    pub async fn scrape_all(&self) -> Vec<Listing> {
        let enabled: Vec<_> = self.registry.enabled().collect();
        info!("📡 Scanning {} sites...", enabled.len());

        let mut all = Vec::new();
        for site in enabled {
            let Some(scraper) = self
                .scrapers
                .iter()
                .find(|s| s.site().registry_name() == site.name)
            else {
                debug!("No adapter registered for {}", site.name);
                continue;
            };

            info!("  🔍 Scanning {}...", site.name);
            match scraper.scrape().await {
                Ok(listings) if listings.is_empty() => info!("     ⚪ No results"),
                Ok(listings) => {
                    info!("     ✅ Found {} results", listings.len());
                    all.extend(listings);
                }
                Err(e) => warn!("     ❌ {} failed: {:#}", site.name, e),
            }
        }

        dedup_by_url(all)
    }
}

/// Keep the first listing for each URL, preserving order
pub fn dedup_by_url(listings: Vec<Listing>) -> Vec<Listing> {
    let mut seen = HashSet::new();
    listings
        .into_iter()
        .filter(|listing| seen.insert(listing.url.clone()))
        .collect()
}
