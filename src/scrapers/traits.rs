use crate::models::{Listing, Site};
use anyhow::Result;
use async_trait::async_trait;

/// Common trait for all site adapters
/// New sites only need a profile; anything that cannot be expressed as one implements this directly
#[async_trait]
pub trait ScraperTrait: Send + Sync {
    /// Scrape matching listings from the site.
    ///
    /// Implementations recover from fetch and parse failures themselves;
    /// an `Err` is treated by the aggregator as zero results from this site.
    async fn scrape(&self) -> Result<Vec<Listing>>;

    /// The site this adapter serves
    fn site(&self) -> Site;
}
