pub mod adapter;
pub mod client;
pub mod detail;
pub mod extract;
pub mod fragment;
pub mod matcher;
pub mod sites;
pub mod traits;
pub mod types;

pub use adapter::{ScanContext, SiteScraper};
pub use traits::ScraperTrait;
