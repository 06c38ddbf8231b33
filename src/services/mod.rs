//! Service layer for the ad watcher.
//!
//! - `ListingScraper`: fetches search result pages and extracts listings

mod listings;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Listing;

pub use listings::ListingScraper;

/// Anything that can produce the listings of a search URL.
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Fetch every listing currently shown for `url`.
    async fn fetch_search(&self, url: &str) -> Result<Vec<Listing>>;
}
