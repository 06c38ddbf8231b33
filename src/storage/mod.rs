//! Storage abstractions for seen ads.
//!
//! The admission pipeline only needs keyed lookup, insert and update, so
//! [`AdStore`] is kept that narrow. [`ScanLog`] records which searches have
//! already been scanned, so a search's first pass can seed the store without
//! flooding the notifier.
//!
//! ## Backends
//!
//! - [`LocalStore`]: a single JSON document on disk, rewritten atomically
//! - [`MemoryStore`]: in-process only, for dry runs and tests

pub mod local;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::StoredAd;

// Re-export for convenience
pub use local::LocalStore;
pub use memory::MemoryStore;

/// Result of looking up an ad id.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// The id has been seen before
    Found(StoredAd),
    /// First observation of this id
    NotFound,
}

impl From<Option<StoredAd>> for Lookup {
    fn from(value: Option<StoredAd>) -> Self {
        match value {
            Some(ad) => Lookup::Found(ad),
            None => Lookup::NotFound,
        }
    }
}

/// Trait for ad storage backends.
#[async_trait]
pub trait AdStore: Send + Sync {
    /// Look up the stored record for `id`.
    async fn get(&self, id: &str) -> Result<Lookup>;

    /// Insert a record for an id that is not stored yet.
    async fn insert(&self, ad: &StoredAd) -> Result<()>;

    /// Replace the record for an id that is already stored.
    async fn update(&self, ad: &StoredAd) -> Result<()>;

    /// Number of stored ads.
    async fn count(&self) -> Result<usize>;
}

/// Summary of the last scan of one search URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRecord {
    /// When the scan finished
    pub scanned_at: DateTime<Utc>,
    /// Listings found on the search pages
    pub ads_found: usize,
}

/// Trait for remembering which searches have been scanned.
#[async_trait]
pub trait ScanLog: Send + Sync {
    /// Last scan of `url`, if any.
    async fn last_scan(&self, url: &str) -> Result<Option<SearchRecord>>;

    /// Record a finished scan of `url`.
    async fn record_scan(&self, url: &str, record: SearchRecord) -> Result<()>;

    /// All recorded searches, sorted by url.
    async fn searches(&self) -> Result<Vec<(String, SearchRecord)>>;
}
