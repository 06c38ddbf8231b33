// src/pipeline/scan.rs

//! One scan pass over every watched search.

use chrono::Utc;
use futures::stream::{self, StreamExt};

use super::process::{AdProcessor, Outcome};
use crate::models::Config;
use crate::services::ListingSource;
use crate::storage::{ScanLog, SearchRecord};
use crate::utils::search_term;

/// Tally of one scan pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub searches: usize,
    pub search_failures: usize,
    pub found: usize,
    pub rejected: usize,
    pub new: usize,
    pub unchanged: usize,
    pub price_changed: usize,
    pub failed: usize,
    pub notified: usize,
}

impl ScanStats {
    /// Count one processed ad.
    pub fn record(&mut self, outcome: &Outcome) {
        self.found += 1;
        match outcome {
            Outcome::Rejected { .. } => self.rejected += 1,
            Outcome::New { .. } => self.new += 1,
            Outcome::Unchanged => self.unchanged += 1,
            Outcome::PriceChanged { .. } => self.price_changed += 1,
            Outcome::Failed { .. } => self.failed += 1,
        }
        if outcome.notified() {
            self.notified += 1;
        }
    }

    /// Log the tally at info level.
    pub fn log_summary(&self) {
        log::info!(
            "Scan complete: {} searches ({} failed), {} ads found",
            self.searches,
            self.search_failures,
            self.found
        );
        log::info!(
            "    new: {}, price changes: {}, unchanged: {}, rejected: {}, store failures: {}, notifications: {}",
            self.new,
            self.price_changed,
            self.unchanged,
            self.rejected,
            self.failed,
            self.notified
        );
    }
}

/// Scan every search in `config.urls` once.
///
/// Pages are fetched concurrently, but ads are processed one at a time so
/// lookups and writes for the same id never interleave. The first scan of
/// a search stores its ads without notifying.
pub async fn run_scan(
    config: &Config,
    source: &dyn ListingSource,
    processor: &AdProcessor,
    scan_log: &dyn ScanLog,
) -> ScanStats {
    let concurrency = config.scraper.max_concurrent.max(1);
    let mut stats = ScanStats {
        searches: config.urls.len(),
        ..ScanStats::default()
    };

    let mut fetches = stream::iter(config.urls.iter())
        .map(|url| async move { (url, source.fetch_search(url).await) })
        .buffer_unordered(concurrency);

    while let Some((url, result)) = fetches.next().await {
        let listings = match result {
            Ok(listings) => listings,
            Err(error) => {
                stats.search_failures += 1;
                log::warn!("Failed to fetch search {}: {}", url, error);
                continue;
            }
        };

        let notify = match scan_log.last_scan(url).await {
            Ok(Some(_)) => true,
            Ok(None) => {
                log::info!("First scan of {}, storing ads without notifications", url);
                false
            }
            Err(error) => {
                log::error!("Could not read scan log for {}: {}", url, error);
                false
            }
        };

        let term = search_term(url);
        let ads_found = listings.len();
        log::info!("{} ads found for {}", ads_found, url);

        for listing in listings {
            let ad = listing.into_ad(&term, notify);
            let outcome = processor.process(&ad).await;
            stats.record(&outcome);
        }

        let record = SearchRecord {
            scanned_at: Utc::now(),
            ads_found,
        };
        if let Err(error) = scan_log.record_scan(url, record).await {
            log::error!("Could not record scan of {}: {}", url, error);
        }
    }

    stats
}
