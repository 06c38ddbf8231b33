// src/pipeline/process.rs

//! Ad admission and state transitions.
//!
//! Each observation ends in exactly one [`Outcome`]:
//!
//! ```text
//! validate ──✗──► Rejected
//!    │
//!    ▼
//! lookup ──NotFound──► insert ──► New           (notify if requested)
//!    │
//!  Found ──same price──► Unchanged
//!    │
//!    └──other price──► update ──► PriceChanged  (notify only on a drop)
//! ```
//!
//! Store and notifier failures are logged here and never returned.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;

use super::validate::{Rejection, validate};
use crate::models::{Ad, FilterConfig, StoredAd};
use crate::notify::Notifier;
use crate::storage::{AdStore, Lookup};

/// Store operation that failed while processing an ad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreStage {
    Lookup,
    Insert,
    Update,
}

impl fmt::Display for StoreStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreStage::Lookup => f.write_str("lookup"),
            StoreStage::Insert => f.write_str("insert"),
            StoreStage::Update => f.write_str("update"),
        }
    }
}

/// Result of processing one observation.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Failed validation; nothing was read or written
    Rejected { reasons: Vec<Rejection> },
    /// First sighting, stored
    New { notified: bool },
    /// Seen before at the same price
    Unchanged,
    /// Seen before at another price, stored price updated
    PriceChanged {
        previous: f64,
        current: f64,
        notified: bool,
    },
    /// The store failed; processing of this ad stopped
    Failed { stage: StoreStage, message: String },
}

impl Outcome {
    /// Whether the store reflects this observation.
    pub fn is_persisted(&self) -> bool {
        matches!(
            self,
            Outcome::New { .. } | Outcome::Unchanged | Outcome::PriceChanged { .. }
        )
    }

    /// Whether a notification went out.
    pub fn notified(&self) -> bool {
        match self {
            Outcome::New { notified } | Outcome::PriceChanged { notified, .. } => *notified,
            _ => false,
        }
    }
}

/// Rounded percentage between two prices.
///
/// Only defined against a positive previous price; anything else yields 0.
pub fn drop_percentage(previous: f64, current: f64) -> u64 {
    if previous <= 0.0 {
        return 0;
    }
    let pct = ((current - previous) / previous * 100.0).abs().round();
    if pct.is_finite() { pct as u64 } else { 0 }
}

/// Admits ads into the store and announces new matches and price drops.
pub struct AdProcessor {
    store: Arc<dyn AdStore>,
    notifier: Arc<dyn Notifier>,
    filter: FilterConfig,
    currency: String,
}

impl AdProcessor {
    /// Create a processor using the default `R$` currency prefix.
    pub fn new(store: Arc<dyn AdStore>, notifier: Arc<dyn Notifier>, filter: FilterConfig) -> Self {
        Self {
            store,
            notifier,
            filter,
            currency: "R$".to_string(),
        }
    }

    /// Use `currency` as the price prefix in messages.
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn filter(&self) -> &FilterConfig {
        &self.filter
    }

    /// Process one observation. Never fails; see [`Outcome`].
    pub async fn process(&self, ad: &Ad) -> Outcome {
        let validation = validate(ad, &self.filter);
        let price = match ad.numeric_price() {
            Some(price) if validation.is_valid() => price,
            _ => {
                log::debug!(
                    "Ad {:?} is not valid due to:\n{}",
                    ad.id,
                    validation.report()
                );
                return Outcome::Rejected {
                    reasons: validation.into_reasons(),
                };
            }
        };

        match self.store.get(&ad.id).await {
            Ok(Lookup::NotFound) => self.admit_new(ad).await,
            Ok(Lookup::Found(previous)) => self.check_price_change(ad, previous, price).await,
            Err(e) => Self::store_failure(ad, StoreStage::Lookup, e),
        }
    }

    async fn admit_new(&self, ad: &Ad) -> Outcome {
        let Some(stored) = ad.to_stored(Utc::now()) else {
            // validate() already rejects non-numeric prices
            return Outcome::Rejected {
                reasons: vec![Rejection::PriceNotNumber],
            };
        };

        if let Err(e) = self.store.insert(&stored).await {
            return Self::store_failure(ad, StoreStage::Insert, e);
        }
        log::info!("Ad {} added to the store", ad.id);

        let notified = if ad.notify {
            let message = format!(
                "New ad found!\n{} - {}{}\n\n{}",
                stored.title, self.currency, stored.price, stored.url
            );
            self.dispatch(&message, &ad.id).await
        } else {
            false
        };

        Outcome::New { notified }
    }

    async fn check_price_change(&self, ad: &Ad, previous: StoredAd, price: f64) -> Outcome {
        if price == previous.price {
            return Outcome::Unchanged;
        }

        let updated = previous.with_price(price, Utc::now());
        if let Err(e) = self.store.update(&updated).await {
            return Self::store_failure(ad, StoreStage::Update, e);
        }
        log::info!(
            "Ad {} price changed from {} to {}",
            ad.id,
            previous.price,
            price
        );

        let notified = if price < previous.price {
            log::info!("This ad had a price reduction: {}", ad.url);
            let message = format!(
                "Price drop found! {}% OFF!\nFrom {cur}{} to {cur}{}\n\n{}",
                drop_percentage(previous.price, price),
                previous.price,
                price,
                ad.url,
                cur = self.currency,
            );
            self.dispatch(&message, &ad.id).await
        } else {
            false
        };

        Outcome::PriceChanged {
            previous: previous.price,
            current: price,
            notified,
        }
    }

    /// Send a message, logging instead of failing.
    async fn dispatch(&self, message: &str, dedup_key: &str) -> bool {
        match self.notifier.send(message, dedup_key).await {
            Ok(()) => true,
            Err(e) => {
                log::error!("Could not send a notification for {}: {}", dedup_key, e);
                false
            }
        }
    }

    fn store_failure(ad: &Ad, stage: StoreStage, error: crate::error::AppError) -> Outcome {
        log::error!("Store {} failed for ad {}: {}", stage, ad.id, error);
        Outcome::Failed {
            stage,
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::error::{AppError, Result};
    use crate::storage::MemoryStore;

    /// Counts writes and can be told to fail them.
    #[derive(Default)]
    struct CountingStore {
        inner: MemoryStore,
        inserts: AtomicUsize,
        updates: AtomicUsize,
        fail_lookup: bool,
        fail_writes: bool,
    }

    impl CountingStore {
        fn with_ads(ads: Vec<StoredAd>) -> Self {
            Self {
                inner: MemoryStore::with_ads(ads),
                ..Self::default()
            }
        }

        fn writes(&self) -> (usize, usize) {
            (
                self.inserts.load(Ordering::SeqCst),
                self.updates.load(Ordering::SeqCst),
            )
        }
    }

    #[async_trait]
    impl AdStore for CountingStore {
        async fn get(&self, id: &str) -> Result<Lookup> {
            if self.fail_lookup {
                return Err(AppError::store("database is locked"));
            }
            self.inner.get(id).await
        }

        async fn insert(&self, ad: &StoredAd) -> Result<()> {
            self.inserts.fetch_add(1, Ordering::SeqCst);
            if self.fail_writes {
                return Err(AppError::store("disk full"));
            }
            self.inner.insert(ad).await
        }

        async fn update(&self, ad: &StoredAd) -> Result<()> {
            self.updates.fetch_add(1, Ordering::SeqCst);
            if self.fail_writes {
                return Err(AppError::store("disk full"));
            }
            self.inner.update(ad).await
        }

        async fn count(&self) -> Result<usize> {
            self.inner.count().await
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    impl RecordingNotifier {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        fn messages(&self) -> Vec<(String, String)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, message: &str, dedup_key: &str) -> Result<()> {
            self.sent
                .lock()
                .unwrap()
                .push((message.to_string(), dedup_key.to_string()));
            if self.fail {
                return Err(AppError::notify("bot blocked"));
            }
            Ok(())
        }
    }

    fn make_ad(id: &str, price: f64, notify: bool) -> Ad {
        Ad {
            id: id.to_string(),
            url: format!("https://example.com/ad-{}", id),
            title: Some("iPhone 12 128GB".to_string()),
            price: Some(price),
            search_term: "iphone".to_string(),
            notify,
        }
    }

    fn stored(id: &str, price: f64) -> StoredAd {
        make_ad(id, price, true).to_stored(Utc::now()).unwrap()
    }

    fn processor(
        store: &Arc<CountingStore>,
        notifier: &Arc<RecordingNotifier>,
        filter: FilterConfig,
    ) -> AdProcessor {
        AdProcessor::new(store.clone(), notifier.clone(), filter)
    }

    #[tokio::test]
    async fn test_invalid_ad_touches_nothing() {
        let store = Arc::new(CountingStore {
            fail_lookup: true,
            ..CountingStore::default()
        });
        let notifier = Arc::new(RecordingNotifier::default());
        let filter = FilterConfig {
            max_price: Some(100.0),
            ..FilterConfig::default()
        };

        let outcome = processor(&store, &notifier, filter)
            .process(&make_ad("1", 100.0, true))
            .await;

        assert_eq!(
            outcome,
            Outcome::Rejected {
                reasons: vec![Rejection::PriceOutOfRange]
            }
        );
        assert!(!outcome.is_persisted());
        assert_eq!(store.writes(), (0, 0));
        assert!(notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn test_new_ad_is_inserted_and_announced_once() {
        let store = Arc::new(CountingStore::default());
        let notifier = Arc::new(RecordingNotifier::default());

        let outcome = processor(&store, &notifier, FilterConfig::default())
            .process(&make_ad("42", 1500.0, true))
            .await;

        assert_eq!(outcome, Outcome::New { notified: true });
        assert_eq!(store.writes(), (1, 0));
        assert_eq!(
            notifier.messages(),
            vec![(
                "New ad found!\niPhone 12 128GB - R$1500\n\nhttps://example.com/ad-42".to_string(),
                "42".to_string()
            )]
        );
        assert!(matches!(store.get("42").await.unwrap(), Lookup::Found(ad) if ad.price == 1500.0));
    }

    #[tokio::test]
    async fn test_new_ad_without_notify_is_silent() {
        let store = Arc::new(CountingStore::default());
        let notifier = Arc::new(RecordingNotifier::default());

        let outcome = processor(&store, &notifier, FilterConfig::default())
            .process(&make_ad("42", 1500.0, false))
            .await;

        assert_eq!(outcome, Outcome::New { notified: false });
        assert_eq!(store.writes(), (1, 0));
        assert!(notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn test_same_price_changes_nothing() {
        let store = Arc::new(CountingStore::with_ads(vec![stored("7", 100.0)]));
        let notifier = Arc::new(RecordingNotifier::default());

        let outcome = processor(&store, &notifier, FilterConfig::default())
            .process(&make_ad("7", 100.0, true))
            .await;

        assert_eq!(outcome, Outcome::Unchanged);
        assert!(outcome.is_persisted());
        assert_eq!(store.writes(), (0, 0));
        assert!(notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn test_price_drop_updates_and_notifies() {
        let store = Arc::new(CountingStore::with_ads(vec![stored("7", 100.0)]));
        let notifier = Arc::new(RecordingNotifier::default());

        let outcome = processor(&store, &notifier, FilterConfig::default())
            .process(&make_ad("7", 80.0, false))
            .await;

        assert_eq!(
            outcome,
            Outcome::PriceChanged {
                previous: 100.0,
                current: 80.0,
                notified: true
            }
        );
        assert_eq!(store.writes(), (0, 1));
        assert!(matches!(store.get("7").await.unwrap(), Lookup::Found(ad) if ad.price == 80.0));

        let messages = notifier.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].0.contains("20% OFF"));
        assert_eq!(
            messages[0].0,
            "Price drop found! 20% OFF!\nFrom R$100 to R$80\n\nhttps://example.com/ad-7"
        );
        assert_eq!(messages[0].1, "7");
    }

    #[tokio::test]
    async fn test_price_increase_updates_silently() {
        let store = Arc::new(CountingStore::with_ads(vec![stored("7", 100.0)]));
        let notifier = Arc::new(RecordingNotifier::default());

        let outcome = processor(&store, &notifier, FilterConfig::default())
            .process(&make_ad("7", 120.0, true))
            .await;

        assert_eq!(
            outcome,
            Outcome::PriceChanged {
                previous: 100.0,
                current: 120.0,
                notified: false
            }
        );
        assert_eq!(store.writes(), (0, 1));
        assert!(matches!(store.get("7").await.unwrap(), Lookup::Found(ad) if ad.price == 120.0));
        assert!(notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn test_insert_failure_is_contained() {
        let store = Arc::new(CountingStore {
            fail_writes: true,
            ..CountingStore::default()
        });
        let notifier = Arc::new(RecordingNotifier::default());

        let outcome = processor(&store, &notifier, FilterConfig::default())
            .process(&make_ad("9", 10.0, true))
            .await;

        assert!(matches!(
            outcome,
            Outcome::Failed {
                stage: StoreStage::Insert,
                ..
            }
        ));
        assert!(!outcome.is_persisted());
        assert_eq!(store.writes(), (1, 0));
        assert!(notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn test_lookup_failure_is_contained() {
        let store = Arc::new(CountingStore {
            fail_lookup: true,
            ..CountingStore::default()
        });
        let notifier = Arc::new(RecordingNotifier::default());

        let outcome = processor(&store, &notifier, FilterConfig::default())
            .process(&make_ad("9", 10.0, true))
            .await;

        match outcome {
            Outcome::Failed { stage, message } => {
                assert_eq!(stage, StoreStage::Lookup);
                assert!(message.contains("database is locked"));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(store.writes(), (0, 0));
    }

    #[tokio::test]
    async fn test_update_failure_skips_drop_notification() {
        let store = Arc::new(CountingStore {
            fail_writes: true,
            ..CountingStore::with_ads(vec![stored("3", 100.0)])
        });
        let notifier = Arc::new(RecordingNotifier::default());

        let outcome = processor(&store, &notifier, FilterConfig::default())
            .process(&make_ad("3", 50.0, true))
            .await;

        assert!(matches!(
            outcome,
            Outcome::Failed {
                stage: StoreStage::Update,
                ..
            }
        ));
        assert!(notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn test_notifier_failure_keeps_stored_ad() {
        let store = Arc::new(CountingStore::default());
        let notifier = Arc::new(RecordingNotifier::failing());

        let outcome = processor(&store, &notifier, FilterConfig::default())
            .process(&make_ad("5", 10.0, true))
            .await;

        assert_eq!(outcome, Outcome::New { notified: false });
        assert!(outcome.is_persisted());
        assert_eq!(notifier.messages().len(), 1);
        assert!(matches!(store.get("5").await.unwrap(), Lookup::Found(_)));
    }

    #[tokio::test]
    async fn test_custom_currency_in_messages() {
        let store = Arc::new(CountingStore::with_ads(vec![stored("8", 99.5)]));
        let notifier = Arc::new(RecordingNotifier::default());

        processor(&store, &notifier, FilterConfig::default())
            .with_currency("€")
            .process(&make_ad("8", 49.75, true))
            .await;

        assert_eq!(
            notifier.messages()[0].0,
            "Price drop found! 50% OFF!\nFrom €99.5 to €49.75\n\nhttps://example.com/ad-8"
        );
    }

    #[test]
    fn test_drop_percentage_rounds() {
        assert_eq!(drop_percentage(100.0, 80.0), 20);
        assert_eq!(drop_percentage(300.0, 200.0), 33);
        assert_eq!(drop_percentage(3.0, 1.0), 67);
        assert_eq!(drop_percentage(8.0, 7.0), 13);
    }

    #[test]
    fn test_drop_percentage_from_non_positive_price() {
        assert_eq!(drop_percentage(0.0, -5.0), 0);
        assert_eq!(drop_percentage(-10.0, -20.0), 0);
        assert_eq!(drop_percentage(100.0, -50.0), 150);
    }

    #[tokio::test]
    async fn test_drop_from_zero_reports_zero_percent() {
        let store = Arc::new(CountingStore::with_ads(vec![stored("9", 0.0)]));
        let notifier = Arc::new(RecordingNotifier::default());
        let processor = processor(&store, &notifier, FilterConfig::default());

        let outcome = processor.process(&make_ad("9", -5.0, true)).await;

        assert!(outcome.notified());
        let messages = notifier.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].0.starts_with("Price drop found! 0% OFF!"));
    }
}
