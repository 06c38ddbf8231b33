//! In-memory storage, used for dry runs and tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::StoredAd;
use crate::storage::{AdStore, Lookup, ScanLog, SearchRecord};

/// Store that forgets everything when dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    ads: Mutex<BTreeMap<String, StoredAd>>,
    searches: Mutex<BTreeMap<String, SearchRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `ads`.
    pub fn with_ads(ads: impl IntoIterator<Item = StoredAd>) -> Self {
        let ads = ads.into_iter().map(|ad| (ad.id.clone(), ad)).collect();
        Self {
            ads: Mutex::new(ads),
            searches: Mutex::default(),
        }
    }
}

#[async_trait]
impl AdStore for MemoryStore {
    async fn get(&self, id: &str) -> Result<Lookup> {
        Ok(self.ads.lock().await.get(id).cloned().into())
    }

    async fn insert(&self, ad: &StoredAd) -> Result<()> {
        let mut ads = self.ads.lock().await;
        if ads.contains_key(&ad.id) {
            return Err(AppError::store(format!("ad {} is already stored", ad.id)));
        }
        ads.insert(ad.id.clone(), ad.clone());
        Ok(())
    }

    async fn update(&self, ad: &StoredAd) -> Result<()> {
        match self.ads.lock().await.get_mut(&ad.id) {
            Some(existing) => {
                *existing = ad.clone();
                Ok(())
            }
            None => Err(AppError::store(format!("ad {} is not stored", ad.id))),
        }
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.ads.lock().await.len())
    }
}

#[async_trait]
impl ScanLog for MemoryStore {
    async fn last_scan(&self, url: &str) -> Result<Option<SearchRecord>> {
        Ok(self.searches.lock().await.get(url).cloned())
    }

    async fn record_scan(&self, url: &str, record: SearchRecord) -> Result<()> {
        self.searches.lock().await.insert(url.to_string(), record);
        Ok(())
    }

    async fn searches(&self) -> Result<Vec<(String, SearchRecord)>> {
        Ok(self
            .searches
            .lock()
            .await
            .iter()
            .map(|(url, record)| (url.clone(), record.clone()))
            .collect())
    }
}
