//! Local filesystem storage implementation.
//!
//! Keeps every seen ad in one JSON document. The document is loaded once on
//! open, held in memory behind a mutex, and rewritten atomically after each
//! mutation so the file always matches what readers observe.
//!
//! ## Document Layout
//!
//! ```text
//! {
//!   "updated_at": "2026-01-01T12:00:00Z",
//!   "ads":      { "<id>": StoredAd, ... },
//!   "searches": { "<url>": SearchRecord, ... }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::StoredAd;
use crate::storage::{AdStore, Lookup, ScanLog, SearchRecord};

/// On-disk document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    ads: BTreeMap<String, StoredAd>,
    #[serde(default)]
    searches: BTreeMap<String, SearchRecord>,
}

/// Local filesystem storage backend.
pub struct LocalStore {
    path: PathBuf,
    state: Mutex<StoreFile>,
}

impl LocalStore {
    /// Open the store at `path`, starting empty if the file doesn't exist.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let state = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No store at {}, starting empty", path.display());
                StoreFile::default()
            }
            Err(e) => return Err(AppError::Io(e)),
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp = self.path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Apply `change` to a copy of the document, persist it, then commit.
    ///
    /// The in-memory state is left untouched when the change or the write fails.
    async fn mutate<F>(&self, change: F) -> Result<()>
    where
        F: FnOnce(&mut StoreFile) -> Result<()> + Send,
    {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        change(&mut next)?;
        next.updated_at = Some(Utc::now());

        let bytes = serde_json::to_vec_pretty(&next)?;
        self.write_bytes(&bytes)
            .await
            .map_err(|e| AppError::store(format!("write {}: {e}", self.path.display())))?;

        *state = next;
        Ok(())
    }
}

#[async_trait]
impl AdStore for LocalStore {
    async fn get(&self, id: &str) -> Result<Lookup> {
        let state = self.state.lock().await;
        Ok(state.ads.get(id).cloned().into())
    }

    async fn insert(&self, ad: &StoredAd) -> Result<()> {
        self.mutate(|file| {
            if file.ads.contains_key(&ad.id) {
                return Err(AppError::store(format!("ad {} is already stored", ad.id)));
            }
            file.ads.insert(ad.id.clone(), ad.clone());
            Ok(())
        })
        .await
    }

    async fn update(&self, ad: &StoredAd) -> Result<()> {
        self.mutate(|file| match file.ads.get_mut(&ad.id) {
            Some(existing) => {
                *existing = ad.clone();
                Ok(())
            }
            None => Err(AppError::store(format!("ad {} is not stored", ad.id))),
        })
        .await
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.state.lock().await.ads.len())
    }
}

#[async_trait]
impl ScanLog for LocalStore {
    async fn last_scan(&self, url: &str) -> Result<Option<SearchRecord>> {
        Ok(self.state.lock().await.searches.get(url).cloned())
    }

    async fn record_scan(&self, url: &str, record: SearchRecord) -> Result<()> {
        self.mutate(|file| {
            file.searches.insert(url.to_string(), record);
            Ok(())
        })
        .await
    }

    async fn searches(&self) -> Result<Vec<(String, SearchRecord)>> {
        let state = self.state.lock().await;
        Ok(state
            .searches
            .iter()
            .map(|(url, record)| (url.clone(), record.clone()))
            .collect())
    }
}
