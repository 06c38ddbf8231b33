//! Ad observation and persisted ad records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One scraped listing observation, ready for admission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ad {
    /// Stable listing identifier, the dedup key
    pub id: String,

    /// Link to the listing
    pub url: String,

    /// Display title (absent titles are treated as empty)
    #[serde(default)]
    pub title: Option<String>,

    /// Parsed price, `None` when the scraped text was not a number
    #[serde(default)]
    pub price: Option<f64>,

    /// Query that produced this observation
    #[serde(default)]
    pub search_term: String,

    /// Whether a new match from this search should be announced
    #[serde(default)]
    pub notify: bool,
}

impl Ad {
    /// Title text, empty when the listing had none.
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or("")
    }

    /// Price as a well-formed number.
    pub fn numeric_price(&self) -> Option<f64> {
        self.price.filter(|p| p.is_finite())
    }

    /// Build the persisted record for this observation.
    ///
    /// Returns `None` if the price is not numeric.
    pub fn to_stored(&self, now: DateTime<Utc>) -> Option<StoredAd> {
        let price = self.numeric_price()?;
        Some(StoredAd {
            id: self.id.clone(),
            url: self.url.clone(),
            title: self.title().to_string(),
            price,
            search_term: self.search_term.clone(),
            notify: self.notify,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Persisted form of an [`Ad`], one per distinct id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAd {
    pub id: String,
    pub url: String,
    pub title: String,
    pub price: f64,
    pub search_term: String,
    pub notify: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredAd {
    /// Copy of this record carrying a new price.
    pub fn with_price(&self, price: f64, now: DateTime<Utc>) -> Self {
        Self {
            price,
            updated_at: now,
            ..self.clone()
        }
    }
}
