//! Raw listing rows as extracted from a search results page.

use serde::{Deserialize, Serialize};

use super::Ad;

/// A listing row scraped from a search page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    /// Listing identifier (may be empty if none could be extracted)
    pub id: String,

    /// Absolute link to the listing
    pub url: String,

    /// Title text, if the row had one
    pub title: Option<String>,

    /// Price text exactly as scraped
    pub raw_price: String,

    /// Parsed price
    pub price: Option<f64>,
}

impl Listing {
    /// Turn this row into an [`Ad`] observation for the given search.
    pub fn into_ad(self, search_term: &str, notify: bool) -> Ad {
        Ad {
            id: self.id,
            url: self.url,
            title: self.title,
            price: self.price,
            search_term: search_term.to_string(),
            notify,
        }
    }
}
