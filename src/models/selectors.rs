// src/models/selectors.rs

//! CSS selectors for scraping a search results page.

use serde::{Deserialize, Serialize};

/// CSS selectors for scraping a search results page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingSelectors {
    /// Selector for each listing card in the results
    #[serde(default = "default_row_selector")]
    pub row_selector: String,

    /// Selector for the title element within a row
    #[serde(default = "default_title_selector")]
    pub title_selector: String,

    /// Selector for the price element within a row
    #[serde(default = "default_price_selector")]
    pub price_selector: String,

    /// Selector for the link element within a row
    #[serde(default = "default_link_selector")]
    pub link_selector: String,

    /// HTML attribute name for extracting links (usually "href")
    #[serde(default = "default_attr_name")]
    pub attr_name: String,

    /// Row attribute carrying the listing id, if the site exposes one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_attr: Option<String>,
}

fn default_row_selector() -> String {
    "section.olx-adcard".to_string()
}

fn default_title_selector() -> String {
    "h2".to_string()
}

fn default_price_selector() -> String {
    "h3.olx-adcard__price".to_string()
}

fn default_link_selector() -> String {
    "a.olx-adcard__link".to_string()
}

fn default_attr_name() -> String {
    "href".to_string()
}

impl Default for ListingSelectors {
    fn default() -> Self {
        Self {
            row_selector: default_row_selector(),
            title_selector: default_title_selector(),
            price_selector: default_price_selector(),
            link_selector: default_link_selector(),
            attr_name: default_attr_name(),
            id_attr: None,
        }
    }
}

impl ListingSelectors {
    /// All selector strings, for up-front parsing checks.
    pub fn all(&self) -> [&str; 4] {
        [
            &self.row_selector,
            &self.title_selector,
            &self.price_selector,
            &self.link_selector,
        ]
    }
}
