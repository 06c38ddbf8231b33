// src/services/listings.rs

//! Search results scraper.
//!
//! Walks the result pages of a search using the configured CSS selectors.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::ListingSource;
use crate::error::{AppError, Result};
use crate::models::{Listing, ScraperConfig};
use crate::utils::{extract_listing_id, http, page_url, parse_price, resolve_url};

/// Pre-parsed listing selectors.
struct RowSelectors {
    row: Selector,
    title: Selector,
    price: Selector,
    link: Selector,
}

/// Service for scraping listings from search result pages.
pub struct ListingScraper {
    config: ScraperConfig,
    client: Client,
    selectors: RowSelectors,
}

impl ListingScraper {
    /// Create a scraper, failing if any selector doesn't parse.
    pub fn new(config: ScraperConfig, client: Client) -> Result<Self> {
        let selectors = RowSelectors {
            row: Self::parse_selector(&config.selectors.row_selector)?,
            title: Self::parse_selector(&config.selectors.title_selector)?,
            price: Self::parse_selector(&config.selectors.price_selector)?,
            link: Self::parse_selector(&config.selectors.link_selector)?,
        };

        Ok(Self {
            config,
            client,
            selectors,
        })
    }

    /// Extract listings from one result page.
    pub fn parse_page(&self, html: &str, page_url: &Url) -> Vec<Listing> {
        let document = Html::parse_document(html);
        document
            .select(&self.selectors.row)
            .map(|row| self.parse_row(&row, page_url))
            .collect()
    }

    fn parse_row(&self, row: &ElementRef, base_url: &Url) -> Listing {
        let title_elem = row.select(&self.selectors.title).next();
        let title = title_elem
            .map(|el| normalize_whitespace(&el.text().collect::<String>()))
            .filter(|t| !t.is_empty());

        let raw_price = row
            .select(&self.selectors.price)
            .next()
            .map(|el| normalize_whitespace(&el.text().collect::<String>()))
            .unwrap_or_default();
        let price = parse_price(&raw_price, self.config.decimal_separator);

        let attr_name = &self.config.selectors.attr_name;
        let raw_link = row
            .select(&self.selectors.link)
            .next()
            .or(title_elem)
            .and_then(|el| el.value().attr(attr_name))
            .or_else(|| row.value().attr(attr_name))
            .unwrap_or("")
            .trim();
        let url = if raw_link.is_empty() {
            String::new()
        } else {
            resolve_url(base_url, raw_link)
        };

        let id = self
            .config
            .selectors
            .id_attr
            .as_deref()
            .and_then(|attr| row.value().attr(attr))
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .or_else(|| extract_listing_id(&url))
            .unwrap_or_default();

        Listing {
            id,
            url,
            title,
            raw_price,
            price,
        }
    }

    fn parse_selector(s: &str) -> Result<Selector> {
        Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
    }
}

#[async_trait]
impl ListingSource for ListingScraper {
    async fn fetch_search(&self, url: &str) -> Result<Vec<Listing>> {
        let search = Url::parse(url)?;
        let delay = Duration::from_millis(self.config.request_delay_ms);
        let mut seen = HashSet::new();
        let mut listings = Vec::new();

        for page in 1..=self.config.max_pages {
            if page > 1 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let target = page_url(&search, &self.config.page_param, page);
            let html = http::fetch_text(&self.client, target.as_str()).await?;
            let rows = self.parse_page(&html, &target);
            log::debug!("{} rows on page {} of {}", rows.len(), page, url);

            if rows.is_empty() {
                break;
            }
            for listing in rows {
                // Rows without an id are kept so validation can report them.
                if listing.id.is_empty() || seen.insert(listing.id.clone()) {
                    listings.push(listing);
                }
            }
        }

        Ok(listings)
    }
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
