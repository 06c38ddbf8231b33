//! Utility functions and helpers.

pub mod http;

use std::sync::OnceLock;

use regex::Regex;
use url::Url;

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Extract the search term (`q` parameter) from a search URL.
pub fn search_term(url_str: &str) -> String {
    Url::parse(url_str)
        .ok()
        .and_then(|u| {
            u.query_pairs()
                .find(|(key, _)| key == "q")
                .map(|(_, value)| value.into_owned())
        })
        .unwrap_or_default()
}

/// URL of result page `page` (1-based) for a search.
///
/// Page 1 is the search URL itself; later pages set `param=page`.
pub fn page_url(search: &Url, param: &str, page: u32) -> Url {
    if page <= 1 {
        return search.clone();
    }

    let pairs: Vec<(String, String)> = search
        .query_pairs()
        .filter(|(key, _)| key != param)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut url = search.clone();
    {
        let mut query = url.query_pairs_mut();
        query.clear();
        for (key, value) in &pairs {
            query.append_pair(key, value);
        }
        query.append_pair(param, &page.to_string());
    }
    url
}

/// Extract a listing ID from its URL (trailing number, e.g. `...-1234567890`).
pub fn extract_listing_id(url: &str) -> Option<String> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    let pattern = PATTERN
        .get_or_init(|| Regex::new(r"(\d{4,})(?:\.html?)?/?(?:[?#].*)?$").ok())
        .as_ref()?;

    pattern
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Parse a scraped price such as `R$ 1.234,56`.
///
/// Everything except digits and `decimal_separator` is dropped, so currency
/// symbols and thousands separators are ignored. Returns `None` when no
/// digits remain.
pub fn parse_price(text: &str, decimal_separator: char) -> Option<f64> {
    let mut normalized = String::with_capacity(text.len());
    let mut seen_separator = false;

    for c in text.chars() {
        if c.is_ascii_digit() {
            normalized.push(c);
        } else if c == decimal_separator && !seen_separator && !normalized.is_empty() {
            normalized.push('.');
            seen_separator = true;
        }
    }

    let normalized = normalized.trim_end_matches('.');
    if normalized.is_empty() {
        return None;
    }
    normalized.parse().ok()
}
