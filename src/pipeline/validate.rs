// src/pipeline/validate.rs

//! Ad admission criteria.
//!
//! Some rows on a results page are not ads at all (banners and other
//! content interleaved between listings) and arrive without an id, url or
//! price. Those are rejected here together with ads that miss the user's
//! price range or title keywords.

use std::fmt;

use crate::models::{Ad, FilterConfig};

/// Why an ad was not admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    PriceNotNumber,
    MissingUrl,
    MissingId,
    PriceOutOfRange,
    ExcludedWord,
    MissingRequiredWord,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Rejection::PriceNotNumber => "Price is not a number",
            Rejection::MissingUrl => "URL is not defined",
            Rejection::MissingId => "ID is not defined",
            Rejection::PriceOutOfRange => "Price is not within range",
            Rejection::ExcludedWord => "Title includes excluded words",
            Rejection::MissingRequiredWord => "Title does not contain required words",
        };
        f.write_str(message)
    }
}

/// Outcome of validating one ad.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validation {
    reasons: Vec<Rejection>,
}

impl Validation {
    /// True when every criterion passed.
    pub fn is_valid(&self) -> bool {
        self.reasons.is_empty()
    }

    /// Failed criteria, in evaluation order.
    pub fn reasons(&self) -> &[Rejection] {
        &self.reasons
    }

    /// Human-readable failure reasons.
    pub fn messages(&self) -> Vec<String> {
        self.reasons.iter().map(ToString::to_string).collect()
    }

    /// Reasons as a bulleted list, one per line.
    pub fn report(&self) -> String {
        self.reasons
            .iter()
            .map(|r| format!("- {r}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn into_reasons(self) -> Vec<Rejection> {
        self.reasons
    }
}

/// Check `ad` against the structural requirements and `filter`.
pub fn validate(ad: &Ad, filter: &FilterConfig) -> Validation {
    let mut reasons = Vec::new();
    let price = ad.numeric_price();

    if price.is_none() {
        reasons.push(Rejection::PriceNotNumber);
    }
    if ad.url.is_empty() {
        reasons.push(Rejection::MissingUrl);
    }
    if ad.id.is_empty() {
        reasons.push(Rejection::MissingId);
    }
    if let Some(price) = price {
        if !within_range(price, filter) {
            reasons.push(Rejection::PriceOutOfRange);
        }
    }

    let title = ad.title().to_lowercase();
    let excludes = keywords(&filter.title_excludes);
    let contains = keywords(&filter.title_contains);

    if excludes.iter().any(|word| title.contains(word.as_str())) {
        reasons.push(Rejection::ExcludedWord);
    }
    if !contains.is_empty() && !contains.iter().any(|word| title.contains(word.as_str())) {
        reasons.push(Rejection::MissingRequiredWord);
    }

    Validation { reasons }
}

/// Open interval check; an unset bound leaves that side unconstrained.
fn within_range(price: f64, filter: &FilterConfig) -> bool {
    filter.min_price.is_none_or(|min| price > min) && filter.max_price.is_none_or(|max| price < max)
}

/// Lowercased keywords. An empty keyword matches every title.
fn keywords(words: &[String]) -> Vec<String> {
    words.iter().map(|w| w.to_lowercase()).collect()
}
