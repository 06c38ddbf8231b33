// src/models/mod.rs

//! Domain models for the ad watcher.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod ad;
mod config;
mod listing;
mod selectors;

// Re-export all public types
pub use ad::{Ad, StoredAd};
pub use config::{
    Config, FilterConfig, LoggingConfig, ScraperConfig, StorageConfig, TelegramConfig,
    TELEGRAM_CHAT_ID_ENV, TELEGRAM_TOKEN_ENV,
};
pub use listing::Listing;
pub use selectors::ListingSelectors;
