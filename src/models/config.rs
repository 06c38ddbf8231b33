//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use scraper::Selector;
use serde::{Deserialize, Serialize};

use super::ListingSelectors;
use crate::error::{AppError, Result};

/// Environment variable overriding `telegram.token`.
pub const TELEGRAM_TOKEN_ENV: &str = "TELEGRAM_TOKEN";

/// Environment variable overriding `telegram.chat_id`.
pub const TELEGRAM_CHAT_ID_ENV: &str = "TELEGRAM_CHAT_ID";

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Search result URLs to watch
    #[serde(default)]
    pub urls: Vec<String>,

    /// Seconds between scan passes
    #[serde(default = "defaults::interval")]
    pub interval_secs: u64,

    /// Prefix printed before prices in notifications
    #[serde(default = "defaults::currency")]
    pub currency: String,

    /// Admission criteria
    #[serde(default)]
    pub filter: FilterConfig,

    /// HTTP and scraping behavior settings
    #[serde(default)]
    pub scraper: ScraperConfig,

    /// Telegram credentials; absent means log-only notifications
    #[serde(default)]
    pub telegram: Option<TelegramConfig>,

    /// Where seen ads are persisted
    #[serde(default)]
    pub storage: StorageConfig,

    /// Log verbosity
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;
        config.apply_env();
        Ok(config)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            let mut config = Self::default();
            config.apply_env();
            config
        })
    }

    /// Fill Telegram credentials from the environment when both are set.
    pub fn apply_env(&mut self) {
        let token = std::env::var(TELEGRAM_TOKEN_ENV).ok();
        let chat_id = std::env::var(TELEGRAM_CHAT_ID_ENV).ok();
        self.apply_telegram_overrides(token, chat_id);
    }

    fn apply_telegram_overrides(&mut self, token: Option<String>, chat_id: Option<String>) {
        let token = token.filter(|t| !t.trim().is_empty());
        let chat_id = chat_id.filter(|c| !c.trim().is_empty());

        match (&mut self.telegram, token, chat_id) {
            (Some(telegram), token, chat_id) => {
                if let Some(token) = token {
                    telegram.token = token;
                }
                if let Some(chat_id) = chat_id {
                    telegram.chat_id = chat_id;
                }
            }
            (None, Some(token), Some(chat_id)) => {
                self.telegram = Some(TelegramConfig { token, chat_id });
            }
            _ => {}
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.urls.is_empty() {
            return Err(AppError::validation("No search urls defined"));
        }
        for url in &self.urls {
            url::Url::parse(url)
                .map_err(|e| AppError::validation(format!("Invalid search url '{url}': {e}")))?;
        }
        if self.interval_secs == 0 {
            return Err(AppError::validation("interval_secs must be > 0"));
        }
        self.filter.validate()?;
        self.scraper.validate()?;
        if let Some(telegram) = &self.telegram {
            if telegram.token.trim().is_empty() || telegram.chat_id.trim().is_empty() {
                return Err(AppError::validation(
                    "telegram.token and telegram.chat_id must both be set",
                ));
            }
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            urls: Vec::new(),
            interval_secs: defaults::interval(),
            currency: defaults::currency(),
            filter: FilterConfig::default(),
            scraper: ScraperConfig::default(),
            telegram: None,
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Admission criteria applied to every ad.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Exclusive lower price bound
    #[serde(default)]
    pub min_price: Option<f64>,

    /// Exclusive upper price bound
    #[serde(default)]
    pub max_price: Option<f64>,

    /// Case-insensitive substrings, at least one must appear in the title
    #[serde(default)]
    pub title_contains: Vec<String>,

    /// Case-insensitive substrings, none may appear in the title
    #[serde(default)]
    pub title_excludes: Vec<String>,
}

impl FilterConfig {
    /// Validate the price bounds and keyword lists.
    pub fn validate(&self) -> Result<()> {
        for (name, words) in [
            ("title_contains", &self.title_contains),
            ("title_excludes", &self.title_excludes),
        ] {
            if let Some(index) = words.iter().position(|w| w.trim().is_empty()) {
                return Err(AppError::validation(format!(
                    "filter.{name}[{index}] is blank and would match every title"
                )));
            }
        }
        for (name, bound) in [("min_price", self.min_price), ("max_price", self.max_price)] {
            if let Some(value) = bound {
                if !value.is_finite() {
                    return Err(AppError::validation(format!(
                        "filter.{name} must be a finite number"
                    )));
                }
            }
        }
        if let (Some(min), Some(max)) = (self.min_price, self.max_price) {
            if min >= max {
                return Err(AppError::validation(format!(
                    "filter.min_price ({min}) must be below filter.max_price ({max})"
                )));
            }
        }
        Ok(())
    }
}

/// HTTP client and scraping behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Delay between page requests in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// Maximum concurrently fetched searches
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// Result pages fetched per search
    #[serde(default = "defaults::max_pages")]
    pub max_pages: u32,

    /// Query parameter selecting the result page
    #[serde(default = "defaults::page_param")]
    pub page_param: String,

    /// Decimal separator used in scraped prices
    #[serde(default = "defaults::decimal_separator")]
    pub decimal_separator: char,

    /// Listing card selectors
    #[serde(default)]
    pub selectors: ListingSelectors,
}

impl ScraperConfig {
    /// Validate scraper settings and selector syntax.
    pub fn validate(&self) -> Result<()> {
        if self.user_agent.trim().is_empty() {
            return Err(AppError::validation("scraper.user_agent is empty"));
        }
        if self.timeout_secs == 0 {
            return Err(AppError::validation("scraper.timeout_secs must be > 0"));
        }
        if self.max_concurrent == 0 {
            return Err(AppError::validation("scraper.max_concurrent must be > 0"));
        }
        if self.max_pages == 0 {
            return Err(AppError::validation("scraper.max_pages must be > 0"));
        }
        if self.page_param.trim().is_empty() {
            return Err(AppError::validation("scraper.page_param is empty"));
        }
        for selector in self.selectors.all() {
            Selector::parse(selector).map_err(|e| AppError::selector(selector, format!("{e:?}")))?;
        }
        Ok(())
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            request_delay_ms: defaults::request_delay(),
            max_concurrent: defaults::max_concurrent(),
            max_pages: defaults::max_pages(),
            page_param: defaults::page_param(),
            decimal_separator: defaults::decimal_separator(),
            selectors: ListingSelectors::default(),
        }
    }
}

/// Telegram Bot API credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub token: String,
    pub chat_id: String,
}

/// Persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path of the JSON ad store
    #[serde(default = "defaults::store_path")]
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: defaults::store_path(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is unset
    #[serde(default = "defaults::log_level")]
    pub level: String,

    /// Append log lines to this file instead of stderr
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
            file: None,
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    pub fn interval() -> u64 {
        300
    }
    pub fn currency() -> String {
        "R$".into()
    }

    // Scraper defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; adwatch/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn request_delay() -> u64 {
        500
    }
    pub fn max_concurrent() -> usize {
        2
    }
    pub fn max_pages() -> u32 {
        5
    }
    pub fn page_param() -> String {
        "o".into()
    }
    pub fn decimal_separator() -> char {
        ','
    }

    pub fn store_path() -> PathBuf {
        PathBuf::from("data/ads.json")
    }
    pub fn log_level() -> String {
        "info".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn watch_config() -> Config {
        Config {
            urls: vec!["https://www.olx.com.br/celulares?q=iphone".to_string()],
            ..Config::default()
        }
    }

    #[test]
    fn validate_default_with_url_ok() {
        assert!(watch_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_missing_urls() {
        assert!(Config::default().validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_interval() {
        let mut config = watch_config();
        config.interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_inverted_bounds() {
        let mut config = watch_config();
        config.filter.min_price = Some(500.0);
        config.filter.max_price = Some(500.0);
        assert!(config.validate().is_err());

        config.filter.max_price = Some(1000.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_blank_keywords() {
        let mut config = watch_config();
        config.filter.title_excludes = vec!["broken".to_string(), "".to_string()];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("filter.title_excludes[1]"));

        config.filter.title_excludes = vec!["broken".to_string()];
        config.filter.title_contains = vec!["  ".to_string()];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("filter.title_contains[0]"));

        config.filter.title_contains = vec!["iphone".to_string()];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_selector() {
        let mut config = watch_config();
        config.scraper.selectors.row_selector = "[[invalid".to_string();
        assert!(matches!(
            config.validate(),
            Err(AppError::Selector { .. })
        ));
    }

    #[test]
    fn parse_toml_with_defaults() {
        let config: Config = toml::from_str(
            r#"
            urls = ["https://example.com/search?q=bike"]
            interval_secs = 60

            [filter]
            max_price = 1500
            title_excludes = ["broken"]
            "#,
        )
        .unwrap();

        assert_eq!(config.interval_secs, 60);
        assert_eq!(config.filter.min_price, None);
        assert_eq!(config.filter.max_price, Some(1500.0));
        assert_eq!(config.filter.title_excludes, vec!["broken"]);
        assert_eq!(config.scraper.page_param, "o");
        assert_eq!(config.storage.path, PathBuf::from("data/ads.json"));
        assert!(config.telegram.is_none());
        assert!(config.logging.file.is_none());
    }

    #[test]
    fn parse_logging_file() {
        let config: Config = toml::from_str(
            r#"
            urls = ["https://example.com/search?q=bike"]

            [logging]
            level = "debug"
            file = "data/adwatch.log"
            "#,
        )
        .unwrap();

        assert_eq!(config.logging.level, "debug");
        assert_eq!(
            config.logging.file.as_deref(),
            Some(Path::new("data/adwatch.log"))
        );
    }

    #[test]
    fn telegram_overrides_need_both_values_to_create() {
        let mut config = watch_config();
        config.apply_telegram_overrides(Some("token".into()), None);
        assert!(config.telegram.is_none());

        config.apply_telegram_overrides(Some("token".into()), Some("42".into()));
        let telegram = config.telegram.as_ref().unwrap();
        assert_eq!(telegram.token, "token");
        assert_eq!(telegram.chat_id, "42");
    }

    #[test]
    fn telegram_overrides_replace_file_values() {
        let mut config = watch_config();
        config.telegram = Some(TelegramConfig {
            token: "file-token".into(),
            chat_id: "1".into(),
        });
        config.apply_telegram_overrides(Some("env-token".into()), Some("  ".into()));

        let telegram = config.telegram.as_ref().unwrap();
        assert_eq!(telegram.token, "env-token");
        assert_eq!(telegram.chat_id, "1");
    }
}
