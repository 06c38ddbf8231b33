//! adwatch CLI
//!
//! Watches classified-ad searches and announces new matches and price drops.

use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Arc;

use adwatch::{
    error::{AppError, Result},
    models::{Ad, Config, LoggingConfig},
    notify::{LogNotifier, Notifier},
    pipeline::{self, AdProcessor},
    services::ListingScraper,
    storage::{AdStore, LocalStore, MemoryStore, ScanLog},
    utils::http,
};
use clap::{Parser, Subcommand};

/// adwatch - Classified Ad Watcher
#[derive(Parser, Debug)]
#[command(
    name = "adwatch",
    version,
    about = "Watches classified-ad searches for new matches and price drops"
)]

struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "data/config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan now and then on every interval until Ctrl-C
    Run,

    /// Run a single scan pass
    Scan {
        /// Keep results in memory and log notifications instead of sending them
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate the configuration file
    Validate,

    /// Show store contents summary
    Info,

    /// Evaluate the filter for one hypothetical ad
    Check {
        /// Ad title
        #[arg(long, default_value = "")]
        title: String,

        /// Ad price
        #[arg(long)]
        price: Option<f64>,
    },
}

/// Initialize logging based on verbosity flag and the `[logging]` section.
fn init_logging(verbose: bool, logging: &LoggingConfig) -> Result<()> {
    let level = if verbose { "debug" } else { logging.level.as_str() };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level));
    builder.format_timestamp_secs();

    if let Some(path) = &logging.file {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.init();
    Ok(())
}

#[cfg(feature = "telegram")]
fn telegram_notifier(config: &Config) -> Result<Option<Arc<dyn Notifier>>> {
    use adwatch::notify::TelegramNotifier;

    match &config.telegram {
        Some(telegram) => {
            let client = http::create_async_client(&config.scraper)?;
            Ok(Some(Arc::new(TelegramNotifier::new(telegram, client))))
        }
        None => Ok(None),
    }
}

#[cfg(not(feature = "telegram"))]
fn telegram_notifier(_config: &Config) -> Result<Option<Arc<dyn Notifier>>> {
    Ok(None)
}

/// Pick the notification transport.
fn build_notifier(config: &Config, dry_run: bool) -> Result<Arc<dyn Notifier>> {
    if dry_run {
        return Ok(Arc::new(LogNotifier));
    }
    match telegram_notifier(config)? {
        Some(notifier) => Ok(notifier),
        None => {
            log::warn!("No Telegram credentials configured; notifications go to the log");
            Ok(Arc::new(LogNotifier))
        }
    }
}

/// Scan once or on schedule against the given store.
async fn watch<S>(config: &Config, store: Arc<S>, notifier: Arc<dyn Notifier>, once: bool) -> Result<()>
where
    S: AdStore + ScanLog + 'static,
{
    let client = http::create_async_client(&config.scraper)?;
    let scraper = ListingScraper::new(config.scraper.clone(), client)?;
    let processor = AdProcessor::new(store.clone(), notifier, config.filter.clone())
        .with_currency(config.currency.clone());

    if once {
        let stats = pipeline::run_scan(config, &scraper, &processor, store.as_ref()).await;
        stats.log_summary();
        log::info!("Store now holds {} ads", store.count().await?);
    } else {
        let passes = pipeline::run_scheduler(config, &scraper, &processor, store.as_ref()).await?;
        log::info!("Stopped after {} scans", passes);
    }
    Ok(())
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = Config::load(&cli.config);
    let logging = loaded
        .as_ref()
        .map(|c| c.logging.clone())
        .unwrap_or_default();
    init_logging(cli.verbose, &logging)?;

    let config = match loaded {
        Ok(config) => {
            log::info!("Loaded configuration from {}", cli.config.display());
            config
        }
        Err(e) if matches!(cli.command, Command::Validate) => {
            log::error!("Config load failed from {}: {}", cli.config.display(), e);
            return Err(e);
        }
        Err(_) => Config::load_or_default(&cli.config),
    };

    match cli.command {
        Command::Run => {
            config.validate()?;
            let store = Arc::new(LocalStore::open(&config.storage.path).await?);
            let notifier = build_notifier(&config, false)?;
            watch(&config, store, notifier, false).await?;
        }

        Command::Scan { dry_run } => {
            config.validate()?;
            let notifier = build_notifier(&config, dry_run)?;
            if dry_run {
                log::info!("Dry run: nothing will be persisted");
                watch(&config, Arc::new(MemoryStore::new()), notifier, true).await?;
            } else {
                let store = Arc::new(LocalStore::open(&config.storage.path).await?);
                watch(&config, store, notifier, true).await?;
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK ({} searches)", config.urls.len());
            log::info!(
                "    Telegram: {}",
                if config.telegram.is_some() {
                    "configured"
                } else {
                    "not configured (log only)"
                }
            );
        }

        Command::Info => {
            let store = LocalStore::open(&config.storage.path).await?;
            log::info!("Store: {}", store.path().display());
            log::info!("Stored ads: {}", store.count().await?);

            let searches = store.searches().await?;
            if searches.is_empty() {
                log::info!("No scans recorded yet.");
            }
            for (url, record) in searches {
                log::info!(
                    "    {} (last scan {}, {} ads)",
                    url,
                    record.scanned_at.format("%Y-%m-%d %H:%M:%S"),
                    record.ads_found
                );
            }
        }

        Command::Check { title, price } => {
            config.filter.validate()?;
            let ad = Ad {
                id: "check".to_string(),
                url: "check".to_string(),
                title: Some(title),
                price,
                search_term: String::new(),
                notify: false,
            };

            let validation = pipeline::validate(&ad, &config.filter);
            if validation.is_valid() {
                log::info!("✓ Ad would be admitted");
            } else {
                log::info!("Ad would be rejected:\n{}", validation.report());
                return Err(AppError::validation("ad does not match the filter"));
            }
        }
    }

    log::info!("Done!");

    Ok(())
}
