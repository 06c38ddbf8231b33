//! Notification dispatch.
//!
//! The admission pipeline treats notification as fire-and-forget: a failed
//! send is logged by the caller and never undoes a store write.

mod log_sink;
#[cfg(feature = "telegram")]
mod telegram;

use async_trait::async_trait;

use crate::error::Result;

pub use log_sink::LogNotifier;
#[cfg(feature = "telegram")]
pub use telegram::TelegramNotifier;

/// Trait for notification transports.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send `message`. `dedup_key` groups messages about the same ad.
    async fn send(&self, message: &str, dedup_key: &str) -> Result<()>;
}
