use async_trait::async_trait;

use super::Notifier;
use crate::error::Result;

/// Notifier that writes messages to the log instead of sending them.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: &str, dedup_key: &str) -> Result<()> {
        log::info!("[notify {}] {}", dedup_key, message.replace('\n', " | "));
        Ok(())
    }
}
