//! Telegram Bot API notifier.

use async_trait::async_trait;
use serde::Serialize;

use super::Notifier;
use crate::error::{AppError, Result};
use crate::models::TelegramConfig;

const API_BASE: &str = "https://api.telegram.org";

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    disable_web_page_preview: bool,
}

/// Sends notifications to a Telegram chat.
///
/// Every call is one `sendMessage` request. The endpoint embeds the bot
/// token, so transport errors are stripped of their URL before surfacing.
pub struct TelegramNotifier {
    client: reqwest::Client,
    endpoint: String,
    chat_id: String,
}

impl TelegramNotifier {
    /// Create a notifier for the configured bot and chat.
    pub fn new(config: &TelegramConfig, client: reqwest::Client) -> Self {
        Self::with_api_base(config, client, API_BASE)
    }

    /// Create a notifier talking to a custom Bot API host.
    pub fn with_api_base(config: &TelegramConfig, client: reqwest::Client, base: &str) -> Self {
        Self {
            client,
            endpoint: format!(
                "{}/bot{}/sendMessage",
                base.trim_end_matches('/'),
                config.token
            ),
            chat_id: config.chat_id.clone(),
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, message: &str, dedup_key: &str) -> Result<()> {
        let body = SendMessage {
            chat_id: &self.chat_id,
            text: message,
            disable_web_page_preview: false,
        };
        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Http(e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::notify(format!(
                "Telegram returned {status} for {dedup_key}: {detail}"
            )));
        }

        log::debug!("Telegram notification sent for {}", dedup_key);
        Ok(())
    }
}
