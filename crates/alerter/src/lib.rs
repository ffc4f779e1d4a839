use crate::error::AlerterError;
use async_trait::async_trait;
use configuration::TelegramConfig;
use reqwest::Client;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub mod error;
pub mod format;

pub use format::{
    escape_markdown, format_failure, format_signal_alert, format_trade_confirmation,
    summarize_error,
};

/// Upper bound for a single Telegram API call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Delivers finished alert text to a chat channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_message(&self, message: &str) -> Result<(), AlerterError>;
}

/// The JSON payload for the Telegram `sendMessage` endpoint.
#[derive(Debug, Serialize)]
struct SendMessagePayload<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str, // To allow for formatting like bold, italics etc.
}

/// A client for sending messages to the Telegram Bot API.
pub struct TelegramAlerter {
    client: Client,
    token: String,
    chat_id: String,
}

impl TelegramAlerter {
    /// Creates a new `TelegramAlerter`.
    ///
    /// Returns `None` if the token or chat_id is missing from the configuration,
    /// allowing the system to gracefully disable alerting.
    pub fn new(config: &TelegramConfig) -> Option<Self> {
        if config.token.is_empty() || config.chat_id.is_empty() {
            tracing::warn!("Telegram alerter is not configured (missing token or chat_id).");
            return None;
        }
        Some(Self {
            client: Client::new(),
            token: config.token.clone(),
            chat_id: config.chat_id.clone(),
        })
    }
}

#[async_trait]
impl Notifier for TelegramAlerter {
    /// Sends a text message to the configured Telegram chat.
    async fn send_message(&self, message: &str) -> Result<(), AlerterError> {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.token);

        let payload = SendMessagePayload {
            chat_id: &self.chat_id,
            text: message,
            parse_mode: "MarkdownV2", // Use Markdown for rich formatting
        };

        let response = self
            .client
            .post(&url)
            .timeout(REQUEST_TIMEOUT)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to decode error response".to_string());
            return Err(AlerterError::ApiError(error_text));
        }

        Ok(())
    }
}

/// Writes alerts to the log instead of a chat. Used when Telegram is not configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_message(&self, message: &str) -> Result<(), AlerterError> {
        tracing::info!(target: "alerts", "{}", message);
        Ok(())
    }
}

/// Keeps every message in memory. Backs dry runs.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    messages: Mutex<Vec<String>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn send_message(&self, message: &str) -> Result<(), AlerterError> {
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(message.to_string());
        Ok(())
    }
}

/// Picks Telegram when credentials are present, otherwise falls back to logging.
pub fn notifier_from_config(config: &TelegramConfig) -> Arc<dyn Notifier> {
    match TelegramAlerter::new(config) {
        Some(alerter) => Arc::new(alerter),
        None => Arc::new(LogNotifier),
    }
}
