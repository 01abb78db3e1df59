use async_trait::async_trait;
use candlewatch_core::notify::error::NotifyError;
use candlewatch_core::notify::port::Notifier;
use serde::Serialize;
use std::time::Duration;

/// Hard limit of the Bot API for a single `sendMessage` text.
pub const TELEGRAM_MAX_MESSAGE_LEN: usize = 4096;

/// # Summary
/// A notifier implementation that sends messages via Telegram Bot API.
///
/// # Invariants
/// * `bot_token` must be valid.
/// * `chat_id` must be accessible by the bot.
/// * Messages are sent as plain text, so symbols such as `ETH_USDT` are never parsed as markup.
pub struct TelegramNotifier {
    /// The Bot API token.
    bot_token: String,
    /// The target Chat ID.
    chat_id: String,
    /// The HTTP client used for requests.
    client: reqwest::Client,
}

/// # Summary
/// Payload structure for Telegram `sendMessage` API.
#[derive(Serialize)]
struct TelegramMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    disable_web_page_preview: bool,
}

impl TelegramNotifier {
    /// # Summary
    /// Creates a new `TelegramNotifier`.
    ///
    /// # Logic
    /// Rejects empty credentials, then builds an HTTP client with a request timeout.
    ///
    /// # Arguments
    /// * `bot_token` - The Telegram Bot API token.
    /// * `chat_id` - The target chat ID to send messages to.
    ///
    /// # Returns
    /// * A new instance of `TelegramNotifier` or `NotifyError::Config`.
    pub fn new(bot_token: String, chat_id: String) -> Result<Self, NotifyError> {
        if bot_token.trim().is_empty() || chat_id.trim().is_empty() {
            return Err(NotifyError::Config(
                "Telegram bot token and chat id are required".to_string(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| NotifyError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            bot_token,
            chat_id,
            client,
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    /// # Summary
    /// Sends a plain-text message to the configured Telegram chat.
    ///
    /// # Logic
    /// 1. Constructs the Telegram API URL.
    /// 2. Sends a POST request with the text as-is.
    /// 3. Checks the response status and returns success or failure.
    ///
    /// # Returns
    /// * `Ok(())` if the message was sent successfully.
    /// * `Err(NotifyError)` if a network error occurs or the API returns a non-success status.
    async fn deliver(&self, text: &str) -> Result<(), NotifyError> {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);
        let payload = TelegramMessage {
            chat_id: &self.chat_id,
            text,
            disable_web_page_preview: true,
        };

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            // reqwest includes the URL in its error text, which would leak the token
            .map_err(|e| NotifyError::Network(e.without_url().to_string()))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(NotifyError::Platform(format!(
                "Telegram API error: {}",
                error_text
            )));
        }

        Ok(())
    }

    fn max_message_len(&self) -> Option<usize> {
        Some(TELEGRAM_MAX_MESSAGE_LEN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_is_plain_text() {
        let payload = TelegramMessage {
            chat_id: "42",
            text: "ETH_USDT 1h candle dropped by 2.00% (price 98)",
            disable_web_page_preview: true,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["chat_id"], "42");
        assert!(json.get("parse_mode").is_none());
    }

    #[test]
    fn test_rejects_missing_credentials() {
        assert!(matches!(
            TelegramNotifier::new(String::new(), "42".to_string()),
            Err(NotifyError::Config(_))
        ));
    }
}
