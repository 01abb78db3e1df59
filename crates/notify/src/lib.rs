//! Notification channels implementing the core `Notifier` port.

pub mod email;
pub mod log;
pub mod telegram;

use candlewatch_core::config::{NotifyChannel, NotifyConfig};
use candlewatch_core::notify::error::NotifyError;
use candlewatch_core::notify::port::Notifier;
use std::sync::Arc;

/// # Summary
/// Builds the notifier selected by `notify.channel`.
///
/// # Returns
/// * The injectable notifier, or `NotifyError::Config` when the channel's settings are missing.
pub fn build_notifier(config: &NotifyConfig) -> Result<Arc<dyn Notifier>, NotifyError> {
    Ok(match config.channel {
        NotifyChannel::Telegram => {
            let bot_token = config
                .telegram
                .bot_token
                .clone()
                .ok_or_else(|| NotifyError::Config("TELEGRAM_BOT_TOKEN is not set".to_string()))?;
            let chat_id = config
                .telegram
                .chat_id
                .clone()
                .ok_or_else(|| NotifyError::Config("TELEGRAM_CHAT_ID is not set".to_string()))?;
            Arc::new(telegram::TelegramNotifier::new(bot_token, chat_id)?)
        }
        NotifyChannel::Email => {
            let email = config
                .email
                .as_ref()
                .ok_or_else(|| NotifyError::Config("[notify.email] section is missing".to_string()))?;
            Arc::new(email::EmailNotifier::new(email)?)
        }
        NotifyChannel::Log => Arc::new(log::LogNotifier),
    })
}
