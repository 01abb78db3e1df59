use async_trait::async_trait;
use candlewatch_core::notify::error::NotifyError;
use candlewatch_core::notify::port::Notifier;
use tracing::info;

/// # Summary
/// A notifier that only writes messages to the tracing log.
///
/// Useful for dry runs where no external channel is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn deliver(&self, text: &str) -> Result<(), NotifyError> {
        info!(target: "candlewatch::alert", "{}", text);
        Ok(())
    }
}
