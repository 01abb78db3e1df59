use async_trait::async_trait;
use candlewatch_core::config::EmailConfig;
use candlewatch_core::notify::error::NotifyError;
use candlewatch_core::notify::port::Notifier;
use lettre::message::{Mailbox, Message, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};

/// # Summary
/// A notifier implementation that sends messages via SMTP (e.g., Gmail, QQ Mail).
///
/// # Invariants
/// - Addresses are parsed once at construction, so delivery only fails on transport errors.
/// - The `AsyncSmtpTransport` is reused for multiple notifications.
pub struct EmailNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
    subject: String,
}

fn parse_mailbox(raw: &str, field: &str) -> Result<Mailbox, NotifyError> {
    raw.parse()
        .map_err(|e| NotifyError::Config(format!("Invalid {} address: {}", field, e)))
}

impl EmailNotifier {
    /// # Summary
    /// Creates a new `EmailNotifier` from the email section of the config.
    ///
    /// # Logic
    /// 1. Parses the sender and recipient addresses.
    /// 2. Configures the relay transport with TLS and authentication.
    ///
    /// # Returns
    /// * A new instance of `EmailNotifier` or `NotifyError::Config`.
    pub fn new(config: &EmailConfig) -> Result<Self, NotifyError> {
        let from = parse_mailbox(&config.from, "from")?;
        let to = parse_mailbox(&config.to, "to")?;
        let creds = Credentials::new(config.user.clone(), config.pass.clone());

        // Use default submission port 587 with STARTTLS
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .map_err(|e| NotifyError::Config(format!("Invalid SMTP host: {}", e)))?
            .credentials(creds)
            .build();

        Ok(Self {
            mailer,
            from,
            to,
            subject: config.subject.clone(),
        })
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    /// # Summary
    /// Sends the text as the body of a plain-text email with the configured subject.
    async fn deliver(&self, text: &str) -> Result<(), NotifyError> {
        let email = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(self.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(text.to_string())
            .map_err(|e| NotifyError::Platform(format!("Failed to build email: {}", e)))?;

        self.mailer
            .send(email)
            .await
            .map_err(|e| NotifyError::Network(format!("SMTP error: {}", e)))?;

        Ok(())
    }
}
