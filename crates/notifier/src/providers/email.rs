//! Email channel over SMTP.

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use courier_common::config::SmtpConfig;
use courier_common::types::Contacts;

use super::{ChannelProvider, ProviderError, present};

const DEFAULT_SUBJECT: &str = "Notification";

/// Delivers plain-text mail through an authenticated SMTP session.
pub struct EmailProvider {
    config: SmtpConfig,
    timeout: Duration,
}

impl EmailProvider {
    pub fn new(config: SmtpConfig, timeout: Duration) -> Self {
        Self { config, timeout }
    }

    fn build_message(
        from: &str,
        to: &str,
        subject: Option<&str>,
        body: &str,
    ) -> Result<Message, ProviderError> {
        let from: Mailbox = from
            .parse()
            .map_err(|e| ProviderError::NotConfigured(format!("Invalid sender address: {e}")))?;
        let to: Mailbox = to
            .parse()
            .map_err(|e| ProviderError::InvalidRecipient(format!("Invalid recipient email: {e}")))?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(subject.unwrap_or(DEFAULT_SUBJECT))
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| ProviderError::Transport(format!("Failed to build email: {e}")))
    }
}

#[async_trait]
impl ChannelProvider for EmailProvider {
    async fn send(
        &self,
        contacts: &Contacts,
        subject: Option<&str>,
        message: &str,
    ) -> Result<(), ProviderError> {
        let (Some(host), Some(username), Some(password)) = (
            self.config.host.as_deref(),
            self.config.username.as_deref(),
            self.config.password.as_deref(),
        ) else {
            return Err(ProviderError::NotConfigured(
                "SMTP not configured".to_string(),
            ));
        };
        let Some(recipient) = present(&contacts.email) else {
            return Err(ProviderError::InvalidRecipient(
                "Recipient email is missing".to_string(),
            ));
        };

        let from = self.config.from.as_deref().unwrap_or(username);
        let email = Self::build_message(from, recipient, subject, message)?;

        tracing::debug!(
            host,
            port = self.config.port,
            tls = self.config.use_tls,
            "Connecting to SMTP server"
        );

        let builder = if self.config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .map_err(|e| ProviderError::Transport(format!("SMTP TLS setup failed: {e}")))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
        };
        let mailer = builder
            .port(self.config.port)
            .credentials(Credentials::new(username.to_string(), password.to_string()))
            .timeout(Some(self.timeout))
            .build();

        mailer
            .send(email)
            .await
            .map_err(|e| ProviderError::Transport(format!("SMTP error: {e}")))?;

        Ok(())
    }
}
