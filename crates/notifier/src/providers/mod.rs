//! Channel provider integrations.
//!
//! Each provider wraps one external transport behind the same `send` contract.
//! Failures are classified so the orchestrator can decide between retrying the
//! channel, skipping it, or falling back to the next one.

pub mod email;
pub mod sms;
pub mod telegram;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use courier_common::config::AppConfig;
use courier_common::types::{Channel, Contacts};

pub use email::EmailProvider;
pub use sms::SmsProvider;
pub use telegram::TelegramProvider;

/// Marker appended to bodies cut down to a channel's length limit.
pub const TRUNCATION_MARKER: &str = "...";

/// Classified provider failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// Channel credentials/settings are absent.
    #[error("{0}")]
    NotConfigured(String),

    /// The contact field this channel needs is missing or unusable.
    #[error("{0}")]
    InvalidRecipient(String),

    /// Connection, authentication or remote rejection while sending.
    #[error("{0}")]
    Transport(String),
}

impl ProviderError {
    /// Only transport failures are worth another attempt on the same channel.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderError::Transport(_))
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        // Gateway URLs can embed credentials (the Telegram bot token).
        ProviderError::Transport(err.without_url().to_string())
    }
}

/// Uniform send capability shared by every channel.
#[async_trait]
pub trait ChannelProvider: Send + Sync {
    async fn send(
        &self,
        contacts: &Contacts,
        subject: Option<&str>,
        message: &str,
    ) -> Result<(), ProviderError>;
}

/// Closed set of channel integrations.
pub enum Provider {
    Email(EmailProvider),
    Sms(SmsProvider),
    Telegram(TelegramProvider),
}

impl Provider {
    pub fn channel(&self) -> Channel {
        match self {
            Provider::Email(_) => Channel::Email,
            Provider::Sms(_) => Channel::Sms,
            Provider::Telegram(_) => Channel::Telegram,
        }
    }
}

#[async_trait]
impl ChannelProvider for Provider {
    async fn send(
        &self,
        contacts: &Contacts,
        subject: Option<&str>,
        message: &str,
    ) -> Result<(), ProviderError> {
        match self {
            Provider::Email(p) => p.send(contacts, subject, message).await,
            Provider::Sms(p) => p.send(contacts, subject, message).await,
            Provider::Telegram(p) => p.send(contacts, subject, message).await,
        }
    }
}

/// Build the channel registry from configuration.
///
/// All channels are registered even without credentials, so that a delivery
/// through an unconfigured channel is recorded as a `NotConfigured` attempt.
pub fn build_providers(config: &AppConfig) -> HashMap<Channel, Provider> {
    let timeout = Duration::from_secs(config.send_timeout_secs);

    [
        Provider::Email(EmailProvider::new(config.smtp.clone(), timeout)),
        Provider::Sms(SmsProvider::new(config.twilio.clone(), timeout)),
        Provider::Telegram(TelegramProvider::new(config.telegram.clone(), timeout)),
    ]
    .into_iter()
    .map(|p| (p.channel(), p))
    .collect()
}

/// Build the HTTP client used by the gateway-backed providers.
pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Falling back to default HTTP client");
            reqwest::Client::new()
        })
}

/// A contact field counts as missing when absent or blank.
pub(crate) fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|v| !v.trim().is_empty())
}

/// Cap `text` at `max_chars` characters, ending with [`TRUNCATION_MARKER`] when cut.
pub fn truncate_with_marker(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(TRUNCATION_MARKER.len());
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(TRUNCATION_MARKER);
    out
}
