//! Chat-bot channel via the Telegram Bot API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use courier_common::config::TelegramConfig;
use courier_common::types::Contacts;

use super::{ChannelProvider, ProviderError, http_client, present, truncate_with_marker};

/// Telegram rejects message texts longer than this.
pub const MAX_MESSAGE_CHARS: usize = 4096;

const API_BASE: &str = "https://api.telegram.org";

pub struct TelegramProvider {
    config: TelegramConfig,
    client: Client,
    api_base: String,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

impl TelegramProvider {
    pub fn new(config: TelegramConfig, timeout: Duration) -> Self {
        Self {
            config,
            client: http_client(timeout),
            api_base: API_BASE.to_string(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.to_string();
        self
    }

    /// Bold subject line followed by the body, capped to the API limit.
    fn format_text(subject: Option<&str>, message: &str) -> String {
        let text = match subject {
            Some(subject) if !subject.is_empty() => format!("*{subject}*\n{message}"),
            _ => message.to_string(),
        };
        truncate_with_marker(&text, MAX_MESSAGE_CHARS)
    }
}

#[async_trait]
impl ChannelProvider for TelegramProvider {
    async fn send(
        &self,
        contacts: &Contacts,
        subject: Option<&str>,
        message: &str,
    ) -> Result<(), ProviderError> {
        let Some(token) = self.config.bot_token.as_deref() else {
            return Err(ProviderError::NotConfigured(
                "Telegram bot token not configured".to_string(),
            ));
        };
        let Some(chat_id) = present(&contacts.telegram_chat_id) else {
            return Err(ProviderError::InvalidRecipient(
                "Telegram chat_id is missing".to_string(),
            ));
        };

        let text = Self::format_text(subject, message);
        let payload = SendMessage {
            chat_id,
            text: &text,
            parse_mode: "Markdown",
        };

        let url = format!("{}/bot{token}/sendMessage", self.api_base);
        let response = self.client.post(&url).json(&payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Transport(format!(
                "Telegram error: {} {}",
                status.as_u16(),
                body
            )));
        }

        Ok(())
    }
}
