//! SMS channel via the Twilio Messages API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use courier_common::config::TwilioConfig;
use courier_common::types::Contacts;

use super::{ChannelProvider, ProviderError, http_client, present, truncate_with_marker};

/// Longest body accepted by the gateway, in characters.
pub const MAX_SMS_CHARS: usize = 1600;

const API_BASE: &str = "https://api.twilio.com/2010-04-01";

pub struct SmsProvider {
    config: TwilioConfig,
    client: Client,
}

impl SmsProvider {
    pub fn new(config: TwilioConfig, timeout: Duration) -> Self {
        Self {
            config,
            client: http_client(timeout),
        }
    }

    fn messages_url(account_sid: &str) -> String {
        format!("{API_BASE}/Accounts/{account_sid}/Messages.json")
    }
}

#[async_trait]
impl ChannelProvider for SmsProvider {
    async fn send(
        &self,
        contacts: &Contacts,
        _subject: Option<&str>,
        message: &str,
    ) -> Result<(), ProviderError> {
        let (Some(sid), Some(token), Some(from)) = (
            self.config.account_sid.as_deref(),
            self.config.auth_token.as_deref(),
            self.config.from_number.as_deref(),
        ) else {
            return Err(ProviderError::NotConfigured(
                "Twilio not configured".to_string(),
            ));
        };
        let Some(phone) = present(&contacts.phone) else {
            return Err(ProviderError::InvalidRecipient(
                "Recipient phone is missing".to_string(),
            ));
        };

        let body = truncate_with_marker(message, MAX_SMS_CHARS);
        let form = [("From", from), ("To", phone), ("Body", body.as_str())];

        let response = self
            .client
            .post(Self::messages_url(sid))
            .basic_auth(sid, Some(token))
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Transport(format!(
                "Twilio error: {} {}",
                status.as_u16(),
                text
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_url() {
        assert_eq!(
            SmsProvider::messages_url("AC123"),
            "https://api.twilio.com/2010-04-01/Accounts/AC123/Messages.json"
        );
    }

    fn configured() -> SmsProvider {
        SmsProvider::new(
            TwilioConfig {
                account_sid: Some("AC123".into()),
                auth_token: Some("token".into()),
                from_number: Some("+15550000000".into()),
            },
            Duration::from_secs(1),
        )
    }

    #[tokio::test]
    async fn test_missing_phone_is_invalid_recipient() {
        let provider = configured();
        let blank = Contacts {
            phone: Some(String::new()),
            ..Default::default()
        };

        for contacts in [Contacts::default(), blank] {
            let err = provider.send(&contacts, None, "hi").await.unwrap_err();
            assert_eq!(
                err,
                ProviderError::InvalidRecipient("Recipient phone is missing".into())
            );
        }
    }

    #[tokio::test]
    async fn test_partial_credentials_are_not_configured() {
        let provider = SmsProvider::new(
            TwilioConfig {
                account_sid: Some("AC123".into()),
                auth_token: None,
                from_number: Some("+15550000000".into()),
            },
            Duration::from_secs(1),
        );
        let contacts = Contacts {
            phone: Some("+15551234567".into()),
            ..Default::default()
        };

        let err = provider.send(&contacts, None, "hi").await.unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }
}
