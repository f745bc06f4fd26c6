use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Delivery channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum Channel {
    Email,
    Sms,
    Telegram,
}

impl Channel {
    /// Order used when the caller does not supply one: chat bot, then email, then SMS.
    pub const DEFAULT_ORDER: [Channel; 3] = [Channel::Telegram, Channel::Email, Channel::Sms];
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::Email => write!(f, "email"),
            Channel::Sms => write!(f, "sms"),
            Channel::Telegram => write!(f, "telegram"),
        }
    }
}

/// Lifecycle of a notification: `pending → in_progress → {delivered | failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum NotificationStatus {
    Pending,
    InProgress,
    Delivered,
    Failed,
}

impl NotificationStatus {
    /// Whether no further transitions can occur.
    pub fn is_terminal(&self) -> bool {
        matches!(self, NotificationStatus::Delivered | NotificationStatus::Failed)
    }
}

impl std::fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationStatus::Pending => write!(f, "pending"),
            NotificationStatus::InProgress => write!(f, "in_progress"),
            NotificationStatus::Delivered => write!(f, "delivered"),
            NotificationStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Recipient contact details. Each channel needs exactly one of these fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contacts {
    pub email: Option<String>,
    /// E.164 phone number (e.g. `+15551234567`)
    pub phone: Option<String>,
    /// Numeric Telegram chat id
    #[serde(alias = "chat_id")]
    pub telegram_chat_id: Option<String>,
}

/// One delivery request's lifecycle record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: String,
    pub subject: Option<String>,
    pub message: String,
    pub status: NotificationStatus,
    /// Set only when `status` is `delivered`
    pub delivered_via: Option<Channel>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One attempt against one channel for one notification. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DeliveryAttempt {
    pub id: i64,
    pub notification_id: Uuid,
    pub channel: Channel,
    /// 1-based, counted per (notification, channel)
    pub attempt_no: i32,
    pub success: bool,
    /// Failure reason, present iff `success` is false
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_serde_names() {
        let order: Vec<Channel> = serde_json::from_str(r#"["telegram","email","sms"]"#).unwrap();
        assert_eq!(order, Channel::DEFAULT_ORDER.to_vec());
        assert_eq!(serde_json::to_string(&Channel::Sms).unwrap(), r#""sms""#);
    }

    #[test]
    fn test_status_display_matches_serde() {
        for status in [
            NotificationStatus::Pending,
            NotificationStatus::InProgress,
            NotificationStatus::Delivered,
            NotificationStatus::Failed,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status));
        }
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!NotificationStatus::Pending.is_terminal());
        assert!(!NotificationStatus::InProgress.is_terminal());
        assert!(NotificationStatus::Delivered.is_terminal());
        assert!(NotificationStatus::Failed.is_terminal());
    }

    #[test]
    fn test_contacts_accepts_chat_id_alias() {
        let contacts: Contacts = serde_json::from_str(r#"{"chat_id": "42"}"#).unwrap();
        assert_eq!(contacts.telegram_chat_id.as_deref(), Some("42"));
        assert!(contacts.email.is_none());
    }
}
