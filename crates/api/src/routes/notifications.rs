//! Notification delivery and lookup routes.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use courier_common::error::AppError;
use courier_common::types::{
    Channel, Contacts, DeliveryAttempt, Notification, NotificationStatus,
};
use courier_notifier::orchestrator::{DeliveryRequest, MAX_ATTEMPTS, MIN_ATTEMPTS};
use courier_notifier::providers::ChannelProvider;

use crate::state::AppState;

pub fn router<P: ChannelProvider + 'static>() -> Router<AppState<P>> {
    Router::new()
        .route("/api/notifications", post(create_notification::<P>))
        .route("/api/notifications/{id}", get(get_notification::<P>))
        .route("/api/notifications/{id}/attempts", get(list_attempts::<P>))
}

/// Request body for a delivery.
#[derive(Debug, Deserialize)]
pub struct CreateNotificationRequest {
    /// Caller's own user identifier
    pub user_id: String,
    #[serde(default)]
    pub contacts: Contacts,
    /// Used by the email channel (and as a bold header on chat messages)
    pub subject: Option<String>,
    pub message: String,
    #[serde(default = "default_channels_order")]
    pub channels_order: Vec<Channel>,
    #[serde(default = "default_max_attempts")]
    pub per_channel_max_attempts: u32,
}

fn default_channels_order() -> Vec<Channel> {
    Channel::DEFAULT_ORDER.to_vec()
}

fn default_max_attempts() -> u32 {
    1
}

impl CreateNotificationRequest {
    fn validate(&self) -> Result<(), AppError> {
        if self.user_id.trim().is_empty() {
            return Err(AppError::Validation("user_id must not be empty".to_string()));
        }
        if self.message.trim().is_empty() {
            return Err(AppError::Validation("message must not be empty".to_string()));
        }
        if !(MIN_ATTEMPTS..=MAX_ATTEMPTS).contains(&self.per_channel_max_attempts) {
            return Err(AppError::Validation(format!(
                "per_channel_max_attempts must be between {} and {}",
                MIN_ATTEMPTS, MAX_ATTEMPTS
            )));
        }
        if let Some(email) = &self.contacts.email {
            email
                .parse::<lettre::Address>()
                .map_err(|e| AppError::Validation(format!("Invalid email '{}': {}", email, e)))?;
        }
        if let Some(phone) = &self.contacts.phone {
            if !is_e164(phone) {
                return Err(AppError::Validation(format!(
                    "Invalid phone '{}': expected E.164 format like +15551234567",
                    phone
                )));
            }
        }
        Ok(())
    }

    fn into_delivery(self) -> DeliveryRequest {
        DeliveryRequest {
            user_id: self.user_id,
            contacts: self.contacts,
            subject: self.subject,
            message: self.message,
            channels_order: self.channels_order,
            per_channel_max_attempts: self.per_channel_max_attempts,
        }
    }
}

/// `+` followed by 8 to 15 digits, no leading zero.
fn is_e164(phone: &str) -> bool {
    phone.strip_prefix('+').is_some_and(|digits| {
        (8..=15).contains(&digits.len())
            && !digits.starts_with('0')
            && digits.chars().all(|c| c.is_ascii_digit())
    })
}

/// Notification status as seen by callers.
#[derive(Debug, Serialize)]
pub struct NotificationResponse {
    pub notification_id: Uuid,
    pub status: NotificationStatus,
    pub delivered_via: Option<Channel>,
}

impl From<Notification> for NotificationResponse {
    fn from(n: Notification) -> Self {
        Self {
            notification_id: n.id,
            status: n.status,
            delivered_via: n.delivered_via,
        }
    }
}

/// POST /api/notifications: deliver a message, falling back across channels.
///
/// Runs to completion before responding. A notification that no channel could
/// deliver is reported as 502 with its id.
async fn create_notification<P: ChannelProvider + 'static>(
    State(state): State<AppState<P>>,
    Json(req): Json<CreateNotificationRequest>,
) -> Result<Json<NotificationResponse>, AppError> {
    req.validate()?;

    let notification = state.orchestrator.deliver(&req.into_delivery()).await?;

    if notification.status == NotificationStatus::Failed {
        return Err(AppError::DeliveryFailed {
            notification_id: notification.id,
        });
    }

    Ok(Json(notification.into()))
}

/// GET /api/notifications/:id: current status of a notification.
async fn get_notification<P: ChannelProvider + 'static>(
    State(state): State<AppState<P>>,
    Path(id): Path<String>,
) -> Result<Json<NotificationResponse>, AppError> {
    let notification = find_notification(&state, &id).await?;
    Ok(Json(notification.into()))
}

/// GET /api/notifications/:id/attempts: audit trail of every attempt made.
async fn list_attempts<P: ChannelProvider + 'static>(
    State(state): State<AppState<P>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<DeliveryAttempt>>, AppError> {
    let notification = find_notification(&state, &id).await?;
    let attempts = state.store.list_attempts(notification.id).await?;
    Ok(Json(attempts))
}

/// Unparseable ids are reported the same way as unknown ones.
async fn find_notification<P: ChannelProvider>(
    state: &AppState<P>,
    id: &str,
) -> Result<Notification, AppError> {
    let not_found = || AppError::NotFound("Notification not found".to_string());

    let id: Uuid = id.parse().map_err(|_| not_found())?;
    state.store.get(id).await?.ok_or_else(not_found)
}
