//! Delivery orchestrator: ordered delivery with per-channel retries and fallback.
//!
//! For one request:
//! 1. Create the notification in `in_progress`
//! 2. Walk the caller's channel order, trying each channel up to its attempt budget
//! 3. Record every attempt before deciding what to do next
//! 4. Finalize as `delivered` on the first success, or `failed` once every channel is exhausted
//!
//! Provider errors never escape: they become recorded attempts plus a retry/skip
//! decision. Store errors abort the request immediately.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use courier_common::error::AppError;
use courier_common::types::{Channel, Contacts, Notification, NotificationStatus};

use crate::providers::{ChannelProvider, Provider, ProviderError};
use crate::store::{NewAttempt, NotificationStore};

/// Inclusive bounds for `per_channel_max_attempts`.
pub const MIN_ATTEMPTS: u32 = 1;
pub const MAX_ATTEMPTS: u32 = 5;

/// Default upper bound for a single send.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(20);

/// Everything the orchestrator needs for one delivery.
#[derive(Debug, Clone)]
pub struct DeliveryRequest {
    pub user_id: String,
    pub contacts: Contacts,
    pub subject: Option<String>,
    pub message: String,
    /// Tried literally in this order
    pub channels_order: Vec<Channel>,
    pub per_channel_max_attempts: u32,
}

/// What happened on a single channel.
enum ChannelOutcome {
    Delivered,
    Exhausted,
}

pub struct DeliveryOrchestrator<P: ChannelProvider = Provider> {
    store: Arc<dyn NotificationStore>,
    providers: HashMap<Channel, P>,
    send_timeout: Duration,
}

impl<P: ChannelProvider> DeliveryOrchestrator<P> {
    pub fn new(store: Arc<dyn NotificationStore>, providers: HashMap<Channel, P>) -> Self {
        Self {
            store,
            providers,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }

    pub fn with_send_timeout(mut self, send_timeout: Duration) -> Self {
        self.send_timeout = send_timeout;
        self
    }

    /// Run one delivery request to completion and return the terminal record.
    ///
    /// Returns `Ok` for both `delivered` and `failed`; `Err` only when the store
    /// could not durably record what was attempted.
    pub async fn deliver(&self, request: &DeliveryRequest) -> Result<Notification, AppError> {
        let max_attempts = request.per_channel_max_attempts;
        if !(MIN_ATTEMPTS..=MAX_ATTEMPTS).contains(&max_attempts) {
            return Err(AppError::Validation(format!(
                "per_channel_max_attempts must be between {MIN_ATTEMPTS} and {MAX_ATTEMPTS}, got {max_attempts}"
            )));
        }

        let notification = self
            .store
            .create(
                &request.user_id,
                request.subject.as_deref(),
                &request.message,
            )
            .await?;
        let notification_id = notification.id;

        let mut tried: HashSet<Channel> = HashSet::new();
        for &channel in &request.channels_order {
            let Some(provider) = self.providers.get(&channel) else {
                tracing::debug!(%notification_id, %channel, "No provider registered, skipping");
                continue;
            };
            if !tried.insert(channel) {
                tracing::debug!(%notification_id, %channel, "Channel already tried, skipping");
                continue;
            }

            let outcome = self
                .try_channel(notification_id, channel, provider, request)
                .await?;

            if let ChannelOutcome::Delivered = outcome {
                let delivered = self
                    .store
                    .finalize(
                        notification_id,
                        NotificationStatus::Delivered,
                        Some(channel),
                    )
                    .await?;

                tracing::info!(%notification_id, %channel, "Notification delivered");
                return Ok(delivered);
            }
        }

        let failed = self
            .store
            .finalize(notification_id, NotificationStatus::Failed, None)
            .await?;

        tracing::error!(
            %notification_id,
            channels = ?request.channels_order,
            "All channels failed to deliver notification"
        );

        Ok(failed)
    }

    /// Attempt one channel up to the budget, recording each attempt before branching on it.
    async fn try_channel(
        &self,
        notification_id: Uuid,
        channel: Channel,
        provider: &P,
        request: &DeliveryRequest,
    ) -> Result<ChannelOutcome, AppError> {
        for attempt_no in 1..=request.per_channel_max_attempts {
            tracing::info!(%notification_id, %channel, attempt_no, "Trying channel");

            let result = self.send_with_timeout(provider, request).await;

            let error = result.as_ref().err().map(ToString::to_string);
            self.store
                .record_attempt(NewAttempt {
                    notification_id,
                    channel,
                    attempt_no: attempt_no as i32,
                    success: result.is_ok(),
                    error: error.as_deref(),
                })
                .await?;

            match result {
                Ok(()) => return Ok(ChannelOutcome::Delivered),
                Err(e) if !e.is_retryable() => {
                    tracing::warn!(
                        %notification_id,
                        %channel,
                        error = %e,
                        "Channel unusable, falling back"
                    );
                    return Ok(ChannelOutcome::Exhausted);
                }
                Err(e) => {
                    tracing::error!(
                        %notification_id,
                        %channel,
                        attempt_no,
                        error = %e,
                        "Delivery attempt failed"
                    );
                }
            }
        }

        Ok(ChannelOutcome::Exhausted)
    }

    async fn send_with_timeout(
        &self,
        provider: &P,
        request: &DeliveryRequest,
    ) -> Result<(), ProviderError> {
        let send = provider.send(
            &request.contacts,
            request.subject.as_deref(),
            &request.message,
        );

        match tokio::time::timeout(self.send_timeout, send).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Transport(format!(
                "Send timed out after {}s",
                self.send_timeout.as_secs_f64()
            ))),
        }
    }
}
