//! Notification & attempt store.
//!
//! Every operation is a single atomic write or read. Attempts are append-only and
//! a notification reaches a terminal status exactly once, from `in_progress`.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use courier_common::error::AppError;
use courier_common::types::{Channel, DeliveryAttempt, Notification, NotificationStatus};

pub use memory::MemoryStore;
pub use postgres::PgNotificationStore;

/// One attempt outcome to append.
#[derive(Debug, Clone, Copy)]
pub struct NewAttempt<'a> {
    pub notification_id: Uuid,
    pub channel: Channel,
    pub attempt_no: i32,
    pub success: bool,
    pub error: Option<&'a str>,
}

impl NewAttempt<'_> {
    /// Reject rows that would break the attempt invariants before touching storage.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.attempt_no < 1 {
            return Err(AppError::Validation(format!(
                "attempt_no must be >= 1, got {}",
                self.attempt_no
            )));
        }
        if self.success == self.error.is_some() {
            return Err(AppError::Validation(
                "an attempt carries an error iff it failed".to_string(),
            ));
        }
        Ok(())
    }
}

/// Check a requested terminal transition before applying it.
pub(crate) fn validate_finalize(
    status: NotificationStatus,
    delivered_via: Option<Channel>,
) -> Result<(), AppError> {
    if !status.is_terminal() {
        return Err(AppError::Validation(format!(
            "{status} is not a terminal status"
        )));
    }
    match (status, delivered_via) {
        (NotificationStatus::Delivered, None) => Err(AppError::Validation(
            "delivered notifications need a delivered_via channel".to_string(),
        )),
        (NotificationStatus::Failed, Some(_)) => Err(AppError::Validation(
            "failed notifications cannot carry a delivered_via channel".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Durable record of notifications and their delivery attempts.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Create a notification directly in `in_progress`.
    async fn create(
        &self,
        user_id: &str,
        subject: Option<&str>,
        message: &str,
    ) -> Result<Notification, AppError>;

    /// Append one attempt. Durable once this returns.
    async fn record_attempt(&self, attempt: NewAttempt<'_>) -> Result<(), AppError>;

    /// Move an `in_progress` notification to its terminal status.
    ///
    /// Fails with `Conflict` if the notification is unknown or already terminal.
    async fn finalize(
        &self,
        notification_id: Uuid,
        status: NotificationStatus,
        delivered_via: Option<Channel>,
    ) -> Result<Notification, AppError>;

    async fn get(&self, notification_id: Uuid) -> Result<Option<Notification>, AppError>;

    /// Attempts for a notification in the order they were recorded.
    async fn list_attempts(&self, notification_id: Uuid) -> Result<Vec<DeliveryAttempt>, AppError>;
}
