//! PostgreSQL-backed store.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use courier_common::error::AppError;
use courier_common::types::{Channel, DeliveryAttempt, Notification, NotificationStatus};

use super::{NewAttempt, NotificationStore, validate_finalize};

/// Store over the `notifications` and `delivery_attempts` tables.
#[derive(Clone)]
pub struct PgNotificationStore {
    pool: PgPool,
}

impl PgNotificationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationStore for PgNotificationStore {
    async fn create(
        &self,
        user_id: &str,
        subject: Option<&str>,
        message: &str,
    ) -> Result<Notification, AppError> {
        let notification: Notification = sqlx::query_as(
            r#"
            INSERT INTO notifications (id, user_id, subject, message, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(subject)
        .bind(message)
        .bind(NotificationStatus::InProgress)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(notification_id = %notification.id, user_id, "Notification created");

        Ok(notification)
    }

    async fn record_attempt(&self, attempt: NewAttempt<'_>) -> Result<(), AppError> {
        attempt.validate()?;

        sqlx::query(
            r#"
            INSERT INTO delivery_attempts (notification_id, channel, attempt_no, success, error)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(attempt.notification_id)
        .bind(attempt.channel)
        .bind(attempt.attempt_no)
        .bind(attempt.success)
        .bind(attempt.error)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn finalize(
        &self,
        notification_id: Uuid,
        status: NotificationStatus,
        delivered_via: Option<Channel>,
    ) -> Result<Notification, AppError> {
        validate_finalize(status, delivered_via)?;

        let notification: Option<Notification> = sqlx::query_as(
            r#"
            UPDATE notifications
            SET status = $1, delivered_via = $2, updated_at = NOW()
            WHERE id = $3 AND status = $4
            RETURNING *
            "#,
        )
        .bind(status)
        .bind(delivered_via)
        .bind(notification_id)
        .bind(NotificationStatus::InProgress)
        .fetch_optional(&self.pool)
        .await?;

        notification.ok_or_else(|| {
            AppError::Conflict(format!(
                "Notification {} is not in progress",
                notification_id
            ))
        })
    }

    async fn get(&self, notification_id: Uuid) -> Result<Option<Notification>, AppError> {
        let notification: Option<Notification> =
            sqlx::query_as("SELECT * FROM notifications WHERE id = $1")
                .bind(notification_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(notification)
    }

    async fn list_attempts(&self, notification_id: Uuid) -> Result<Vec<DeliveryAttempt>, AppError> {
        let attempts: Vec<DeliveryAttempt> = sqlx::query_as(
            "SELECT * FROM delivery_attempts WHERE notification_id = $1 ORDER BY id",
        )
        .bind(notification_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(attempts)
    }
}
