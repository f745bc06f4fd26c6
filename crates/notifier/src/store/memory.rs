//! Volatile in-process store.
//!
//! Same contract as the PostgreSQL store, held behind a mutex. Used by tests and
//! for local runs with `DATABASE_URL=memory:`; nothing survives a restart.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use courier_common::error::AppError;
use courier_common::types::{Channel, DeliveryAttempt, Notification, NotificationStatus};

use super::{NewAttempt, NotificationStore, validate_finalize};

#[derive(Default)]
struct Tables {
    notifications: HashMap<Uuid, Notification>,
    attempts: Vec<DeliveryAttempt>,
    next_attempt_id: i64,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, AppError> {
        self.tables
            .lock()
            .map_err(|_| AppError::Store("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn create(
        &self,
        user_id: &str,
        subject: Option<&str>,
        message: &str,
    ) -> Result<Notification, AppError> {
        let now = Utc::now();
        let notification = Notification {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            subject: subject.map(str::to_string),
            message: message.to_string(),
            status: NotificationStatus::InProgress,
            delivered_via: None,
            created_at: now,
            updated_at: now,
        };

        self.lock()?
            .notifications
            .insert(notification.id, notification.clone());

        Ok(notification)
    }

    async fn record_attempt(&self, attempt: NewAttempt<'_>) -> Result<(), AppError> {
        attempt.validate()?;
        let mut tables = self.lock()?;

        if !tables.notifications.contains_key(&attempt.notification_id) {
            return Err(AppError::Store(format!(
                "Notification {} does not exist",
                attempt.notification_id
            )));
        }
        let duplicate = tables.attempts.iter().any(|a| {
            a.notification_id == attempt.notification_id
                && a.channel == attempt.channel
                && a.attempt_no == attempt.attempt_no
        });
        if duplicate {
            return Err(AppError::Store(format!(
                "Attempt {} for {} already recorded",
                attempt.attempt_no, attempt.channel
            )));
        }

        tables.next_attempt_id += 1;
        let id = tables.next_attempt_id;
        tables.attempts.push(DeliveryAttempt {
            id,
            notification_id: attempt.notification_id,
            channel: attempt.channel,
            attempt_no: attempt.attempt_no,
            success: attempt.success,
            error: attempt.error.map(str::to_string),
            created_at: Utc::now(),
        });

        Ok(())
    }

    async fn finalize(
        &self,
        notification_id: Uuid,
        status: NotificationStatus,
        delivered_via: Option<Channel>,
    ) -> Result<Notification, AppError> {
        validate_finalize(status, delivered_via)?;
        let mut tables = self.lock()?;

        match tables.notifications.get_mut(&notification_id) {
            Some(n) if n.status == NotificationStatus::InProgress => {
                n.status = status;
                n.delivered_via = delivered_via;
                n.updated_at = Utc::now();
                Ok(n.clone())
            }
            _ => Err(AppError::Conflict(format!(
                "Notification {} is not in progress",
                notification_id
            ))),
        }
    }

    async fn get(&self, notification_id: Uuid) -> Result<Option<Notification>, AppError> {
        Ok(self.lock()?.notifications.get(&notification_id).cloned())
    }

    async fn list_attempts(&self, notification_id: Uuid) -> Result<Vec<DeliveryAttempt>, AppError> {
        Ok(self
            .lock()?
            .attempts
            .iter()
            .filter(|a| a.notification_id == notification_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed_attempt(notification_id: Uuid, attempt_no: i32) -> NewAttempt<'static> {
        NewAttempt {
            notification_id,
            channel: Channel::Sms,
            attempt_no,
            success: false,
            error: Some("gateway down"),
        }
    }

    #[tokio::test]
    async fn test_create_starts_in_progress() {
        let store = MemoryStore::new();
        let n = store.create("user-1", Some("Hi"), "body").await.unwrap();

        assert_eq!(n.status, NotificationStatus::InProgress);
        assert!(n.delivered_via.is_none());
        let fetched = store.get(n.id).await.unwrap().unwrap();
        assert_eq!(fetched.user_id, "user-1");
        assert_eq!(fetched.subject.as_deref(), Some("Hi"));
    }

    #[tokio::test]
    async fn test_attempts_are_numbered_in_insertion_order() {
        let store = MemoryStore::new();
        let n = store.create("user-1", None, "body").await.unwrap();

        store.record_attempt(failed_attempt(n.id, 1)).await.unwrap();
        store.record_attempt(failed_attempt(n.id, 2)).await.unwrap();

        let attempts = store.list_attempts(n.id).await.unwrap();
        assert_eq!(attempts.len(), 2);
        assert!(attempts[0].id < attempts[1].id);
        assert_eq!(attempts[1].attempt_no, 2);
        assert_eq!(attempts[1].error.as_deref(), Some("gateway down"));
    }

    #[tokio::test]
    async fn test_duplicate_attempt_rejected() {
        let store = MemoryStore::new();
        let n = store.create("user-1", None, "body").await.unwrap();

        store.record_attempt(failed_attempt(n.id, 1)).await.unwrap();
        let err = store.record_attempt(failed_attempt(n.id, 1)).await;
        assert!(matches!(err, Err(AppError::Store(_))));
    }

    #[tokio::test]
    async fn test_attempt_for_unknown_notification_rejected() {
        let store = MemoryStore::new();
        let err = store.record_attempt(failed_attempt(Uuid::new_v4(), 1)).await;
        assert!(matches!(err, Err(AppError::Store(_))));
    }

    #[tokio::test]
    async fn test_finalize_is_single_shot() {
        let store = MemoryStore::new();
        let n = store.create("user-1", None, "body").await.unwrap();

        let done = store
            .finalize(n.id, NotificationStatus::Delivered, Some(Channel::Email))
            .await
            .unwrap();
        assert_eq!(done.status, NotificationStatus::Delivered);
        assert_eq!(done.delivered_via, Some(Channel::Email));
        assert!(done.updated_at >= n.updated_at);

        let again = store.finalize(n.id, NotificationStatus::Failed, None).await;
        assert!(matches!(again, Err(AppError::Conflict(_))));
        let fetched = store.get(n.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, NotificationStatus::Delivered);
    }

    #[tokio::test]
    async fn test_get_unknown_returns_none() {
        let store = MemoryStore::new();
        assert!(store.get(Uuid::new_v4()).await.unwrap().is_none());
    }
}
