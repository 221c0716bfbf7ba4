// service/notification_service.rs
use std::sync::Arc;

use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    db::{db::DBClient, notificationdb::{self, NotificationExt}},
    models::notificationmodels::{NewNotification, Notification},
    service::error::ServiceError,
};

#[derive(Debug, Clone)]
pub struct NotificationService {
    db_client: Arc<DBClient>,
}

impl NotificationService {
    pub fn new(db_client: Arc<DBClient>) -> Self {
        Self { db_client }
    }

    /// Stores a notification inside the caller's unit of work.
    pub async fn notify(
        conn: &mut PgConnection,
        notification: NewNotification,
    ) -> Result<Notification, ServiceError> {
        let stored = notificationdb::insert_notification(conn, &notification).await?;

        tracing::info!(
            "Notification {} ({}) stored for user {}",
            stored.id,
            stored.kind,
            stored.user_id
        );

        Ok(stored)
    }

    pub async fn list(&self, user_id: Uuid, limit: i64, offset: i64) -> Result<Vec<Notification>, ServiceError> {
        Ok(self.db_client.get_user_notifications(user_id, limit, offset).await?)
    }

    pub async fn unread_count(&self, user_id: Uuid) -> Result<i64, ServiceError> {
        Ok(self.db_client.get_unread_count(user_id).await?)
    }

    pub async fn mark_read(&self, notification_id: Uuid, user_id: Uuid) -> Result<Notification, ServiceError> {
        self.db_client
            .mark_notification_read(notification_id, user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Notification"))
    }

    pub async fn mark_all_read(&self, user_id: Uuid) -> Result<u64, ServiceError> {
        Ok(self.db_client.mark_all_notifications_read(user_id).await?)
    }
}
