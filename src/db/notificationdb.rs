use async_trait::async_trait;
use sqlx::{Error, PgConnection};
use uuid::Uuid;

use super::db::DBClient;
use crate::models::notificationmodels::{NewNotification, Notification};

#[async_trait]
pub trait NotificationExt {
    async fn get_user_notifications(&self, user_id: Uuid, limit: i64, offset: i64) -> Result<Vec<Notification>, Error>;

    async fn get_unread_count(&self, user_id: Uuid) -> Result<i64, Error>;

    async fn mark_notification_read(&self, notification_id: Uuid, user_id: Uuid) -> Result<Option<Notification>, Error>;

    async fn mark_all_notifications_read(&self, user_id: Uuid) -> Result<u64, Error>;
}

#[async_trait]
impl NotificationExt for DBClient {
    async fn get_user_notifications(&self, user_id: Uuid, limit: i64, offset: i64) -> Result<Vec<Notification>, Error> {
        sqlx::query_as::<_, Notification>(
            r#"
            SELECT * FROM notifications
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_unread_count(&self, user_id: Uuid) -> Result<i64, Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND is_read = FALSE"
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn mark_notification_read(&self, notification_id: Uuid, user_id: Uuid) -> Result<Option<Notification>, Error> {
        sqlx::query_as::<_, Notification>(
            r#"
            UPDATE notifications SET is_read = TRUE
            WHERE id = $1 AND user_id = $2
            RETURNING *
            "#
        )
        .bind(notification_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn mark_all_notifications_read(&self, user_id: Uuid) -> Result<u64, Error> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND is_read = FALSE"
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

pub async fn insert_notification(conn: &mut PgConnection, notification: &NewNotification) -> Result<Notification, Error> {
    sqlx::query_as::<_, Notification>(
        r#"
        INSERT INTO notifications (user_id, kind, title, message, project_id, metadata)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#
    )
    .bind(notification.user_id)
    .bind(notification.kind.to_str())
    .bind(&notification.title)
    .bind(&notification.message)
    .bind(notification.project_id)
    .bind(&notification.metadata)
    .fetch_one(&mut *conn)
    .await
}
