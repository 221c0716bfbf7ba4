// db/subscriptiondb.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Error, PgConnection};
use uuid::Uuid;

use super::db::DBClient;
use crate::models::subscriptionmodels::*;

#[async_trait]
pub trait SubscriptionExt {
    async fn get_active_plans(&self) -> Result<Vec<SubscriptionPlan>, Error>;

    async fn get_plan(&self, plan_id: Uuid) -> Result<Option<SubscriptionPlan>, Error>;

    async fn create_plan(
        &self,
        name: &str,
        price: i64,
        duration_days: i32,
        features: Option<serde_json::Value>,
    ) -> Result<SubscriptionPlan, Error>;

    async fn get_current_subscription(&self, user_id: Uuid) -> Result<Option<UserSubscription>, Error>;

    async fn get_subscription(&self, subscription_id: Uuid) -> Result<Option<UserSubscription>, Error>;

    async fn cancel_subscription(&self, subscription_id: Uuid, user_id: Uuid) -> Result<Option<UserSubscription>, Error>;

    async fn expire_due_subscriptions(&self) -> Result<u64, Error>;
}

#[async_trait]
impl SubscriptionExt for DBClient {
    async fn get_active_plans(&self) -> Result<Vec<SubscriptionPlan>, Error> {
        sqlx::query_as::<_, SubscriptionPlan>(
            "SELECT * FROM subscription_plans WHERE is_active = TRUE ORDER BY price ASC"
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn get_plan(&self, plan_id: Uuid) -> Result<Option<SubscriptionPlan>, Error> {
        sqlx::query_as::<_, SubscriptionPlan>("SELECT * FROM subscription_plans WHERE id = $1")
            .bind(plan_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn create_plan(
        &self,
        name: &str,
        price: i64,
        duration_days: i32,
        features: Option<serde_json::Value>,
    ) -> Result<SubscriptionPlan, Error> {
        sqlx::query_as::<_, SubscriptionPlan>(
            r#"
            INSERT INTO subscription_plans (name, price, duration_days, features)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#
        )
        .bind(name)
        .bind(price)
        .bind(duration_days)
        .bind(features)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_current_subscription(&self, user_id: Uuid) -> Result<Option<UserSubscription>, Error> {
        sqlx::query_as::<_, UserSubscription>(
            r#"
            SELECT * FROM user_subscriptions
            WHERE user_id = $1 AND status = 'active' AND end_date > NOW()
            ORDER BY end_date DESC
            LIMIT 1
            "#
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_subscription(&self, subscription_id: Uuid) -> Result<Option<UserSubscription>, Error> {
        sqlx::query_as::<_, UserSubscription>("SELECT * FROM user_subscriptions WHERE id = $1")
            .bind(subscription_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn cancel_subscription(&self, subscription_id: Uuid, user_id: Uuid) -> Result<Option<UserSubscription>, Error> {
        sqlx::query_as::<_, UserSubscription>(
            r#"
            UPDATE user_subscriptions
            SET status = 'cancelled', auto_renew = FALSE, updated_at = NOW()
            WHERE id = $1 AND user_id = $2 AND status = 'active'
            RETURNING *
            "#
        )
        .bind(subscription_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn expire_due_subscriptions(&self) -> Result<u64, Error> {
        let result = sqlx::query(
            r#"
            UPDATE user_subscriptions
            SET status = 'expired', updated_at = NOW()
            WHERE status = 'active' AND end_date <= NOW()
            "#
        )
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

pub async fn insert_subscription(
    conn: &mut PgConnection,
    user_id: Uuid,
    plan: &SubscriptionPlan,
    start_date: DateTime<Utc>,
    order_id: &str,
    payment_id: &str,
) -> Result<UserSubscription, Error> {
    sqlx::query_as::<_, UserSubscription>(
        r#"
        INSERT INTO user_subscriptions
        (user_id, plan_id, status, start_date, end_date, auto_renew, order_id, payment_id)
        VALUES ($1, $2, 'active'::subscription_status, $3, $4, TRUE, $5, $6)
        RETURNING *
        "#
    )
    .bind(user_id)
    .bind(plan.id)
    .bind(start_date)
    .bind(plan.end_date_from(start_date))
    .bind(order_id)
    .bind(payment_id)
    .fetch_one(&mut *conn)
    .await
}
