use async_trait::async_trait;
use sqlx::{Error, PgConnection};
use uuid::Uuid;

use super::db::DBClient;
use crate::models::subscriptionmodels::{OrderPurpose, PaymentOrder};

#[derive(Debug, Clone)]
pub struct NewPaymentOrder<'a> {
    pub gateway_order_id: &'a str,
    pub user_id: Uuid,
    pub purpose: OrderPurpose,
    pub plan_id: Option<Uuid>,
    pub credits: Option<i64>,
    pub amount: i64,
    pub currency: &'a str,
}

#[async_trait]
pub trait OrderExt {
    async fn create_payment_order(&self, order: NewPaymentOrder<'_>) -> Result<PaymentOrder, Error>;

    async fn get_payment_order(&self, gateway_order_id: &str) -> Result<Option<PaymentOrder>, Error>;
}

#[async_trait]
impl OrderExt for DBClient {
    async fn create_payment_order(&self, order: NewPaymentOrder<'_>) -> Result<PaymentOrder, Error> {
        sqlx::query_as::<_, PaymentOrder>(
            r#"
            INSERT INTO payment_orders
            (gateway_order_id, user_id, purpose, plan_id, credits, amount, currency)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#
        )
        .bind(order.gateway_order_id)
        .bind(order.user_id)
        .bind(order.purpose)
        .bind(order.plan_id)
        .bind(order.credits)
        .bind(order.amount)
        .bind(order.currency)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_payment_order(&self, gateway_order_id: &str) -> Result<Option<PaymentOrder>, Error> {
        sqlx::query_as::<_, PaymentOrder>("SELECT * FROM payment_orders WHERE gateway_order_id = $1")
            .bind(gateway_order_id)
            .fetch_optional(&self.pool)
            .await
    }
}

pub async fn lock_payment_order(conn: &mut PgConnection, gateway_order_id: &str) -> Result<Option<PaymentOrder>, Error> {
    sqlx::query_as::<_, PaymentOrder>(
        "SELECT * FROM payment_orders WHERE gateway_order_id = $1 FOR UPDATE"
    )
    .bind(gateway_order_id)
    .fetch_optional(&mut *conn)
    .await
}

/// created → paid. `None` means the order was already claimed.
pub async fn mark_order_paid(conn: &mut PgConnection, order_id: Uuid, payment_id: &str) -> Result<Option<PaymentOrder>, Error> {
    sqlx::query_as::<_, PaymentOrder>(
        r#"
        UPDATE payment_orders
        SET status = 'paid', payment_id = $2, paid_at = NOW()
        WHERE id = $1 AND status = 'created'
        RETURNING *
        "#
    )
    .bind(order_id)
    .bind(payment_id)
    .fetch_optional(&mut *conn)
    .await
}
