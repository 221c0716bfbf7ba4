use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Duration, Utc};

use super::StatusMachine;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "subscription_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Cancelled,
    Expired,
}

impl StatusMachine for SubscriptionStatus {
    const ENTITY: &'static str = "subscription";

    fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (SubscriptionStatus::Active, SubscriptionStatus::Cancelled)
                | (SubscriptionStatus::Active, SubscriptionStatus::Expired)
        )
    }

    fn is_terminal(&self) -> bool {
        !matches!(self, SubscriptionStatus::Active)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "order_purpose", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderPurpose {
    Subscription,
    Credits,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "order_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Created,
    Paid,
    Failed,
}

impl StatusMachine for OrderStatus {
    const ENTITY: &'static str = "payment order";

    fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Created, OrderStatus::Paid) | (OrderStatus::Created, OrderStatus::Failed)
        )
    }

    fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Created)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, sqlx::FromRow)]
pub struct SubscriptionPlan {
    pub id: Uuid,
    pub name: String,
    pub price: i64,
    pub duration_days: i32,
    pub features: Option<serde_json::Value>,
    pub is_active: bool,
}

impl SubscriptionPlan {
    pub fn end_date_from(&self, start: DateTime<Utc>) -> DateTime<Utc> {
        start + Duration::days(self.duration_days as i64)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, sqlx::FromRow)]
pub struct UserSubscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_id: Uuid,
    pub status: SubscriptionStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub auto_renew: bool,
    pub order_id: String,
    pub payment_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Gateway order tracked locally so a paid order is claimed exactly once.
#[derive(Debug, Deserialize, Serialize, Clone, sqlx::FromRow)]
pub struct PaymentOrder {
    pub id: Uuid,
    pub gateway_order_id: String,
    pub user_id: Uuid,
    pub purpose: OrderPurpose,
    pub plan_id: Option<Uuid>,
    pub credits: Option<i64>,
    pub amount: i64, // minor currency units
    pub currency: String,
    pub status: OrderStatus,
    pub payment_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}
