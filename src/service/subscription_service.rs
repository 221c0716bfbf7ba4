// service/subscription_service.rs
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    db::{
        db::DBClient,
        orderdb::{self, NewPaymentOrder, OrderExt},
        subscriptiondb::{self, SubscriptionExt},
    },
    models::{
        ledgermodels::{LedgerEntry, LedgerTransaction, TransactionKind},
        notificationmodels::{NewNotification, NotificationKind},
        subscriptionmodels::*,
        StatusMachine,
    },
    service::{
        error::ServiceError, finish_tx, ledger_service::LedgerService,
        notification_service::NotificationService, payment_gateway::PaymentGateway,
    },
    utils::credits::to_minor_units,
};

pub const CURRENCY: &str = "INR";

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutOrder {
    pub order: PaymentOrder,
    pub key_id: String,
}

/// Callback fields posted back by the checkout widget.
#[derive(Debug, Clone)]
pub struct PaymentProof {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivatedSubscription {
    pub subscription: UserSubscription,
    pub order: PaymentOrder,
    pub transaction: LedgerTransaction,
}

#[derive(Debug, Clone)]
pub struct SubscriptionService {
    db_client: Arc<DBClient>,
    gateway: Arc<dyn PaymentGateway>,
}

impl SubscriptionService {
    pub fn new(db_client: Arc<DBClient>, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { db_client, gateway }
    }

    pub async fn plans(&self) -> Result<Vec<SubscriptionPlan>, ServiceError> {
        Ok(self.db_client.get_active_plans().await?)
    }

    async fn active_plan(&self, plan_id: Uuid) -> Result<SubscriptionPlan, ServiceError> {
        self.db_client
            .get_plan(plan_id)
            .await?
            .filter(|plan| plan.is_active)
            .ok_or_else(|| ServiceError::not_found("Subscription plan"))
    }

    pub async fn create_order(&self, plan_id: Uuid, user_id: Uuid) -> Result<CheckoutOrder, ServiceError> {
        let plan = self.active_plan(plan_id).await?;
        let amount = to_minor_units(plan.price)
            .ok_or_else(|| ServiceError::Validation("Plan price is too large".to_string()))?;

        let receipt = format!("sub_{}", Uuid::new_v4().simple());
        let gateway_order = self.gateway.create_order(amount, CURRENCY, &receipt).await?;

        let order = self
            .db_client
            .create_payment_order(NewPaymentOrder {
                gateway_order_id: &gateway_order.id,
                user_id,
                purpose: OrderPurpose::Subscription,
                plan_id: Some(plan.id),
                credits: None,
                amount,
                currency: CURRENCY,
            })
            .await
            .map_err(|e| ServiceError::conflict_on_unique(e, "Gateway order already recorded"))?;

        tracing::info!("Subscription order {} created for user {} on plan {}", order.gateway_order_id, user_id, plan.name);
        Ok(CheckoutOrder {
            order,
            key_id: self.gateway.key_id().to_string(),
        })
    }

    /// Rejects a forged callback before anything is written.
    pub(crate) fn check_signature(gateway: &dyn PaymentGateway, proof: &PaymentProof) -> Result<(), ServiceError> {
        if gateway.verify_signature(&proof.order_id, &proof.payment_id, &proof.signature) {
            return Ok(());
        }
        tracing::warn!(
            "Payment signature mismatch for order {} payment {}",
            proof.order_id,
            proof.payment_id
        );
        Err(ServiceError::Validation("Invalid payment signature".to_string()))
    }

    /// Locks the order, checks it belongs to this user and purpose, then marks
    /// it paid. A second claim of the same order is a conflict.
    pub(crate) async fn claim_order(
        conn: &mut PgConnection,
        proof: &PaymentProof,
        user_id: Uuid,
        purpose: OrderPurpose,
    ) -> Result<PaymentOrder, ServiceError> {
        let order = orderdb::lock_payment_order(conn, &proof.order_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Payment order"))?;

        if order.user_id != user_id {
            return Err(ServiceError::Unauthorized);
        }
        if order.purpose != purpose {
            return Err(ServiceError::Validation("Payment order is for a different purchase".to_string()));
        }
        if order.status == OrderStatus::Paid {
            return Err(ServiceError::Conflict("Payment has already been processed".to_string()));
        }
        order.status.transition(OrderStatus::Paid)?;

        orderdb::mark_order_paid(conn, order.id, &proof.payment_id)
            .await?
            .ok_or_else(|| ServiceError::Conflict("Payment has already been processed".to_string()))
    }

    pub async fn verify_payment(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
        proof: PaymentProof,
    ) -> Result<ActivatedSubscription, ServiceError> {
        Self::check_signature(self.gateway.as_ref(), &proof)?;
        let plan = self
            .db_client
            .get_plan(plan_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Subscription plan"))?;

        let mut tx = self.db_client.pool.begin().await?;
        let result = Self::activate_in_tx(&mut *tx, user_id, &plan, &proof).await;
        finish_tx(tx, result, "Subscription activation").await
    }

    async fn activate_in_tx(
        conn: &mut PgConnection,
        user_id: Uuid,
        plan: &SubscriptionPlan,
        proof: &PaymentProof,
    ) -> Result<ActivatedSubscription, ServiceError> {
        let order = Self::claim_order(conn, proof, user_id, OrderPurpose::Subscription).await?;
        if order.plan_id != Some(plan.id) {
            return Err(ServiceError::Validation("Payment order is for a different plan".to_string()));
        }

        let subscription = subscriptiondb::insert_subscription(
            conn,
            user_id,
            plan,
            Utc::now(),
            &order.gateway_order_id,
            &proof.payment_id,
        )
        .await?;

        let transaction = LedgerService::record(
            conn,
            &LedgerEntry::new(
                user_id,
                0,
                TransactionKind::Purchase,
                format!("{} subscription", plan.name),
            )
            .with_metadata(json!({
                "plan_id": plan.id,
                "subscription_id": subscription.id,
                "order_id": order.gateway_order_id,
                "payment_id": proof.payment_id,
                "amount": order.amount,
                "currency": order.currency,
            })),
        )
        .await?;

        NotificationService::notify(
            conn,
            NewNotification::new(
                user_id,
                NotificationKind::SubscriptionActivated,
                "Subscription activated",
                format!(
                    "{} is active until {}",
                    plan.name,
                    subscription.end_date.format("%Y-%m-%d")
                ),
            )
            .with_metadata(json!({ "subscription_id": subscription.id })),
        )
        .await?;

        tracing::info!(
            "Subscription {} activated for user {} via payment {}",
            subscription.id,
            user_id,
            proof.payment_id
        );

        Ok(ActivatedSubscription {
            subscription,
            order,
            transaction,
        })
    }

    /// Stops renewal. The paid period is not refunded.
    pub async fn cancel(&self, subscription_id: Uuid, user_id: Uuid) -> Result<UserSubscription, ServiceError> {
        let subscription = self
            .db_client
            .get_subscription(subscription_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Subscription"))?;
        if subscription.user_id != user_id {
            return Err(ServiceError::Unauthorized);
        }
        subscription.status.transition(SubscriptionStatus::Cancelled)?;

        let cancelled = self
            .db_client
            .cancel_subscription(subscription_id, user_id)
            .await?
            .ok_or_else(|| ServiceError::Conflict("Subscription is no longer active".to_string()))?;

        tracing::info!("Subscription {} cancelled by user {}", subscription_id, user_id);
        Ok(cancelled)
    }

    pub async fn current(&self, user_id: Uuid) -> Result<Option<UserSubscription>, ServiceError> {
        Ok(self.db_client.get_current_subscription(user_id).await?)
    }

    pub async fn expire_due(&self) -> Result<u64, ServiceError> {
        let expired = self.db_client.expire_due_subscriptions().await?;
        if expired > 0 {
            tracing::info!("Expired {} subscriptions", expired);
        }
        Ok(expired)
    }
}
