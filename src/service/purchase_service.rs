// service/purchase_service.rs
use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    db::{
        db::DBClient,
        orderdb::{NewPaymentOrder, OrderExt},
    },
    models::{
        ledgermodels::{LedgerEntry, LedgerTransaction, TransactionKind},
        notificationmodels::{NewNotification, NotificationKind},
        subscriptionmodels::{OrderPurpose, PaymentOrder},
        usermodel::User,
    },
    service::{
        error::ServiceError,
        finish_tx,
        ledger_service::LedgerService,
        notification_service::NotificationService,
        payment_gateway::PaymentGateway,
        subscription_service::{CheckoutOrder, PaymentProof, SubscriptionService, CURRENCY},
    },
    utils::credits::CreditPolicy,
};

#[derive(Debug, Clone, Serialize)]
pub struct CreditPurchase {
    pub order: PaymentOrder,
    pub transaction: LedgerTransaction,
}

/// Companies top up VCreds through the gateway.
#[derive(Debug, Clone)]
pub struct PurchaseService {
    db_client: Arc<DBClient>,
    gateway: Arc<dyn PaymentGateway>,
    policy: CreditPolicy,
}

impl PurchaseService {
    pub fn new(db_client: Arc<DBClient>, gateway: Arc<dyn PaymentGateway>, policy: CreditPolicy) -> Self {
        Self {
            db_client,
            gateway,
            policy,
        }
    }

    pub async fn create_credit_order(&self, user: &User, credits: i64) -> Result<CheckoutOrder, ServiceError> {
        if !user.is_company() {
            return Err(ServiceError::Unauthorized);
        }
        let amount = self
            .policy
            .purchase_amount_minor(credits)
            .map_err(ServiceError::Validation)?;

        let receipt = format!("vc_{}", Uuid::new_v4().simple());
        let gateway_order = self.gateway.create_order(amount, CURRENCY, &receipt).await?;

        let order = self
            .db_client
            .create_payment_order(NewPaymentOrder {
                gateway_order_id: &gateway_order.id,
                user_id: user.id,
                purpose: OrderPurpose::Credits,
                plan_id: None,
                credits: Some(credits),
                amount,
                currency: CURRENCY,
            })
            .await
            .map_err(|e| ServiceError::conflict_on_unique(e, "Gateway order already recorded"))?;

        tracing::info!("Credit order {} created for {} VCreds by {}", order.gateway_order_id, credits, user.id);
        Ok(CheckoutOrder {
            order,
            key_id: self.gateway.key_id().to_string(),
        })
    }

    pub async fn verify_credit_payment(&self, user_id: Uuid, proof: PaymentProof) -> Result<CreditPurchase, ServiceError> {
        SubscriptionService::check_signature(self.gateway.as_ref(), &proof)?;

        let mut tx = self.db_client.pool.begin().await?;
        let result = Self::credit_in_tx(&mut *tx, user_id, &proof).await;
        finish_tx(tx, result, "VCred purchase").await
    }

    async fn credit_in_tx(
        conn: &mut PgConnection,
        user_id: Uuid,
        proof: &PaymentProof,
    ) -> Result<CreditPurchase, ServiceError> {
        let order = SubscriptionService::claim_order(conn, proof, user_id, OrderPurpose::Credits).await?;
        let credits = order
            .credits
            .filter(|c| *c > 0)
            .ok_or_else(|| ServiceError::Validation("Payment order carries no credits".to_string()))?;

        let transaction = LedgerService::credit(
            conn,
            &LedgerEntry::new(user_id, credits, TransactionKind::Purchase, format!("Purchased {} VCreds", credits))
                .with_metadata(json!({
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
                NotificationKind::CreditsPurchased,
                "VCreds purchased",
                format!("{} VCreds were added to your balance", credits),
            ),
        )
        .await?;

        Ok(CreditPurchase { order, transaction })
    }
}
