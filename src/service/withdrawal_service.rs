// service/withdrawal_service.rs
use std::sync::Arc;

use serde_json::json;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    db::{
        db::DBClient,
        withdrawaldb::{self, WithdrawalExt},
    },
    models::{
        ledgermodels::{LedgerEntry, TransactionKind, TransactionStatus},
        notificationmodels::{NewNotification, NotificationKind},
        withdrawalmodels::*,
        StatusMachine,
    },
    service::{
        error::ServiceError, finish_tx, ledger_service::LedgerService,
        notification_service::NotificationService,
    },
    utils::credits::{CreditPolicy, WithdrawalQuote},
};

/// Cash-out requests. Credits leave the balance when the request is made and
/// only come back if an admin rejects it.
#[derive(Debug, Clone)]
pub struct WithdrawalService {
    db_client: Arc<DBClient>,
    policy: CreditPolicy,
}

impl WithdrawalService {
    pub fn new(db_client: Arc<DBClient>, policy: CreditPolicy) -> Self {
        Self { db_client, policy }
    }

    pub fn quote(&self, credits: i64) -> Result<WithdrawalQuote, ServiceError> {
        self.policy.quote_withdrawal(credits).map_err(ServiceError::Validation)
    }

    pub async fn request(
        &self,
        user_id: Uuid,
        credits: i64,
        payout_details: Option<serde_json::Value>,
    ) -> Result<WithdrawalRequest, ServiceError> {
        let quote = self.quote(credits)?;

        let mut tx = self.db_client.pool.begin().await?;
        let result = Self::request_in_tx(&mut *tx, user_id, &quote, payout_details.as_ref()).await;
        finish_tx(tx, result, "Withdrawal request").await
    }

    /// The pending ledger entry is `-credits`, so the balance still equals the
    /// entry sum. Gross, fee and net currency amounts are carried in its
    /// metadata and on the request row (20 credits: gross 180, fee 4, net 176).
    async fn request_in_tx(
        conn: &mut PgConnection,
        user_id: Uuid,
        quote: &WithdrawalQuote,
        payout_details: Option<&serde_json::Value>,
    ) -> Result<WithdrawalRequest, ServiceError> {
        let debit = LedgerService::debit(
            conn,
            &LedgerEntry::new(
                user_id,
                quote.credits,
                TransactionKind::Withdrawal,
                format!("Withdrawal of {} VCreds", quote.credits),
            )
            .with_status(TransactionStatus::Pending)
            .with_metadata(json!(quote)),
        )
        .await?;

        let withdrawal = withdrawaldb::insert_withdrawal(conn, user_id, quote, debit.id, payout_details).await?;

        NotificationService::notify(
            conn,
            NewNotification::new(
                user_id,
                NotificationKind::WithdrawalRequested,
                "Withdrawal requested",
                format!(
                    "{} VCreds withdrawal submitted, {} will be paid out after a {} fee",
                    quote.credits, quote.net_amount, quote.fee_amount
                ),
            )
            .with_metadata(json!({ "withdrawal_id": withdrawal.id })),
        )
        .await?;

        tracing::info!(
            "Withdrawal {} requested by {}: {} VCreds, gross {}, fee {}, net {}",
            withdrawal.id,
            user_id,
            quote.credits,
            quote.gross_amount,
            quote.fee_amount,
            quote.net_amount
        );
        Ok(withdrawal)
    }

    pub async fn process(
        &self,
        withdrawal_id: Uuid,
        admin_id: Uuid,
        decision: WithdrawalDecision,
        notes: Option<String>,
    ) -> Result<WithdrawalRequest, ServiceError> {
        let mut tx = self.db_client.pool.begin().await?;
        let result = Self::process_in_tx(&mut *tx, withdrawal_id, admin_id, decision, notes.as_deref()).await;
        finish_tx(tx, result, "Withdrawal processing").await
    }

    async fn process_in_tx(
        conn: &mut PgConnection,
        withdrawal_id: Uuid,
        admin_id: Uuid,
        decision: WithdrawalDecision,
        notes: Option<&str>,
    ) -> Result<WithdrawalRequest, ServiceError> {
        let withdrawal = withdrawaldb::lock_withdrawal(conn, withdrawal_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Withdrawal request"))?;

        if withdrawal.status.is_terminal() {
            return Err(ServiceError::Conflict("Withdrawal has already been processed".to_string()));
        }
        let next: WithdrawalStatus = decision.into();
        withdrawal.status.transition(next)?;

        let processed = withdrawaldb::update_withdrawal_status(conn, withdrawal.id, withdrawal.status, next, notes)
            .await?
            .ok_or_else(|| ServiceError::Conflict("Withdrawal has already been processed".to_string()))?;

        let message = match decision {
            WithdrawalDecision::Completed => {
                LedgerService::complete_pending(conn, withdrawal.transaction_id).await?;
                format!("Your withdrawal of {} VCreds has been paid out", withdrawal.credits)
            }
            WithdrawalDecision::Rejected => {
                LedgerService::reverse_pending(conn, withdrawal.transaction_id, TransactionStatus::Refunded).await?;
                format!(
                    "Your withdrawal of {} VCreds was rejected and the credits returned",
                    withdrawal.credits
                )
            }
        };

        NotificationService::notify(
            conn,
            NewNotification::new(
                withdrawal.user_id,
                NotificationKind::WithdrawalProcessed,
                "Withdrawal processed",
                message,
            )
            .with_metadata(json!({ "withdrawal_id": withdrawal.id, "status": next, "notes": notes })),
        )
        .await?;

        tracing::info!(
            "Withdrawal {} marked {:?} by admin {}",
            withdrawal.id,
            next,
            admin_id
        );
        Ok(processed)
    }

    pub async fn get(&self, withdrawal_id: Uuid) -> Result<WithdrawalRequest, ServiceError> {
        self.db_client
            .get_withdrawal(withdrawal_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Withdrawal request"))
    }

    pub async fn list_own(&self, user_id: Uuid) -> Result<Vec<WithdrawalRequest>, ServiceError> {
        Ok(self.db_client.get_user_withdrawals(user_id).await?)
    }

    pub async fn pending_queue(&self) -> Result<Vec<WithdrawalRequest>, ServiceError> {
        Ok(self.db_client.get_pending_withdrawals().await?)
    }
}
