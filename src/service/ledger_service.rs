// service/ledger_service.rs
use std::sync::Arc;

use serde_json::json;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    db::{
        db::DBClient,
        ledgerdb::{self, LedgerExt},
        userdb::UserExt,
    },
    models::{
        ledgermodels::*,
        notificationmodels::{NewNotification, NotificationKind},
        StatusMachine,
    },
    service::{error::ServiceError, finish_tx, notification_service::NotificationService},
};

/// The only writer of VCred balances. Every balance change appends a
/// `vcred_transactions` row on the same connection.
#[derive(Debug, Clone)]
pub struct LedgerService {
    db_client: Arc<DBClient>,
}

impl LedgerService {
    pub fn new(db_client: Arc<DBClient>) -> Self {
        Self { db_client }
    }

    /// Locks two accounts in id order. Every unit of work that moves VCreds
    /// between two users takes both locks through here first.
    pub async fn lock_accounts(conn: &mut PgConnection, a: Uuid, b: Uuid) -> Result<(), ServiceError> {
        let (first, second) = if a < b { (a, b) } else { (b, a) };
        ledgerdb::lock_account(conn, first).await?;
        if second != first {
            ledgerdb::lock_account(conn, second).await?;
        }
        Ok(())
    }

    fn check_amount(entry: &LedgerEntry) -> Result<(), ServiceError> {
        if entry.amount <= 0 {
            return Err(ServiceError::Validation("Amount must be greater than zero".to_string()));
        }
        Ok(())
    }

    pub async fn credit(conn: &mut PgConnection, entry: &LedgerEntry) -> Result<LedgerTransaction, ServiceError> {
        Self::check_amount(entry)?;

        let balance = ledgerdb::lock_account(conn, entry.user_id).await?;
        let new_balance = balance
            .checked_add(entry.amount)
            .ok_or_else(|| ServiceError::Validation("Balance overflow".to_string()))?;

        ledgerdb::set_balance(conn, entry.user_id, new_balance).await?;
        let transaction = ledgerdb::insert_transaction(conn, entry, entry.amount).await?;

        tracing::info!(
            "Credited {} VCreds to {} ({}), balance {} -> {}",
            entry.amount,
            entry.user_id,
            entry.kind.to_str(),
            balance,
            new_balance
        );

        Ok(transaction)
    }

    /// Fails with `InsufficientFunds` before any write when the balance is short.
    pub async fn debit(conn: &mut PgConnection, entry: &LedgerEntry) -> Result<LedgerTransaction, ServiceError> {
        Self::check_amount(entry)?;

        let balance = ledgerdb::lock_account(conn, entry.user_id).await?;
        if balance < entry.amount {
            return Err(ServiceError::InsufficientFunds {
                required: entry.amount,
                available: balance,
            });
        }

        let new_balance = balance - entry.amount;
        ledgerdb::set_balance(conn, entry.user_id, new_balance).await?;
        let transaction = ledgerdb::insert_transaction(conn, entry, -entry.amount).await?;

        tracing::info!(
            "Debited {} VCreds from {} ({}), balance {} -> {}",
            entry.amount,
            entry.user_id,
            entry.kind.to_str(),
            balance,
            new_balance
        );

        Ok(transaction)
    }

    /// Zero-amount informational entry; the balance is untouched.
    pub async fn record(conn: &mut PgConnection, entry: &LedgerEntry) -> Result<LedgerTransaction, ServiceError> {
        let transaction = ledgerdb::insert_transaction(conn, entry, 0).await?;
        tracing::info!("Recorded {} entry {} for {}", entry.kind.to_str(), transaction.reference, entry.user_id);
        Ok(transaction)
    }

    /// Moves a pending entry to `refunded` or `failed` and takes its amount
    /// back out of the balance.
    pub async fn reverse_pending(
        conn: &mut PgConnection,
        transaction_id: Uuid,
        to: TransactionStatus,
    ) -> Result<LedgerTransaction, ServiceError> {
        if to.counts_toward_balance() {
            return Err(ServiceError::Validation("Reversal must end in refunded or failed".to_string()));
        }

        let transaction = ledgerdb::lock_transaction(conn, transaction_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Transaction"))?;
        transaction.status.transition(to)?;

        let balance = ledgerdb::lock_account(conn, transaction.user_id).await?;
        let restored = balance - transaction.amount;
        if restored < 0 {
            return Err(ServiceError::InsufficientFunds {
                required: transaction.amount,
                available: balance,
            });
        }

        let updated = ledgerdb::update_transaction_status(conn, transaction_id, TransactionStatus::Pending, to)
            .await?
            .ok_or_else(|| ServiceError::Conflict("Transaction has already been settled".to_string()))?;
        ledgerdb::set_balance(conn, transaction.user_id, restored).await?;

        tracing::info!(
            "Reversed transaction {} for {}, balance {} -> {}",
            updated.reference,
            updated.user_id,
            balance,
            restored
        );

        Ok(updated)
    }

    pub async fn complete_pending(conn: &mut PgConnection, transaction_id: Uuid) -> Result<LedgerTransaction, ServiceError> {
        let transaction = ledgerdb::lock_transaction(conn, transaction_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Transaction"))?;
        transaction.status.transition(TransactionStatus::Completed)?;

        let updated = ledgerdb::update_transaction_status(
            conn,
            transaction_id,
            TransactionStatus::Pending,
            TransactionStatus::Completed,
        )
        .await?
        .ok_or_else(|| ServiceError::Conflict("Transaction has already been settled".to_string()))?;

        tracing::info!("Completed pending transaction {}", updated.reference);
        Ok(updated)
    }

    pub async fn balance(&self, user_id: Uuid) -> Result<i64, ServiceError> {
        Ok(self.db_client.get_balance(user_id).await?)
    }

    pub async fn transactions(&self, user_id: Uuid, limit: i64, offset: i64) -> Result<Vec<LedgerTransaction>, ServiceError> {
        Ok(self.db_client.get_ledger_transactions(user_id, limit, offset).await?)
    }

    pub async fn audit(&self, user_id: Uuid) -> Result<LedgerAudit, ServiceError> {
        let balance = self.db_client.get_balance(user_id).await?;
        let ledger_sum = self.db_client.get_ledger_sum(user_id).await?;

        if balance != ledger_sum {
            tracing::warn!("Ledger mismatch for {}: balance {} vs ledger {}", user_id, balance, ledger_sum);
        }

        Ok(LedgerAudit {
            user_id,
            balance,
            ledger_sum,
            consistent: balance == ledger_sum,
        })
    }

    /// Peer-to-peer VCred transfer.
    pub async fn transfer(
        &self,
        sender_id: Uuid,
        recipient_id: Uuid,
        amount: i64,
        note: Option<String>,
    ) -> Result<(LedgerTransaction, LedgerTransaction), ServiceError> {
        if sender_id == recipient_id {
            return Err(ServiceError::Validation("Cannot transfer VCreds to yourself".to_string()));
        }
        self.db_client
            .get_user(recipient_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Recipient"))?;

        let mut tx = self.db_client.pool.begin().await?;
        let result = Self::transfer_in_tx(&mut *tx, sender_id, recipient_id, amount, note).await;
        finish_tx(tx, result, "VCred transfer").await
    }

    async fn transfer_in_tx(
        conn: &mut PgConnection,
        sender_id: Uuid,
        recipient_id: Uuid,
        amount: i64,
        note: Option<String>,
    ) -> Result<(LedgerTransaction, LedgerTransaction), ServiceError> {
        Self::lock_accounts(conn, sender_id, recipient_id).await?;

        let description = note.unwrap_or_else(|| "VCred transfer".to_string());
        let sent = Self::debit(
            conn,
            &LedgerEntry::new(sender_id, amount, TransactionKind::Sent, description.clone())
                .with_metadata(json!({ "recipient_id": recipient_id })),
        )
        .await?;
        let received = Self::credit(
            conn,
            &LedgerEntry::new(recipient_id, amount, TransactionKind::Received, description)
                .with_metadata(json!({ "sender_id": sender_id, "reference": sent.reference })),
        )
        .await?;

        NotificationService::notify(
            conn,
            NewNotification::new(
                recipient_id,
                NotificationKind::CreditsReceived,
                "VCreds received",
                format!("You received {} VCreds", amount),
            ),
        )
        .await?;

        Ok((sent, received))
    }
}
