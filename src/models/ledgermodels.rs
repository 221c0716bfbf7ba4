// models/ledgermodels.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::StatusMachine;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "vcred_transaction_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Purchase,
    Sent,
    Received,
    Earned,
    Withdrawal,
    EscrowHold,
    ProjectPayment,
    Refund,
}

impl TransactionKind {
    pub fn to_str(&self) -> &str {
        match self {
            TransactionKind::Purchase => "purchase",
            TransactionKind::Sent => "sent",
            TransactionKind::Received => "received",
            TransactionKind::Earned => "earned",
            TransactionKind::Withdrawal => "withdrawal",
            TransactionKind::EscrowHold => "escrow_hold",
            TransactionKind::ProjectPayment => "project_payment",
            TransactionKind::Refund => "refund",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "vcred_transaction_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Refunded,
    Failed,
}

impl StatusMachine for TransactionStatus {
    const ENTITY: &'static str = "transaction";

    fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (TransactionStatus::Pending, TransactionStatus::Completed)
                | (TransactionStatus::Pending, TransactionStatus::Refunded)
                | (TransactionStatus::Pending, TransactionStatus::Failed)
        )
    }

    fn is_terminal(&self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }
}

impl TransactionStatus {
    /// Entries in these states are reflected in the cached balance.
    pub fn counts_toward_balance(&self) -> bool {
        matches!(self, TransactionStatus::Pending | TransactionStatus::Completed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LedgerAccount {
    pub user_id: Uuid,
    pub balance: i64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LedgerTransaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: i64, // signed VCreds
    pub kind: TransactionKind,
    pub status: TransactionStatus,
    pub description: String,
    pub project_id: Option<Uuid>,
    pub reference: String,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A balance change waiting to be applied. `amount` is always the magnitude;
/// the direction comes from whether it is credited or debited.
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub user_id: Uuid,
    pub amount: i64,
    pub kind: TransactionKind,
    pub status: TransactionStatus,
    pub description: String,
    pub project_id: Option<Uuid>,
    pub metadata: Option<serde_json::Value>,
}

impl LedgerEntry {
    pub fn new(user_id: Uuid, amount: i64, kind: TransactionKind, description: impl Into<String>) -> Self {
        Self {
            user_id,
            amount,
            kind,
            status: TransactionStatus::Completed,
            description: description.into(),
            project_id: None,
            metadata: None,
        }
    }

    pub fn for_project(mut self, project_id: Uuid) -> Self {
        self.project_id = Some(project_id);
        self
    }

    pub fn with_status(mut self, status: TransactionStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerAudit {
    pub user_id: Uuid,
    pub balance: i64,
    pub ledger_sum: i64,
    pub consistent: bool,
}

pub fn generate_transaction_reference() -> String {
    format!("VC_{}", &Uuid::new_v4().simple().to_string().to_uppercase()[..16])
}
