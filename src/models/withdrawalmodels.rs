use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::StatusMachine;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "withdrawal_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalStatus {
    Pending,
    Completed,
    Rejected,
}

impl StatusMachine for WithdrawalStatus {
    const ENTITY: &'static str = "withdrawal";

    fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (WithdrawalStatus::Pending, WithdrawalStatus::Completed)
                | (WithdrawalStatus::Pending, WithdrawalStatus::Rejected)
        )
    }

    fn is_terminal(&self) -> bool {
        !matches!(self, WithdrawalStatus::Pending)
    }
}

/// Admin decision on a pending withdrawal.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalDecision {
    Completed,
    Rejected,
}

impl From<WithdrawalDecision> for WithdrawalStatus {
    fn from(decision: WithdrawalDecision) -> Self {
        match decision {
            WithdrawalDecision::Completed => WithdrawalStatus::Completed,
            WithdrawalDecision::Rejected => WithdrawalStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WithdrawalRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub credits: i64,
    pub gross_amount: i64,
    pub fee_amount: i64,
    pub net_amount: i64,
    pub status: WithdrawalStatus,
    pub transaction_id: Uuid,
    pub payout_details: Option<serde_json::Value>,
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}
