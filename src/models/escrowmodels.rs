// models/escrowmodels.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::StatusMachine;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq)]
#[sqlx(type_name = "escrow_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EscrowStatus {
    Held,
    Released,
    Refunded,
}

impl StatusMachine for EscrowStatus {
    const ENTITY: &'static str = "escrow";

    fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (EscrowStatus::Held, EscrowStatus::Released) | (EscrowStatus::Held, EscrowStatus::Refunded)
        )
    }

    fn is_terminal(&self) -> bool {
        !matches!(self, EscrowStatus::Held)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EscrowTransaction {
    pub id: Uuid,
    pub project_id: Uuid,
    pub company_id: Uuid,
    pub freelancer_id: Uuid,
    pub amount: i64,
    pub status: EscrowStatus,
    pub held_at: DateTime<Utc>,
    pub released_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn held_escrow_settles_exactly_once() {
        assert_eq!(EscrowStatus::Held.transition(EscrowStatus::Released), Ok(EscrowStatus::Released));
        assert_eq!(EscrowStatus::Held.transition(EscrowStatus::Refunded), Ok(EscrowStatus::Refunded));

        let err = EscrowStatus::Released.transition(EscrowStatus::Released).unwrap_err();
        assert_eq!(err.entity, "escrow");
        assert_eq!(err.from, "Released");
        assert!(EscrowStatus::Released.transition(EscrowStatus::Refunded).is_err());
        assert!(EscrowStatus::Refunded.transition(EscrowStatus::Released).is_err());
    }

    #[test]
    fn terminal_states() {
        assert!(!EscrowStatus::Held.is_terminal());
        assert!(EscrowStatus::Released.is_terminal());
        assert!(EscrowStatus::Refunded.is_terminal());
    }
}
