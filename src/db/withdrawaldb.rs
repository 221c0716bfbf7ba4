use async_trait::async_trait;
use sqlx::{Error, PgConnection};
use uuid::Uuid;

use super::db::DBClient;
use crate::{
    models::withdrawalmodels::{WithdrawalRequest, WithdrawalStatus},
    utils::credits::WithdrawalQuote,
};

#[async_trait]
pub trait WithdrawalExt {
    async fn get_withdrawal(&self, withdrawal_id: Uuid) -> Result<Option<WithdrawalRequest>, Error>;

    async fn get_user_withdrawals(&self, user_id: Uuid) -> Result<Vec<WithdrawalRequest>, Error>;

    async fn get_pending_withdrawals(&self) -> Result<Vec<WithdrawalRequest>, Error>;
}

#[async_trait]
impl WithdrawalExt for DBClient {
    async fn get_withdrawal(&self, withdrawal_id: Uuid) -> Result<Option<WithdrawalRequest>, Error> {
        sqlx::query_as::<_, WithdrawalRequest>("SELECT * FROM withdrawal_requests WHERE id = $1")
            .bind(withdrawal_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_user_withdrawals(&self, user_id: Uuid) -> Result<Vec<WithdrawalRequest>, Error> {
        sqlx::query_as::<_, WithdrawalRequest>(
            "SELECT * FROM withdrawal_requests WHERE user_id = $1 ORDER BY created_at DESC"
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_pending_withdrawals(&self) -> Result<Vec<WithdrawalRequest>, Error> {
        sqlx::query_as::<_, WithdrawalRequest>(
            "SELECT * FROM withdrawal_requests WHERE status = 'pending' ORDER BY created_at ASC"
        )
        .fetch_all(&self.pool)
        .await
    }
}

pub async fn insert_withdrawal(
    conn: &mut PgConnection,
    user_id: Uuid,
    quote: &WithdrawalQuote,
    transaction_id: Uuid,
    payout_details: Option<&serde_json::Value>,
) -> Result<WithdrawalRequest, Error> {
    sqlx::query_as::<_, WithdrawalRequest>(
        r#"
        INSERT INTO withdrawal_requests
        (user_id, credits, gross_amount, fee_amount, net_amount, transaction_id, payout_details)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#
    )
    .bind(user_id)
    .bind(quote.credits)
    .bind(quote.gross_amount)
    .bind(quote.fee_amount)
    .bind(quote.net_amount)
    .bind(transaction_id)
    .bind(payout_details)
    .fetch_one(&mut *conn)
    .await
}

pub async fn lock_withdrawal(conn: &mut PgConnection, withdrawal_id: Uuid) -> Result<Option<WithdrawalRequest>, Error> {
    sqlx::query_as::<_, WithdrawalRequest>("SELECT * FROM withdrawal_requests WHERE id = $1 FOR UPDATE")
        .bind(withdrawal_id)
        .fetch_optional(&mut *conn)
        .await
}

pub async fn update_withdrawal_status(
    conn: &mut PgConnection,
    withdrawal_id: Uuid,
    from: WithdrawalStatus,
    to: WithdrawalStatus,
    admin_notes: Option<&str>,
) -> Result<Option<WithdrawalRequest>, Error> {
    sqlx::query_as::<_, WithdrawalRequest>(
        r#"
        UPDATE withdrawal_requests
        SET status = $3, admin_notes = $4, processed_at = NOW()
        WHERE id = $1 AND status = $2
        RETURNING *
        "#
    )
    .bind(withdrawal_id)
    .bind(from)
    .bind(to)
    .bind(admin_notes)
    .fetch_optional(&mut *conn)
    .await
}
