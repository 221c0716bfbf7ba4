// db/ledgerdb.rs
use async_trait::async_trait;
use sqlx::{Error, PgConnection};
use uuid::Uuid;

use super::db::DBClient;
use crate::models::ledgermodels::*;

#[async_trait]
pub trait LedgerExt {
    async fn get_balance(&self, user_id: Uuid) -> Result<i64, Error>;

    async fn get_ledger_transactions(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<LedgerTransaction>, Error>;

    /// Sum of the entries reflected in the cached balance.
    async fn get_ledger_sum(&self, user_id: Uuid) -> Result<i64, Error>;

    async fn get_ledger_transaction(&self, transaction_id: Uuid) -> Result<Option<LedgerTransaction>, Error>;
}

#[async_trait]
impl LedgerExt for DBClient {
    async fn get_balance(&self, user_id: Uuid) -> Result<i64, Error> {
        let balance = sqlx::query_scalar::<_, i64>(
            "SELECT balance FROM vcred_accounts WHERE user_id = $1"
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(balance.unwrap_or(0))
    }

    async fn get_ledger_transactions(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<LedgerTransaction>, Error> {
        sqlx::query_as::<_, LedgerTransaction>(
            r#"
            SELECT * FROM vcred_transactions
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_ledger_sum(&self, user_id: Uuid) -> Result<i64, Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COALESCE(SUM(amount), 0)::BIGINT FROM vcred_transactions
            WHERE user_id = $1 AND status IN ('pending', 'completed')
            "#
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_ledger_transaction(&self, transaction_id: Uuid) -> Result<Option<LedgerTransaction>, Error> {
        sqlx::query_as::<_, LedgerTransaction>("SELECT * FROM vcred_transactions WHERE id = $1")
            .bind(transaction_id)
            .fetch_optional(&self.pool)
            .await
    }
}

/// Locks the caller's account row, creating it on first use.
pub async fn lock_account(conn: &mut PgConnection, user_id: Uuid) -> Result<i64, Error> {
    sqlx::query("INSERT INTO vcred_accounts (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    sqlx::query_scalar::<_, i64>("SELECT balance FROM vcred_accounts WHERE user_id = $1 FOR UPDATE")
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await
}

pub async fn set_balance(conn: &mut PgConnection, user_id: Uuid, balance: i64) -> Result<(), Error> {
    sqlx::query("UPDATE vcred_accounts SET balance = $2, updated_at = NOW() WHERE user_id = $1")
        .bind(user_id)
        .bind(balance)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Appends a log row. `signed_amount` is positive for credits and negative for debits.
pub async fn insert_transaction(
    conn: &mut PgConnection,
    entry: &LedgerEntry,
    signed_amount: i64,
) -> Result<LedgerTransaction, Error> {
    sqlx::query_as::<_, LedgerTransaction>(
        r#"
        INSERT INTO vcred_transactions
        (user_id, amount, kind, status, description, project_id, reference, metadata)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#
    )
    .bind(entry.user_id)
    .bind(signed_amount)
    .bind(entry.kind)
    .bind(entry.status)
    .bind(&entry.description)
    .bind(entry.project_id)
    .bind(generate_transaction_reference())
    .bind(&entry.metadata)
    .fetch_one(&mut *conn)
    .await
}

pub async fn lock_transaction(conn: &mut PgConnection, transaction_id: Uuid) -> Result<Option<LedgerTransaction>, Error> {
    sqlx::query_as::<_, LedgerTransaction>("SELECT * FROM vcred_transactions WHERE id = $1 FOR UPDATE")
        .bind(transaction_id)
        .fetch_optional(&mut *conn)
        .await
}

/// Compare-and-set on the entry status. `None` means another writer moved it first.
pub async fn update_transaction_status(
    conn: &mut PgConnection,
    transaction_id: Uuid,
    from: TransactionStatus,
    to: TransactionStatus,
) -> Result<Option<LedgerTransaction>, Error> {
    sqlx::query_as::<_, LedgerTransaction>(
        r#"
        UPDATE vcred_transactions
        SET status = $3, updated_at = NOW()
        WHERE id = $1 AND status = $2
        RETURNING *
        "#
    )
    .bind(transaction_id)
    .bind(from)
    .bind(to)
    .fetch_optional(&mut *conn)
    .await
}
