use async_trait::async_trait;
use sqlx::{Error, PgConnection};
use uuid::Uuid;

use super::db::DBClient;
use crate::models::escrowmodels::{EscrowStatus, EscrowTransaction};

#[async_trait]
pub trait EscrowExt {
    async fn get_escrow(&self, escrow_id: Uuid) -> Result<Option<EscrowTransaction>, Error>;

    async fn get_project_escrows(&self, project_id: Uuid) -> Result<Vec<EscrowTransaction>, Error>;
}

#[async_trait]
impl EscrowExt for DBClient {
    async fn get_escrow(&self, escrow_id: Uuid) -> Result<Option<EscrowTransaction>, Error> {
        sqlx::query_as::<_, EscrowTransaction>("SELECT * FROM escrow_transactions WHERE id = $1")
            .bind(escrow_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_project_escrows(&self, project_id: Uuid) -> Result<Vec<EscrowTransaction>, Error> {
        sqlx::query_as::<_, EscrowTransaction>(
            "SELECT * FROM escrow_transactions WHERE project_id = $1 ORDER BY held_at DESC"
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
    }
}

/// Fails with a unique violation when the project already has a held row.
pub async fn insert_held_escrow(
    conn: &mut PgConnection,
    project_id: Uuid,
    company_id: Uuid,
    freelancer_id: Uuid,
    amount: i64,
) -> Result<EscrowTransaction, Error> {
    sqlx::query_as::<_, EscrowTransaction>(
        r#"
        INSERT INTO escrow_transactions (project_id, company_id, freelancer_id, amount, status)
        VALUES ($1, $2, $3, $4, 'held'::escrow_status)
        RETURNING *
        "#
    )
    .bind(project_id)
    .bind(company_id)
    .bind(freelancer_id)
    .bind(amount)
    .fetch_one(&mut *conn)
    .await
}

pub async fn lock_escrow(conn: &mut PgConnection, escrow_id: Uuid) -> Result<Option<EscrowTransaction>, Error> {
    sqlx::query_as::<_, EscrowTransaction>("SELECT * FROM escrow_transactions WHERE id = $1 FOR UPDATE")
        .bind(escrow_id)
        .fetch_optional(&mut *conn)
        .await
}

pub async fn lock_held_escrow_for_project(
    conn: &mut PgConnection,
    project_id: Uuid,
) -> Result<Option<EscrowTransaction>, Error> {
    sqlx::query_as::<_, EscrowTransaction>(
        "SELECT * FROM escrow_transactions WHERE project_id = $1 AND status = 'held' FOR UPDATE"
    )
    .bind(project_id)
    .fetch_optional(&mut *conn)
    .await
}

pub async fn lock_released_escrow_for_project(
    conn: &mut PgConnection,
    project_id: Uuid,
) -> Result<Option<EscrowTransaction>, Error> {
    sqlx::query_as::<_, EscrowTransaction>(
        r#"
        SELECT * FROM escrow_transactions
        WHERE project_id = $1 AND status = 'released'
        ORDER BY released_at DESC
        LIMIT 1
        FOR UPDATE
        "#
    )
    .bind(project_id)
    .fetch_optional(&mut *conn)
    .await
}

pub async fn update_escrow_status(
    conn: &mut PgConnection,
    escrow_id: Uuid,
    from: EscrowStatus,
    to: EscrowStatus,
) -> Result<Option<EscrowTransaction>, Error> {
    sqlx::query_as::<_, EscrowTransaction>(
        r#"
        UPDATE escrow_transactions
        SET status = $3, released_at = NOW()
        WHERE id = $1 AND status = $2
        RETURNING *
        "#
    )
    .bind(escrow_id)
    .bind(from)
    .bind(to)
    .fetch_optional(&mut *conn)
    .await
}
