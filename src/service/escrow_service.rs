// service/escrow_service.rs
use std::sync::Arc;

use serde_json::json;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    db::{
        db::DBClient,
        escrowdb::{self, EscrowExt},
        projectdb,
    },
    models::{
        escrowmodels::{EscrowStatus, EscrowTransaction},
        ledgermodels::{LedgerEntry, LedgerTransaction, TransactionKind},
        notificationmodels::{NewNotification, NotificationKind},
        projectmodels::ActiveProject,
        StatusMachine,
    },
    service::{
        error::ServiceError, finish_tx, ledger_service::LedgerService,
        notification_service::NotificationService,
    },
};

#[derive(Debug, Clone)]
pub struct EscrowService {
    db_client: Arc<DBClient>,
}

impl EscrowService {
    pub fn new(db_client: Arc<DBClient>) -> Self {
        Self { db_client }
    }

    pub async fn fund(
        &self,
        project_id: Uuid,
        company_id: Uuid,
        freelancer_id: Uuid,
        amount: i64,
    ) -> Result<EscrowTransaction, ServiceError> {
        if amount <= 0 {
            return Err(ServiceError::Validation("Escrow amount must be greater than zero".to_string()));
        }

        let mut tx = self.db_client.pool.begin().await?;
        let result = Self::fund_in_tx(&mut *tx, project_id, company_id, freelancer_id, amount).await;
        finish_tx(tx, result, "Escrow funding").await
    }

    async fn fund_in_tx(
        conn: &mut PgConnection,
        project_id: Uuid,
        company_id: Uuid,
        freelancer_id: Uuid,
        amount: i64,
    ) -> Result<EscrowTransaction, ServiceError> {
        let project = projectdb::lock_project(conn, project_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Project"))?;

        if project.company_id != company_id || project.freelancer_id != freelancer_id {
            return Err(ServiceError::Unauthorized);
        }

        Self::fund_locked(conn, &project, amount, TransactionKind::EscrowHold).await
    }

    /// Debits the company and opens the held row. The caller holds the project lock.
    pub async fn fund_locked(
        conn: &mut PgConnection,
        project: &ActiveProject,
        amount: i64,
        kind: TransactionKind,
    ) -> Result<EscrowTransaction, ServiceError> {
        if project.status.is_terminal() {
            return Err(ServiceError::Conflict(format!(
                "Project is already {}",
                project.status.to_str()
            )));
        }

        if escrowdb::lock_held_escrow_for_project(conn, project.id).await?.is_some() {
            return Err(ServiceError::Conflict("Project already has funds held in escrow".to_string()));
        }

        LedgerService::debit(
            conn,
            &LedgerEntry::new(
                project.company_id,
                amount,
                kind,
                format!("Escrow for project: {}", project.title),
            )
            .for_project(project.id),
        )
        .await?;

        let escrow = escrowdb::insert_held_escrow(conn, project.id, project.company_id, project.freelancer_id, amount)
            .await
            .map_err(|e| ServiceError::conflict_on_unique(e, "Project already has funds held in escrow"))?;

        NotificationService::notify(
            conn,
            NewNotification::new(
                project.freelancer_id,
                NotificationKind::EscrowFunded,
                "Escrow funded",
                format!("{} VCreds are held in escrow for {}", amount, project.title),
            )
            .for_project(project.id)
            .with_metadata(json!({ "escrow_id": escrow.id, "amount": amount })),
        )
        .await?;

        tracing::info!("Escrow {} funded with {} VCreds for project {}", escrow.id, amount, project.id);
        Ok(escrow)
    }

    /// Approval-time fallback for projects that were never funded.
    pub async fn fund_on_approval(
        conn: &mut PgConnection,
        project: &ActiveProject,
        allowed: bool,
    ) -> Result<EscrowTransaction, ServiceError> {
        if !allowed {
            return Err(ServiceError::Conflict("No escrow is held for this project".to_string()));
        }

        let amount = project.settlement_amount();
        tracing::warn!(
            "Project {} has no held escrow at approval; funding {} VCreds from company {}",
            project.id,
            amount,
            project.company_id
        );

        Self::fund_locked(conn, project, amount, TransactionKind::ProjectPayment).await
    }

    /// held → released, crediting the freelancer. The row must already be locked.
    pub async fn release_locked(
        conn: &mut PgConnection,
        escrow: &EscrowTransaction,
    ) -> Result<(EscrowTransaction, LedgerTransaction), ServiceError> {
        escrow.status.transition(EscrowStatus::Released)?;

        let released = escrowdb::update_escrow_status(conn, escrow.id, EscrowStatus::Held, EscrowStatus::Released)
            .await?
            .ok_or_else(|| ServiceError::Conflict("Escrow has already been settled".to_string()))?;

        let payment = LedgerService::credit(
            conn,
            &LedgerEntry::new(
                escrow.freelancer_id,
                escrow.amount,
                TransactionKind::Earned,
                "Escrow released for completed project",
            )
            .for_project(escrow.project_id)
            .with_metadata(json!({ "escrow_id": escrow.id })),
        )
        .await?;

        tracing::info!("Escrow {} released {} VCreds to {}", escrow.id, escrow.amount, escrow.freelancer_id);
        Ok((released, payment))
    }

    /// held → refunded, crediting the company. The row must already be locked.
    pub async fn refund_locked(
        conn: &mut PgConnection,
        escrow: &EscrowTransaction,
    ) -> Result<(EscrowTransaction, LedgerTransaction), ServiceError> {
        escrow.status.transition(EscrowStatus::Refunded)?;

        let refunded = escrowdb::update_escrow_status(conn, escrow.id, EscrowStatus::Held, EscrowStatus::Refunded)
            .await?
            .ok_or_else(|| ServiceError::Conflict("Escrow has already been settled".to_string()))?;

        let refund = LedgerService::credit(
            conn,
            &LedgerEntry::new(
                escrow.company_id,
                escrow.amount,
                TransactionKind::Refund,
                "Escrow refunded",
            )
            .for_project(escrow.project_id)
            .with_metadata(json!({ "escrow_id": escrow.id })),
        )
        .await?;

        tracing::info!("Escrow {} refunded {} VCreds to {}", escrow.id, escrow.amount, escrow.company_id);
        Ok((refunded, refund))
    }

    pub async fn release(&self, escrow_id: Uuid) -> Result<EscrowTransaction, ServiceError> {
        let mut tx = self.db_client.pool.begin().await?;
        let result = Self::release_in_tx(&mut *tx, escrow_id).await;
        finish_tx(tx, result, "Escrow release").await
    }

    async fn release_in_tx(conn: &mut PgConnection, escrow_id: Uuid) -> Result<EscrowTransaction, ServiceError> {
        let escrow = escrowdb::lock_escrow(conn, escrow_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Escrow"))?;
        let (released, _) = Self::release_locked(conn, &escrow).await?;

        NotificationService::notify(
            conn,
            NewNotification::new(
                escrow.freelancer_id,
                NotificationKind::PaymentReceived,
                "Payment received",
                format!("{} VCreds were released to you from escrow", escrow.amount),
            )
            .for_project(escrow.project_id),
        )
        .await?;

        Ok(released)
    }

    pub async fn refund(&self, escrow_id: Uuid) -> Result<EscrowTransaction, ServiceError> {
        let mut tx = self.db_client.pool.begin().await?;
        let result = Self::refund_in_tx(&mut *tx, escrow_id).await;
        finish_tx(tx, result, "Escrow refund").await
    }

    async fn refund_in_tx(conn: &mut PgConnection, escrow_id: Uuid) -> Result<EscrowTransaction, ServiceError> {
        let escrow = escrowdb::lock_escrow(conn, escrow_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Escrow"))?;
        let (refunded, _) = Self::refund_locked(conn, &escrow).await?;

        NotificationService::notify(
            conn,
            NewNotification::new(
                escrow.company_id,
                NotificationKind::EscrowRefunded,
                "Escrow refunded",
                format!("{} VCreds were returned to your balance", escrow.amount),
            )
            .for_project(escrow.project_id),
        )
        .await?;

        Ok(refunded)
    }

    pub async fn get(&self, escrow_id: Uuid) -> Result<EscrowTransaction, ServiceError> {
        self.db_client
            .get_escrow(escrow_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Escrow"))
    }

    pub async fn for_project(&self, project_id: Uuid) -> Result<Vec<EscrowTransaction>, ServiceError> {
        Ok(self.db_client.get_project_escrows(project_id).await?)
    }
}
