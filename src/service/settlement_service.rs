// service/settlement_service.rs
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use sqlx::PgConnection;

use crate::{
    db::{escrowdb, projectdb::{self, PastProjectRecord}, workdb},
    models::{
        escrowmodels::EscrowTransaction,
        ledgermodels::LedgerTransaction,
        notificationmodels::{NewNotification, NotificationKind},
        projectmodels::{ActiveProject, PastProject, ProjectStatus},
        workmodels::WorkSubmission,
        StatusMachine,
    },
    service::{
        error::ServiceError, escrow_service::EscrowService, ledger_service::LedgerService,
        notification_service::NotificationService,
    },
};

#[derive(Debug, Clone, Serialize)]
pub struct Settlement {
    pub escrow: EscrowTransaction,
    pub payment: LedgerTransaction,
    pub past_project: PastProject,
}

/// Pays out and archives a project once its work is approved.
#[derive(Debug, Clone)]
pub struct SettlementService {
    allow_fund_on_approval: bool,
}

impl SettlementService {
    pub fn new(allow_fund_on_approval: bool) -> Self {
        Self { allow_fund_on_approval }
    }

    /// Runs on the approval's connection; the caller holds the project lock and
    /// commits or rolls back everything together.
    pub async fn settle(
        &self,
        conn: &mut PgConnection,
        project: &ActiveProject,
        approved: &WorkSubmission,
        freelancer_rating: Option<i32>,
    ) -> Result<Settlement, ServiceError> {
        project.status.transition(ProjectStatus::Completed)?;

        LedgerService::lock_accounts(conn, project.company_id, project.freelancer_id).await?;

        let held = match escrowdb::lock_held_escrow_for_project(conn, project.id).await? {
            Some(escrow) => escrow,
            None => {
                if let Some(released) = escrowdb::lock_released_escrow_for_project(conn, project.id).await? {
                    tracing::warn!(
                        "Approval of project {} refused: escrow {} was already released",
                        project.id,
                        released.id
                    );
                    return Err(ServiceError::Conflict(
                        "Escrow for this project has already been released".to_string(),
                    ));
                }
                EscrowService::fund_on_approval(conn, project, self.allow_fund_on_approval).await?
            }
        };
        let (escrow, payment) = EscrowService::release_locked(conn, &held).await?;

        let (submission_count, revision_count) = workdb::count_submissions(conn, project.id).await?;

        let past_project = projectdb::insert_past_project(
            conn,
            &PastProjectRecord {
                project,
                final_amount: escrow.amount,
                submission_count: submission_count as i32,
                revision_count: revision_count as i32,
                final_file_path: &approved.file_path,
                final_file_name: &approved.file_name,
                freelancer_rating,
                completed_at: Utc::now(),
            },
        )
        .await
        .map_err(|e| ServiceError::conflict_on_unique(e, "Project has already been archived"))?;

        projectdb::update_project_status(conn, project.id, project.status, ProjectStatus::Completed)
            .await?
            .ok_or_else(|| ServiceError::Conflict("Project status changed concurrently".to_string()))?;

        NotificationService::notify(
            conn,
            NewNotification::new(
                project.freelancer_id,
                NotificationKind::PaymentReceived,
                "Payment received",
                format!("{} VCreds were released for {}", escrow.amount, project.title),
            )
            .for_project(project.id)
            .with_metadata(json!({ "escrow_id": escrow.id, "amount": escrow.amount })),
        )
        .await?;

        NotificationService::notify(
            conn,
            NewNotification::new(
                project.company_id,
                NotificationKind::WorkApproved,
                "Work approved",
                format!("{} is complete and has been archived", project.title),
            )
            .for_project(project.id)
            .with_metadata(json!({ "past_project_id": past_project.id })),
        )
        .await?;

        tracing::info!(
            "Project {} settled: {} VCreds to {}, {} submissions, {} revisions",
            project.id,
            escrow.amount,
            project.freelancer_id,
            submission_count,
            revision_count
        );

        Ok(Settlement {
            escrow,
            payment,
            past_project,
        })
    }
}
