// service/project_service.rs
use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    db::{
        db::DBClient,
        escrowdb,
        projectdb::{self, ProjectExt},
    },
    models::{
        escrowmodels::EscrowTransaction,
        ledgermodels::TransactionKind,
        notificationmodels::{NewNotification, NotificationKind},
        projectmodels::*,
        usermodel::User,
        StatusMachine,
    },
    service::{
        error::ServiceError, escrow_service::EscrowService, finish_tx,
        notification_service::NotificationService,
    },
};

#[derive(Debug, Clone, Serialize)]
pub struct ProjectStart {
    pub project: ActiveProject,
    pub escrow: Option<EscrowTransaction>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectCancellation {
    pub project: ActiveProject,
    pub refunded_escrow: Option<EscrowTransaction>,
}

#[derive(Debug, Clone)]
pub struct ProjectService {
    db_client: Arc<DBClient>,
}

impl ProjectService {
    pub fn new(db_client: Arc<DBClient>) -> Self {
        Self { db_client }
    }

    pub async fn create_job(
        &self,
        company: &User,
        title: String,
        description: String,
        budget: i64,
    ) -> Result<Job, ServiceError> {
        if !company.is_company() {
            return Err(ServiceError::Unauthorized);
        }
        if budget <= 0 {
            return Err(ServiceError::Validation("Budget must be greater than zero".to_string()));
        }

        let job = self.db_client.create_job(company.id, title, description, budget).await?;
        tracing::info!("Job {} posted by company {} with budget {}", job.id, company.id, budget);
        Ok(job)
    }

    pub async fn open_jobs(&self, limit: i64, offset: i64) -> Result<Vec<Job>, ServiceError> {
        Ok(self.db_client.get_open_jobs(limit, offset).await?)
    }

    pub async fn get_job(&self, job_id: Uuid) -> Result<Job, ServiceError> {
        self.db_client
            .get_job(job_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Job"))
    }

    pub async fn apply(
        &self,
        job_id: Uuid,
        freelancer: &User,
        proposed_rate: i64,
        cover_letter: String,
    ) -> Result<JobApplication, ServiceError> {
        if !freelancer.is_freelancer() {
            return Err(ServiceError::Unauthorized);
        }
        if proposed_rate <= 0 {
            return Err(ServiceError::Validation("Proposed rate must be greater than zero".to_string()));
        }

        let mut tx = self.db_client.pool.begin().await?;
        let result = Self::apply_in_tx(&mut *tx, job_id, freelancer.id, proposed_rate, &cover_letter).await;
        finish_tx(tx, result, "Job application").await
    }

    async fn apply_in_tx(
        conn: &mut PgConnection,
        job_id: Uuid,
        freelancer_id: Uuid,
        proposed_rate: i64,
        cover_letter: &str,
    ) -> Result<JobApplication, ServiceError> {
        let job = projectdb::lock_job(conn, job_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Job"))?;
        if job.status != JobStatus::Open {
            return Err(ServiceError::Conflict("Job is no longer accepting applications".to_string()));
        }

        let application = projectdb::insert_application(conn, job_id, freelancer_id, proposed_rate, cover_letter)
            .await
            .map_err(|e| ServiceError::conflict_on_unique(e, "You have already applied to this job"))?;

        NotificationService::notify(
            conn,
            NewNotification::new(
                job.company_id,
                NotificationKind::ApplicationReceived,
                "New application",
                format!("A freelancer applied to {}", job.title),
            )
            .with_metadata(json!({ "job_id": job.id, "application_id": application.id })),
        )
        .await?;

        Ok(application)
    }

    pub async fn applications(&self, job_id: Uuid, company_id: Uuid) -> Result<Vec<JobApplication>, ServiceError> {
        let job = self.get_job(job_id).await?;
        if job.company_id != company_id {
            return Err(ServiceError::Unauthorized);
        }
        Ok(self.db_client.get_job_applications(job_id).await?)
    }

    /// Accepts one application, closes the job to others and starts the project.
    /// Escrow is funded up front unless the company opts out.
    pub async fn accept_application(
        &self,
        application_id: Uuid,
        company_id: Uuid,
        fund_escrow: bool,
    ) -> Result<ProjectStart, ServiceError> {
        let mut tx = self.db_client.pool.begin().await?;
        let result = Self::accept_in_tx(&mut *tx, application_id, company_id, fund_escrow).await;
        finish_tx(tx, result, "Application acceptance").await
    }

    async fn accept_in_tx(
        conn: &mut PgConnection,
        application_id: Uuid,
        company_id: Uuid,
        fund_escrow: bool,
    ) -> Result<ProjectStart, ServiceError> {
        let application = projectdb::lock_application(conn, application_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Application"))?;
        let job = projectdb::lock_job(conn, application.job_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Job"))?;

        if job.company_id != company_id {
            return Err(ServiceError::Unauthorized);
        }
        job.status.transition(JobStatus::Filled)?;
        application.status.transition(ApplicationStatus::Accepted)?;

        projectdb::update_application_status(conn, application.id, ApplicationStatus::Pending, ApplicationStatus::Accepted)
            .await?
            .ok_or_else(|| ServiceError::Conflict("Application has already been decided".to_string()))?;
        let rejected = projectdb::reject_other_applications(conn, job.id, application.id).await?;
        projectdb::update_job_status(conn, job.id, JobStatus::Open, JobStatus::Filled)
            .await?
            .ok_or_else(|| ServiceError::Conflict("Job is no longer open".to_string()))?;

        let project = projectdb::insert_project(
            conn,
            &NewProject {
                job_id: Some(job.id),
                company_id: job.company_id,
                freelancer_id: application.freelancer_id,
                title: job.title.clone(),
                description: job.description.clone(),
                budget: job.budget,
                agreed_rate: Some(application.proposed_rate),
            },
        )
        .await?;

        let escrow = if fund_escrow {
            Some(EscrowService::fund_locked(conn, &project, application.proposed_rate, TransactionKind::EscrowHold).await?)
        } else {
            tracing::warn!("Project {} started without escrow at company {}'s request", project.id, company_id);
            None
        };

        NotificationService::notify(
            conn,
            NewNotification::new(
                application.freelancer_id,
                NotificationKind::ApplicationAccepted,
                "Application accepted",
                format!("You were hired for {}", job.title),
            )
            .for_project(project.id),
        )
        .await?;

        tracing::info!(
            "Project {} started for job {} ({} other applications rejected)",
            project.id,
            job.id,
            rejected
        );

        Ok(ProjectStart { project, escrow })
    }

    pub async fn update_progress(
        &self,
        project_id: Uuid,
        freelancer_id: Uuid,
        progress: i32,
    ) -> Result<ActiveProject, ServiceError> {
        if !(0..=100).contains(&progress) {
            return Err(ServiceError::Validation("Progress must be between 0 and 100".to_string()));
        }

        let project = self.load(project_id).await?;
        if project.freelancer_id != freelancer_id {
            return Err(ServiceError::Unauthorized);
        }
        if project.status.is_terminal() {
            return Err(ServiceError::Conflict(format!("Project is already {}", project.status.to_str())));
        }

        self.db_client
            .update_project_progress(project_id, freelancer_id, progress)
            .await?
            .ok_or_else(|| ServiceError::Conflict("Project is no longer active".to_string()))
    }

    /// Cancels a live project and returns any held escrow to the company.
    pub async fn cancel_project(&self, project_id: Uuid, company_id: Uuid) -> Result<ProjectCancellation, ServiceError> {
        let mut tx = self.db_client.pool.begin().await?;
        let result = Self::cancel_in_tx(&mut *tx, project_id, company_id).await;
        finish_tx(tx, result, "Project cancellation").await
    }

    async fn cancel_in_tx(
        conn: &mut PgConnection,
        project_id: Uuid,
        company_id: Uuid,
    ) -> Result<ProjectCancellation, ServiceError> {
        let project = projectdb::lock_project(conn, project_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Project"))?;
        if project.company_id != company_id {
            return Err(ServiceError::Unauthorized);
        }
        project.status.transition(ProjectStatus::Cancelled)?;

        let cancelled = projectdb::update_project_status(conn, project.id, project.status, ProjectStatus::Cancelled)
            .await?
            .ok_or_else(|| ServiceError::Conflict("Project status changed concurrently".to_string()))?;

        let refunded_escrow = match escrowdb::lock_held_escrow_for_project(conn, project.id).await? {
            Some(escrow) => Some(EscrowService::refund_locked(conn, &escrow).await?.0),
            None => None,
        };

        NotificationService::notify(
            conn,
            NewNotification::new(
                project.freelancer_id,
                NotificationKind::ProjectCancelled,
                "Project cancelled",
                format!("{} was cancelled by the company", project.title),
            )
            .for_project(project.id),
        )
        .await?;

        tracing::info!("Project {} cancelled by company {}", project.id, company_id);
        Ok(ProjectCancellation { project: cancelled, refunded_escrow })
    }

    async fn load(&self, project_id: Uuid) -> Result<ActiveProject, ServiceError> {
        self.db_client
            .get_project(project_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Project"))
    }

    /// Visible to the two parties only.
    pub async fn project(&self, project_id: Uuid, user_id: Uuid) -> Result<ActiveProject, ServiceError> {
        let project = self.load(project_id).await?;
        if !project.is_party(user_id) {
            return Err(ServiceError::Unauthorized);
        }
        Ok(project)
    }

    pub async fn projects_for(&self, user_id: Uuid) -> Result<Vec<ActiveProject>, ServiceError> {
        Ok(self.db_client.get_projects_for_user(user_id).await?)
    }

    pub async fn past_projects_for(&self, user_id: Uuid) -> Result<Vec<PastProject>, ServiceError> {
        Ok(self.db_client.get_past_projects_for_user(user_id).await?)
    }
}
