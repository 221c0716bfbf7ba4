// service/work_service.rs
use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    db::{
        db::DBClient,
        escrowdb::EscrowExt,
        projectdb::{self, ProjectExt},
        workdb::{self, WorkExt},
    },
    models::{
        escrowmodels::EscrowStatus,
        notificationmodels::{NewNotification, NotificationKind},
        projectmodels::{ActiveProject, ProjectStatus},
        workmodels::*,
        StatusMachine,
    },
    service::{
        error::ServiceError,
        finish_tx,
        notification_service::NotificationService,
        settlement_service::{Settlement, SettlementService},
    },
    utils::upload::{validate_upload, FileStore, StoredFile},
};

#[derive(Debug, Clone)]
pub struct WorkUpload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct ReviewRequest {
    pub project_id: Uuid,
    pub submission_id: Uuid,
    pub company_id: Uuid,
    pub outcome: ReviewOutcome,
    pub revision_notes: Option<String>,
    pub rating: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewResult {
    pub submission: WorkSubmission,
    pub review: WorkReview,
    pub settlement: Option<Settlement>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FileAccess {
    View,
    Download,
}

#[derive(Debug, Clone)]
pub struct WorkService {
    db_client: Arc<DBClient>,
    file_store: FileStore,
    settlement: SettlementService,
}

impl WorkService {
    pub fn new(db_client: Arc<DBClient>, file_store: FileStore, settlement: SettlementService) -> Self {
        Self {
            db_client,
            file_store,
            settlement,
        }
    }

    async fn load_project(&self, project_id: Uuid) -> Result<ActiveProject, ServiceError> {
        self.db_client
            .get_project(project_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Project"))
    }

    fn check_open_for_work(project: &ActiveProject, freelancer_id: Uuid) -> Result<(), ServiceError> {
        if project.freelancer_id != freelancer_id {
            return Err(ServiceError::Unauthorized);
        }
        if project.status.is_terminal() {
            return Err(ServiceError::Conflict(format!(
                "Cannot submit work for a {} project",
                project.status.to_str()
            )));
        }
        Ok(())
    }

    /// Stores the file, then records the next numbered submission.
    pub async fn submit(
        &self,
        project_id: Uuid,
        freelancer_id: Uuid,
        upload: WorkUpload,
        notes: Option<String>,
    ) -> Result<WorkSubmission, ServiceError> {
        validate_upload(&upload.file_name, &upload.mime_type, upload.bytes.len())
            .map_err(ServiceError::Validation)?;

        let project = self.load_project(project_id).await?;
        Self::check_open_for_work(&project, freelancer_id)?;

        let stored = self
            .file_store
            .save(project_id, &upload.file_name, &upload.mime_type, &upload.bytes)
            .await?;
        let notes = notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());

        let mut tx = self.db_client.pool.begin().await?;
        let result = Self::submit_in_tx(&mut *tx, project_id, freelancer_id, &stored, notes.as_deref()).await;
        let result = finish_tx(tx, result, "Work submission").await;

        if result.is_err() {
            self.file_store.remove(&stored.path).await;
        }
        result
    }

    async fn submit_in_tx(
        conn: &mut PgConnection,
        project_id: Uuid,
        freelancer_id: Uuid,
        stored: &StoredFile,
        notes: Option<&str>,
    ) -> Result<WorkSubmission, ServiceError> {
        let project = projectdb::lock_project(conn, project_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Project"))?;
        Self::check_open_for_work(&project, freelancer_id)?;

        let number = workdb::next_submission_number(conn, project.id).await?;
        let submission = workdb::insert_submission(conn, project.id, freelancer_id, number, stored, notes)
            .await
            .map_err(|e| ServiceError::conflict_on_unique(e, "Submission number already taken, please retry"))?;

        if project.status == ProjectStatus::InProgress {
            project.status.transition(ProjectStatus::UnderReview)?;
            projectdb::update_project_status(conn, project.id, ProjectStatus::InProgress, ProjectStatus::UnderReview)
                .await?
                .ok_or_else(|| ServiceError::Conflict("Project status changed concurrently".to_string()))?;
        }

        NotificationService::notify(
            conn,
            NewNotification::new(
                project.company_id,
                NotificationKind::WorkSubmitted,
                "Work submitted",
                format!("Submission #{} is ready for review on {}", number, project.title),
            )
            .for_project(project.id)
            .with_metadata(json!({ "submission_id": submission.id })),
        )
        .await?;

        tracing::info!(
            "Submission #{} ({}) recorded for project {}",
            number,
            submission.id,
            project.id
        );
        Ok(submission)
    }

    /// Marks a pending submission as being looked at. Already-reviewed
    /// submissions are returned unchanged.
    pub async fn open_for_review(&self, submission_id: Uuid, company_id: Uuid) -> Result<WorkSubmission, ServiceError> {
        let submission = self.company_submission(submission_id, company_id).await?;

        if submission.status != SubmissionStatus::Pending {
            return Ok(submission);
        }

        match self.db_client.mark_submission_opened(submission.id).await? {
            Some(opened) => {
                tracing::info!("Submission {} opened for review", opened.id);
                Ok(opened)
            }
            None => Ok(submission),
        }
    }

    pub async fn review(&self, request: ReviewRequest) -> Result<ReviewResult, ServiceError> {
        let notes = request
            .revision_notes
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);

        if request.outcome == ReviewOutcome::NeedsRevision && notes.is_none() {
            return Err(ServiceError::Validation(
                "Revision notes are required when requesting changes".to_string(),
            ));
        }
        if let Some(rating) = request.rating {
            if !(1..=5).contains(&rating) {
                return Err(ServiceError::Validation("Rating must be between 1 and 5".to_string()));
            }
        }

        let mut tx = self.db_client.pool.begin().await?;
        let result = self.review_in_tx(&mut *tx, &request, notes.as_deref()).await;
        finish_tx(tx, result, "Work review").await
    }

    async fn review_in_tx(
        &self,
        conn: &mut PgConnection,
        request: &ReviewRequest,
        notes: Option<&str>,
    ) -> Result<ReviewResult, ServiceError> {
        let mut project = projectdb::lock_project(conn, request.project_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Project"))?;
        if project.company_id != request.company_id {
            return Err(ServiceError::Unauthorized);
        }

        let submission = workdb::lock_submission(conn, request.submission_id)
            .await?
            .filter(|s| s.project_id == project.id)
            .ok_or_else(|| ServiceError::not_found("Submission"))?;

        if submission.status.is_terminal() {
            return Err(ServiceError::Conflict("Submission has already been reviewed".to_string()));
        }
        if project.status.is_terminal() {
            return Err(ServiceError::Conflict(format!("Project is already {}", project.status.to_str())));
        }

        let next: SubmissionStatus = request.outcome.into();
        submission.status.transition(next)?;
        let reviewed = workdb::update_submission_status(conn, submission.id, submission.status, next)
            .await?
            .ok_or_else(|| ServiceError::Conflict("Submission has already been reviewed".to_string()))?;

        let review = workdb::insert_review(conn, &reviewed, request.company_id, request.outcome, notes)
            .await
            .map_err(|e| ServiceError::conflict_on_unique(e, "Submission has already been reviewed"))?;

        // An older pending submission can be reviewed while the project is back in progress.
        if project.status == ProjectStatus::InProgress {
            project = projectdb::update_project_status(conn, project.id, ProjectStatus::InProgress, ProjectStatus::UnderReview)
                .await?
                .ok_or_else(|| ServiceError::Conflict("Project status changed concurrently".to_string()))?;
        }

        let settlement = match request.outcome {
            ReviewOutcome::Approved => {
                let settlement = self
                    .settlement
                    .settle(conn, &project, &reviewed, request.rating)
                    .await?;
                Some(settlement)
            }
            ReviewOutcome::NeedsRevision => {
                project.status.transition(ProjectStatus::InProgress)?;
                projectdb::update_project_status(conn, project.id, ProjectStatus::UnderReview, ProjectStatus::InProgress)
                    .await?
                    .ok_or_else(|| ServiceError::Conflict("Project status changed concurrently".to_string()))?;

                NotificationService::notify(
                    conn,
                    NewNotification::new(
                        project.freelancer_id,
                        NotificationKind::RevisionRequested,
                        "Revision requested",
                        notes.unwrap_or_default().to_string(),
                    )
                    .for_project(project.id)
                    .with_metadata(json!({
                        "submission_id": reviewed.id,
                        "submission_number": reviewed.submission_number,
                    })),
                )
                .await?;

                tracing::info!("Revision requested on submission {} of project {}", reviewed.id, project.id);
                None
            }
        };

        Ok(ReviewResult {
            submission: reviewed,
            review,
            settlement,
        })
    }

    async fn company_submission(&self, submission_id: Uuid, company_id: Uuid) -> Result<WorkSubmission, ServiceError> {
        let submission = self
            .db_client
            .get_submission(submission_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Submission"))?;
        let project = self.load_project(submission.project_id).await?;
        if project.company_id != company_id {
            return Err(ServiceError::Unauthorized);
        }
        Ok(submission)
    }

    /// Inline viewing only needs the company; downloads also need released escrow.
    pub async fn open_file(
        &self,
        submission_id: Uuid,
        company_id: Uuid,
        access: FileAccess,
    ) -> Result<(WorkSubmission, Vec<u8>), ServiceError> {
        let submission = match access {
            FileAccess::View => self.open_for_review(submission_id, company_id).await?,
            FileAccess::Download => {
                let submission = self.company_submission(submission_id, company_id).await?;
                let released = self
                    .db_client
                    .get_project_escrows(submission.project_id)
                    .await?
                    .iter()
                    .any(|e| e.status == EscrowStatus::Released);
                if !released {
                    return Err(ServiceError::Conflict(
                        "Files can be downloaded once payment has been released".to_string(),
                    ));
                }
                submission
            }
        };

        let bytes = self.file_store.read(&submission.file_path).await?;
        Ok((submission, bytes))
    }

    pub async fn submissions_for_project(&self, project_id: Uuid, user_id: Uuid) -> Result<Vec<WorkSubmission>, ServiceError> {
        let project = self.load_project(project_id).await?;
        if !project.is_party(user_id) {
            return Err(ServiceError::Unauthorized);
        }
        Ok(self.db_client.get_project_submissions(project_id).await?)
    }

    pub async fn submission(&self, submission_id: Uuid, user_id: Uuid) -> Result<(WorkSubmission, Option<WorkReview>), ServiceError> {
        let submission = self
            .db_client
            .get_submission(submission_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Submission"))?;
        let project = self.load_project(submission.project_id).await?;
        if !project.is_party(user_id) {
            return Err(ServiceError::Unauthorized);
        }
        let review = self.db_client.get_submission_review(submission_id).await?;
        Ok((submission, review))
    }
}
