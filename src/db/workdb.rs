use async_trait::async_trait;
use sqlx::{Error, PgConnection};
use uuid::Uuid;

use super::db::DBClient;
use crate::{
    models::workmodels::*,
    utils::upload::StoredFile,
};

#[async_trait]
pub trait WorkExt {
    async fn get_submission(&self, submission_id: Uuid) -> Result<Option<WorkSubmission>, Error>;

    async fn get_project_submissions(&self, project_id: Uuid) -> Result<Vec<WorkSubmission>, Error>;

    async fn get_submission_review(&self, submission_id: Uuid) -> Result<Option<WorkReview>, Error>;

    /// Pending → under_review. Returns `None` when the submission had already moved on.
    async fn mark_submission_opened(&self, submission_id: Uuid) -> Result<Option<WorkSubmission>, Error>;
}

#[async_trait]
impl WorkExt for DBClient {
    async fn get_submission(&self, submission_id: Uuid) -> Result<Option<WorkSubmission>, Error> {
        sqlx::query_as::<_, WorkSubmission>("SELECT * FROM work_submissions WHERE id = $1")
            .bind(submission_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_project_submissions(&self, project_id: Uuid) -> Result<Vec<WorkSubmission>, Error> {
        sqlx::query_as::<_, WorkSubmission>(
            r#"
            SELECT * FROM work_submissions
            WHERE project_id = $1
            ORDER BY submission_number ASC
            "#
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_submission_review(&self, submission_id: Uuid) -> Result<Option<WorkReview>, Error> {
        sqlx::query_as::<_, WorkReview>("SELECT * FROM work_reviews WHERE submission_id = $1")
            .bind(submission_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn mark_submission_opened(&self, submission_id: Uuid) -> Result<Option<WorkSubmission>, Error> {
        sqlx::query_as::<_, WorkSubmission>(
            r#"
            UPDATE work_submissions SET status = 'under_review'
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#
        )
        .bind(submission_id)
        .fetch_optional(&self.pool)
        .await
    }
}

/// Caller must hold the project row lock.
pub async fn next_submission_number(conn: &mut PgConnection, project_id: Uuid) -> Result<i32, Error> {
    sqlx::query_scalar::<_, i32>(
        "SELECT COALESCE(MAX(submission_number), 0) + 1 FROM work_submissions WHERE project_id = $1"
    )
    .bind(project_id)
    .fetch_one(&mut *conn)
    .await
}

pub async fn insert_submission(
    conn: &mut PgConnection,
    project_id: Uuid,
    freelancer_id: Uuid,
    submission_number: i32,
    file: &StoredFile,
    notes: Option<&str>,
) -> Result<WorkSubmission, Error> {
    sqlx::query_as::<_, WorkSubmission>(
        r#"
        INSERT INTO work_submissions
        (project_id, freelancer_id, submission_number, file_path, file_name, file_size, mime_type, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#
    )
    .bind(project_id)
    .bind(freelancer_id)
    .bind(submission_number)
    .bind(&file.path)
    .bind(&file.file_name)
    .bind(file.size)
    .bind(&file.mime_type)
    .bind(notes)
    .fetch_one(&mut *conn)
    .await
}

pub async fn lock_submission(conn: &mut PgConnection, submission_id: Uuid) -> Result<Option<WorkSubmission>, Error> {
    sqlx::query_as::<_, WorkSubmission>("SELECT * FROM work_submissions WHERE id = $1 FOR UPDATE")
        .bind(submission_id)
        .fetch_optional(&mut *conn)
        .await
}

pub async fn update_submission_status(
    conn: &mut PgConnection,
    submission_id: Uuid,
    from: SubmissionStatus,
    to: SubmissionStatus,
) -> Result<Option<WorkSubmission>, Error> {
    sqlx::query_as::<_, WorkSubmission>(
        r#"
        UPDATE work_submissions
        SET status = $3, reviewed_at = NOW()
        WHERE id = $1 AND status = $2
        RETURNING *
        "#
    )
    .bind(submission_id)
    .bind(from)
    .bind(to)
    .fetch_optional(&mut *conn)
    .await
}

pub async fn insert_review(
    conn: &mut PgConnection,
    submission: &WorkSubmission,
    company_id: Uuid,
    outcome: ReviewOutcome,
    revision_notes: Option<&str>,
) -> Result<WorkReview, Error> {
    sqlx::query_as::<_, WorkReview>(
        r#"
        INSERT INTO work_reviews (submission_id, project_id, company_id, outcome, revision_notes)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#
    )
    .bind(submission.id)
    .bind(submission.project_id)
    .bind(company_id)
    .bind(outcome)
    .bind(revision_notes)
    .fetch_one(&mut *conn)
    .await
}

/// (all submissions, submissions sent back for revision)
pub async fn count_submissions(conn: &mut PgConnection, project_id: Uuid) -> Result<(i64, i64), Error> {
    sqlx::query_as::<_, (i64, i64)>(
        r#"
        SELECT COUNT(*),
               COUNT(*) FILTER (WHERE status = 'needs_revision')
        FROM work_submissions
        WHERE project_id = $1
        "#
    )
    .bind(project_id)
    .fetch_one(&mut *conn)
    .await
}
