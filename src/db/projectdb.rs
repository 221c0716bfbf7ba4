// db/projectdb.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Error, PgConnection};
use uuid::Uuid;

use super::db::DBClient;
use crate::models::projectmodels::*;

#[async_trait]
pub trait ProjectExt {
    async fn create_job(
        &self,
        company_id: Uuid,
        title: String,
        description: String,
        budget: i64,
    ) -> Result<Job, Error>;

    async fn get_job(&self, job_id: Uuid) -> Result<Option<Job>, Error>;

    async fn get_open_jobs(&self, limit: i64, offset: i64) -> Result<Vec<Job>, Error>;

    async fn get_job_applications(&self, job_id: Uuid) -> Result<Vec<JobApplication>, Error>;

    async fn get_project(&self, project_id: Uuid) -> Result<Option<ActiveProject>, Error>;

    async fn get_projects_for_user(&self, user_id: Uuid) -> Result<Vec<ActiveProject>, Error>;

    async fn get_past_projects_for_user(&self, user_id: Uuid) -> Result<Vec<PastProject>, Error>;

    async fn get_past_project_by_project(&self, project_id: Uuid) -> Result<Option<PastProject>, Error>;

    async fn update_project_progress(
        &self,
        project_id: Uuid,
        freelancer_id: Uuid,
        progress: i32,
    ) -> Result<Option<ActiveProject>, Error>;
}

#[async_trait]
impl ProjectExt for DBClient {
    async fn create_job(
        &self,
        company_id: Uuid,
        title: String,
        description: String,
        budget: i64,
    ) -> Result<Job, Error> {
        sqlx::query_as::<_, Job>(
            r#"
            INSERT INTO jobs (company_id, title, description, budget)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#
        )
        .bind(company_id)
        .bind(title)
        .bind(description)
        .bind(budget)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_job(&self, job_id: Uuid) -> Result<Option<Job>, Error> {
        sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_open_jobs(&self, limit: i64, offset: i64) -> Result<Vec<Job>, Error> {
        sqlx::query_as::<_, Job>(
            r#"
            SELECT * FROM jobs
            WHERE status = 'open'
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_job_applications(&self, job_id: Uuid) -> Result<Vec<JobApplication>, Error> {
        sqlx::query_as::<_, JobApplication>(
            "SELECT * FROM job_applications WHERE job_id = $1 ORDER BY created_at ASC"
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_project(&self, project_id: Uuid) -> Result<Option<ActiveProject>, Error> {
        sqlx::query_as::<_, ActiveProject>("SELECT * FROM active_projects WHERE id = $1")
            .bind(project_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_projects_for_user(&self, user_id: Uuid) -> Result<Vec<ActiveProject>, Error> {
        sqlx::query_as::<_, ActiveProject>(
            r#"
            SELECT * FROM active_projects
            WHERE company_id = $1 OR freelancer_id = $1
            ORDER BY updated_at DESC
            "#
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_past_projects_for_user(&self, user_id: Uuid) -> Result<Vec<PastProject>, Error> {
        sqlx::query_as::<_, PastProject>(
            r#"
            SELECT * FROM past_projects
            WHERE company_id = $1 OR freelancer_id = $1
            ORDER BY completed_at DESC
            "#
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_past_project_by_project(&self, project_id: Uuid) -> Result<Option<PastProject>, Error> {
        sqlx::query_as::<_, PastProject>("SELECT * FROM past_projects WHERE project_id = $1")
            .bind(project_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn update_project_progress(
        &self,
        project_id: Uuid,
        freelancer_id: Uuid,
        progress: i32,
    ) -> Result<Option<ActiveProject>, Error> {
        sqlx::query_as::<_, ActiveProject>(
            r#"
            UPDATE active_projects
            SET progress = $3, updated_at = NOW()
            WHERE id = $1 AND freelancer_id = $2
            AND status IN ('in_progress', 'under_review')
            RETURNING *
            "#
        )
        .bind(project_id)
        .bind(freelancer_id)
        .bind(progress)
        .fetch_optional(&self.pool)
        .await
    }
}

pub async fn lock_job(conn: &mut PgConnection, job_id: Uuid) -> Result<Option<Job>, Error> {
    sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1 FOR UPDATE")
        .bind(job_id)
        .fetch_optional(&mut *conn)
        .await
}

pub async fn update_job_status(
    conn: &mut PgConnection,
    job_id: Uuid,
    from: JobStatus,
    to: JobStatus,
) -> Result<Option<Job>, Error> {
    sqlx::query_as::<_, Job>(
        r#"
        UPDATE jobs SET status = $3, updated_at = NOW()
        WHERE id = $1 AND status = $2
        RETURNING *
        "#
    )
    .bind(job_id)
    .bind(from)
    .bind(to)
    .fetch_optional(&mut *conn)
    .await
}

/// Fails with a unique violation on a repeat application.
pub async fn insert_application(
    conn: &mut PgConnection,
    job_id: Uuid,
    freelancer_id: Uuid,
    proposed_rate: i64,
    cover_letter: &str,
) -> Result<JobApplication, Error> {
    sqlx::query_as::<_, JobApplication>(
        r#"
        INSERT INTO job_applications (job_id, freelancer_id, proposed_rate, cover_letter)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#
    )
    .bind(job_id)
    .bind(freelancer_id)
    .bind(proposed_rate)
    .bind(cover_letter)
    .fetch_one(&mut *conn)
    .await
}

pub async fn lock_application(conn: &mut PgConnection, application_id: Uuid) -> Result<Option<JobApplication>, Error> {
    sqlx::query_as::<_, JobApplication>("SELECT * FROM job_applications WHERE id = $1 FOR UPDATE")
        .bind(application_id)
        .fetch_optional(&mut *conn)
        .await
}

pub async fn update_application_status(
    conn: &mut PgConnection,
    application_id: Uuid,
    from: ApplicationStatus,
    to: ApplicationStatus,
) -> Result<Option<JobApplication>, Error> {
    sqlx::query_as::<_, JobApplication>(
        r#"
        UPDATE job_applications SET status = $3
        WHERE id = $1 AND status = $2
        RETURNING *
        "#
    )
    .bind(application_id)
    .bind(from)
    .bind(to)
    .fetch_optional(&mut *conn)
    .await
}

pub async fn reject_other_applications(
    conn: &mut PgConnection,
    job_id: Uuid,
    accepted_id: Uuid,
) -> Result<u64, Error> {
    let result = sqlx::query(
        r#"
        UPDATE job_applications SET status = 'rejected'
        WHERE job_id = $1 AND id <> $2 AND status = 'pending'
        "#
    )
    .bind(job_id)
    .bind(accepted_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

pub async fn insert_project(conn: &mut PgConnection, project: &NewProject) -> Result<ActiveProject, Error> {
    sqlx::query_as::<_, ActiveProject>(
        r#"
        INSERT INTO active_projects
        (job_id, company_id, freelancer_id, title, description, budget, agreed_rate)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#
    )
    .bind(project.job_id)
    .bind(project.company_id)
    .bind(project.freelancer_id)
    .bind(&project.title)
    .bind(&project.description)
    .bind(project.budget)
    .bind(project.agreed_rate)
    .fetch_one(&mut *conn)
    .await
}

pub async fn lock_project(conn: &mut PgConnection, project_id: Uuid) -> Result<Option<ActiveProject>, Error> {
    sqlx::query_as::<_, ActiveProject>("SELECT * FROM active_projects WHERE id = $1 FOR UPDATE")
        .bind(project_id)
        .fetch_optional(&mut *conn)
        .await
}

pub async fn update_project_status(
    conn: &mut PgConnection,
    project_id: Uuid,
    from: ProjectStatus,
    to: ProjectStatus,
) -> Result<Option<ActiveProject>, Error> {
    sqlx::query_as::<_, ActiveProject>(
        r#"
        UPDATE active_projects
        SET status = $3,
            progress = CASE WHEN $3 = 'completed'::project_status THEN 100 ELSE progress END,
            updated_at = NOW()
        WHERE id = $1 AND status = $2
        RETURNING *
        "#
    )
    .bind(project_id)
    .bind(from)
    .bind(to)
    .fetch_optional(&mut *conn)
    .await
}

#[derive(Debug, Clone)]
pub struct PastProjectRecord<'a> {
    pub project: &'a ActiveProject,
    pub final_amount: i64,
    pub submission_count: i32,
    pub revision_count: i32,
    pub final_file_path: &'a str,
    pub final_file_name: &'a str,
    pub freelancer_rating: Option<i32>,
    pub completed_at: DateTime<Utc>,
}

/// Fails with a unique violation if the project was already archived.
pub async fn insert_past_project(
    conn: &mut PgConnection,
    record: &PastProjectRecord<'_>,
) -> Result<PastProject, Error> {
    sqlx::query_as::<_, PastProject>(
        r#"
        INSERT INTO past_projects
        (project_id, company_id, freelancer_id, title, description, budget, final_amount,
         submission_count, revision_count, final_file_path, final_file_name,
         freelancer_rating, started_at, completed_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        RETURNING *
        "#
    )
    .bind(record.project.id)
    .bind(record.project.company_id)
    .bind(record.project.freelancer_id)
    .bind(&record.project.title)
    .bind(&record.project.description)
    .bind(record.project.budget)
    .bind(record.final_amount)
    .bind(record.submission_count)
    .bind(record.revision_count)
    .bind(record.final_file_path)
    .bind(record.final_file_name)
    .bind(record.freelancer_rating)
    .bind(record.project.started_at)
    .bind(record.completed_at)
    .fetch_one(&mut *conn)
    .await
}
