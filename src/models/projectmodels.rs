use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::StatusMachine;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "job_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Open,
    Filled,
    Closed,
}

impl StatusMachine for JobStatus {
    const ENTITY: &'static str = "job";

    fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (JobStatus::Open, JobStatus::Filled)
                | (JobStatus::Open, JobStatus::Closed)
                | (JobStatus::Filled, JobStatus::Closed)
        )
    }

    fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Closed)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "application_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Accepted,
    Rejected,
}

impl StatusMachine for ApplicationStatus {
    const ENTITY: &'static str = "application";

    fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (ApplicationStatus::Pending, ApplicationStatus::Accepted)
                | (ApplicationStatus::Pending, ApplicationStatus::Rejected)
        )
    }

    fn is_terminal(&self) -> bool {
        !matches!(self, ApplicationStatus::Pending)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "project_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    InProgress,
    UnderReview,
    Completed,
    Cancelled,
}

impl ProjectStatus {
    pub fn to_str(&self) -> &str {
        match self {
            ProjectStatus::InProgress => "in_progress",
            ProjectStatus::UnderReview => "under_review",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Cancelled => "cancelled",
        }
    }
}

impl StatusMachine for ProjectStatus {
    const ENTITY: &'static str = "project";

    fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (ProjectStatus::InProgress, ProjectStatus::UnderReview)
                | (ProjectStatus::InProgress, ProjectStatus::Cancelled)
                | (ProjectStatus::UnderReview, ProjectStatus::InProgress)
                | (ProjectStatus::UnderReview, ProjectStatus::Completed)
                | (ProjectStatus::UnderReview, ProjectStatus::Cancelled)
        )
    }

    fn is_terminal(&self) -> bool {
        matches!(self, ProjectStatus::Completed | ProjectStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Job {
    pub id: Uuid,
    pub company_id: Uuid,
    pub title: String,
    pub description: String,
    pub budget: i64,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct JobApplication {
    pub id: Uuid,
    pub job_id: Uuid,
    pub freelancer_id: Uuid,
    pub proposed_rate: i64,
    pub cover_letter: String,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ActiveProject {
    pub id: Uuid,
    pub job_id: Option<Uuid>,
    pub company_id: Uuid,
    pub freelancer_id: Uuid,
    pub title: String,
    pub description: String,
    pub budget: i64,
    pub agreed_rate: Option<i64>,
    pub status: ProjectStatus,
    pub progress: i32,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ActiveProject {
    pub fn is_party(&self, user_id: Uuid) -> bool {
        self.company_id == user_id || self.freelancer_id == user_id
    }

    /// Amount escrowed when nothing was funded up front.
    pub fn settlement_amount(&self) -> i64 {
        self.agreed_rate.unwrap_or(self.budget)
    }
}

#[derive(Debug, Clone)]
pub struct NewProject {
    pub job_id: Option<Uuid>,
    pub company_id: Uuid,
    pub freelancer_id: Uuid,
    pub title: String,
    pub description: String,
    pub budget: i64,
    pub agreed_rate: Option<i64>,
}

/// Immutable archive row written once when a project is approved.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PastProject {
    pub id: Uuid,
    pub project_id: Uuid,
    pub company_id: Uuid,
    pub freelancer_id: Uuid,
    pub title: String,
    pub description: String,
    pub budget: i64,
    pub final_amount: i64,
    pub submission_count: i32,
    pub revision_count: i32,
    pub final_file_path: String,
    pub final_file_name: String,
    pub freelancer_rating: Option<i32>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}
