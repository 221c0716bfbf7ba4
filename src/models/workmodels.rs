use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::StatusMachine;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "submission_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Pending,
    UnderReview,
    Approved,
    NeedsRevision,
}

impl StatusMachine for SubmissionStatus {
    const ENTITY: &'static str = "submission";

    fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (SubmissionStatus::Pending, SubmissionStatus::UnderReview)
                | (SubmissionStatus::Pending, SubmissionStatus::Approved)
                | (SubmissionStatus::Pending, SubmissionStatus::NeedsRevision)
                | (SubmissionStatus::UnderReview, SubmissionStatus::Approved)
                | (SubmissionStatus::UnderReview, SubmissionStatus::NeedsRevision)
        )
    }

    fn is_terminal(&self) -> bool {
        matches!(self, SubmissionStatus::Approved | SubmissionStatus::NeedsRevision)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "review_outcome", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReviewOutcome {
    Approved,
    NeedsRevision,
}

impl From<ReviewOutcome> for SubmissionStatus {
    fn from(outcome: ReviewOutcome) -> Self {
        match outcome {
            ReviewOutcome::Approved => SubmissionStatus::Approved,
            ReviewOutcome::NeedsRevision => SubmissionStatus::NeedsRevision,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WorkSubmission {
    pub id: Uuid,
    pub project_id: Uuid,
    pub freelancer_id: Uuid,
    pub submission_number: i32,
    pub file_path: String,
    pub file_name: String,
    pub file_size: i64,
    pub mime_type: String,
    pub notes: Option<String>,
    pub status: SubmissionStatus,
    pub submitted_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WorkReview {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub project_id: Uuid,
    pub company_id: Uuid,
    pub outcome: ReviewOutcome,
    pub revision_notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submissions_are_reviewed_once() {
        for start in [SubmissionStatus::Pending, SubmissionStatus::UnderReview] {
            assert!(start.can_transition_to(SubmissionStatus::Approved));
            assert!(start.can_transition_to(SubmissionStatus::NeedsRevision));
        }
        for done in [SubmissionStatus::Approved, SubmissionStatus::NeedsRevision] {
            assert!(done.is_terminal());
            assert!(done.transition(SubmissionStatus::Approved).is_err());
            assert!(done.transition(SubmissionStatus::NeedsRevision).is_err());
        }
    }

    #[test]
    fn review_cannot_reopen() {
        assert!(SubmissionStatus::UnderReview.transition(SubmissionStatus::Pending).is_err());
        assert!(SubmissionStatus::UnderReview.transition(SubmissionStatus::UnderReview).is_err());
    }

    #[test]
    fn outcome_maps_to_status() {
        assert_eq!(SubmissionStatus::from(ReviewOutcome::Approved), SubmissionStatus::Approved);
        assert_eq!(SubmissionStatus::from(ReviewOutcome::NeedsRevision), SubmissionStatus::NeedsRevision);
    }
}
