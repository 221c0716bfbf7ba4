use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::workmodels::{ReviewOutcome, WorkReview, WorkSubmission};

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReviewWorkDto {
    pub submission_id: Uuid,
    pub project_id: Uuid,
    pub company_id: Uuid,
    pub review_type: ReviewOutcome,

    #[validate(length(max = 5000, message = "Revision notes must be at most 5000 characters"))]
    pub revision_notes: Option<String>,

    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct SubmissionDetailDto {
    pub submission: WorkSubmission,
    pub review: Option<WorkReview>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_body_shape() {
        let body = format!(
            r#"{{"submissionId":"{}","projectId":"{}","companyId":"{}","reviewType":"needs_revision","revisionNotes":"Tighten the margins"}}"#,
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4()
        );
        let dto: ReviewWorkDto = serde_json::from_str(&body).unwrap();
        assert_eq!(dto.review_type, ReviewOutcome::NeedsRevision);
        assert_eq!(dto.revision_notes.as_deref(), Some("Tighten the margins"));
        assert!(dto.validate().is_ok());
    }

    #[test]
    fn test_rating_out_of_range() {
        let dto = ReviewWorkDto {
            submission_id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            review_type: ReviewOutcome::Approved,
            revision_notes: None,
            rating: Some(6),
        };
        assert!(dto.validate().is_err());
    }
}
