use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateJobDto {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: String,

    #[validate(length(min = 10, max = 5000, message = "Description must be between 10 and 5000 characters"))]
    pub description: String,

    #[validate(range(min = 1, message = "Budget must be greater than zero"))]
    pub budget: i64,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ApplyJobDto {
    #[validate(range(min = 1, message = "Proposed rate must be greater than zero"))]
    pub proposed_rate: i64,

    #[validate(length(min = 10, max = 3000, message = "Cover letter must be between 10 and 3000 characters"))]
    pub cover_letter: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptApplicationQuery {
    pub fund_escrow: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateProgressDto {
    #[validate(range(min = 0, max = 100, message = "Progress must be between 0 and 100"))]
    pub progress: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_needs_positive_budget() {
        let dto = CreateJobDto {
            title: "Logo design".to_string(),
            description: "A logo for a coffee brand".to_string(),
            budget: 0,
        };
        let err = dto.validate().unwrap_err();
        assert!(err.to_string().contains("Budget must be greater than zero"));
    }

    #[test]
    fn test_apply_reads_camel_case() {
        let dto: ApplyJobDto =
            serde_json::from_str(r#"{"proposedRate": 120, "coverLetter": "I have done this before"}"#).unwrap();
        assert_eq!(dto.proposed_rate, 120);
        assert!(dto.validate().is_ok());
    }

    #[test]
    fn test_progress_is_bounded() {
        assert!(UpdateProgressDto { progress: 101 }.validate().is_err());
        assert!(UpdateProgressDto { progress: 100 }.validate().is_ok());
    }
}
