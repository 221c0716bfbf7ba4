use axum::http::StatusCode;
use thiserror::Error;

use crate::{error::{ErrorMessage, HttpError}, models::InvalidTransition};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("Insufficient VCreds: required {required}, available {available}")]
    InsufficientFunds { required: i64, available: i64 },

    #[error("{0}")]
    NotFound(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Payment gateway error: {0}")]
    Gateway(String),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),
}

impl ServiceError {
    pub fn not_found(entity: &str) -> Self {
        ServiceError::NotFound(format!("{} not found", entity))
    }

    /// Maps a unique-constraint violation to `Conflict`, anything else to `Database`.
    pub fn conflict_on_unique(err: sqlx::Error, message: &str) -> Self {
        let unique = err
            .as_database_error()
            .map(|db_err| db_err.is_unique_violation())
            .unwrap_or(false);

        if unique {
            ServiceError::Conflict(message.to_string())
        } else {
            ServiceError::Database(err)
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_)
            | ServiceError::InsufficientFunds { .. } => StatusCode::BAD_REQUEST,

            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,

            ServiceError::Unauthorized => StatusCode::FORBIDDEN,

            ServiceError::Conflict(_)
            | ServiceError::InvalidTransition(_) => StatusCode::CONFLICT,

            ServiceError::Database(_)
            | ServiceError::Gateway(_)
            | ServiceError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_internal(&self) -> bool {
        self.status_code() == StatusCode::INTERNAL_SERVER_ERROR
    }

    /// Internal failures surface `failure` to the caller and log the real cause.
    pub fn into_http(self, failure: &str) -> HttpError {
        if self.is_internal() {
            tracing::error!("{}: {}", failure, self);
            return HttpError::server_error(failure);
        }
        HttpError::from(self)
    }
}

impl From<ServiceError> for HttpError {
    fn from(error: ServiceError) -> Self {
        let status = error.status_code();
        match error {
            ServiceError::Unauthorized => HttpError::new(ErrorMessage::Unauthorized.to_string(), status),
            ServiceError::Database(_)
            | ServiceError::Gateway(_)
            | ServiceError::Storage(_) => HttpError::new(ErrorMessage::ServerError.to_string(), status),
            other => HttpError::new(other.to_string(), status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{escrowmodels::EscrowStatus, StatusMachine};

    #[test]
    fn test_domain_errors_keep_their_message() {
        let http = HttpError::from(ServiceError::Validation("Revision notes are required".into()));
        assert_eq!(http.status, StatusCode::BAD_REQUEST);
        assert_eq!(http.message, "Revision notes are required");

        let http = HttpError::from(ServiceError::InsufficientFunds { required: 500, available: 120 });
        assert_eq!(http.status, StatusCode::BAD_REQUEST);
        assert_eq!(http.message, "Insufficient VCreds: required 500, available 120");

        let http = HttpError::from(ServiceError::not_found("Project"));
        assert_eq!(http.status, StatusCode::NOT_FOUND);
        assert_eq!(http.message, "Project not found");
    }

    #[test]
    fn test_authorization_failures_are_terse() {
        let http = HttpError::from(ServiceError::Unauthorized);
        assert_eq!(http.status, StatusCode::FORBIDDEN);
        assert_eq!(http.message, "Unauthorized");
    }

    #[test]
    fn test_illegal_transition_is_a_conflict() {
        let err: ServiceError = EscrowStatus::Released
            .transition(EscrowStatus::Released)
            .unwrap_err()
            .into();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.to_string(), "Cannot move escrow from Released to Released");
    }

    #[test]
    fn test_internal_failures_are_hidden() {
        let http = ServiceError::Database(sqlx::Error::RowNotFound).into_http("Failed to approve submission");
        assert_eq!(http.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(http.message, "Failed to approve submission");

        let http = ServiceError::Gateway("timeout".into()).into_http("Failed to create order");
        assert_eq!(http.message, "Failed to create order");

        let http = ServiceError::Conflict("Submission already reviewed".into()).into_http("Failed to review");
        assert_eq!(http.status, StatusCode::CONFLICT);
        assert_eq!(http.message, "Submission already reviewed");
    }

    #[test]
    fn test_non_unique_database_errors_stay_internal() {
        let err = ServiceError::conflict_on_unique(sqlx::Error::RowNotFound, "duplicate");
        assert!(matches!(err, ServiceError::Database(_)));
    }
}
