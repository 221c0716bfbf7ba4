use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path},
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{
        workdtos::{ReviewWorkDto, SubmissionDetailDto},
        ApiResponse,
    },
    error::{ErrorMessage, HttpError},
    middleware::JWTAuthMiddeware,
    models::workmodels::{ReviewOutcome, WorkSubmission},
    service::work_service::{FileAccess, ReviewRequest, WorkUpload},
    utils::upload::MAX_UPLOAD_BYTES,
    AppState,
};

// Room for the text fields and multipart framing around the file.
const SUBMIT_BODY_LIMIT: usize = MAX_UPLOAD_BYTES + 1024 * 1024;

pub fn work_handler() -> Router {
    Router::new()
        .route(
            "/submit",
            post(submit_work).layer(DefaultBodyLimit::max(SUBMIT_BODY_LIMIT)),
        )
        .route("/review", post(review_work))
        .route("/project/:project_id", get(get_project_submissions))
        .route("/submissions/:submission_id", get(get_submission))
        .route("/submissions/:submission_id/view", get(view_submission_file))
        .route("/submissions/:submission_id/download", get(download_submission_file))
}

#[derive(Debug, Default)]
struct SubmitForm {
    project_id: Option<Uuid>,
    freelancer_id: Option<Uuid>,
    notes: Option<String>,
    file: Option<WorkUpload>,
}

fn parse_uuid_field(name: &str, value: &str) -> Result<Uuid, HttpError> {
    Uuid::parse_str(value.trim()).map_err(|_| HttpError::bad_request(format!("{} must be a valid id", name)))
}

async fn read_submit_form(mut multipart: Multipart) -> Result<SubmitForm, HttpError> {
    let mut form = SubmitForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| HttpError::new(e.body_text(), e.status()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                if form.file.is_some() {
                    return Err(HttpError::bad_request("Only one file may be submitted"));
                }
                let file_name = field.file_name().unwrap_or_default().to_string();
                let mime_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| HttpError::new(e.body_text(), e.status()))?;

                if bytes.len() > MAX_UPLOAD_BYTES {
                    return Err(HttpError::payload_too_large("File exceeds the 50MB limit"));
                }
                form.file = Some(WorkUpload {
                    file_name,
                    mime_type,
                    bytes: bytes.to_vec(),
                });
            }
            "projectId" | "freelancerId" | "notes" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| HttpError::new(e.body_text(), e.status()))?;
                match name.as_str() {
                    "projectId" => form.project_id = Some(parse_uuid_field("projectId", &value)?),
                    "freelancerId" => form.freelancer_id = Some(parse_uuid_field("freelancerId", &value)?),
                    _ => form.notes = Some(value),
                }
            }
            other => {
                tracing::debug!("Ignoring unexpected multipart field {}", other);
            }
        }
    }

    Ok(form)
}

pub async fn submit_work(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpError> {
    let form = read_submit_form(multipart).await?;

    let project_id = form
        .project_id
        .ok_or_else(|| HttpError::bad_request("projectId is required"))?;
    let freelancer_id = form
        .freelancer_id
        .ok_or_else(|| HttpError::bad_request("freelancerId is required"))?;
    let upload = form
        .file
        .ok_or_else(|| HttpError::bad_request("A file is required"))?;

    if freelancer_id != auth.user.id {
        return Err(HttpError::forbidden(ErrorMessage::Unauthorized.to_string()));
    }

    let submission = app_state
        .work_service
        .submit(project_id, freelancer_id, upload, form.notes)
        .await
        .map_err(|e| e.into_http("Failed to submit work"))?;

    Ok(Json(ApiResponse::success("Work submitted successfully", submission)))
}

pub async fn review_work(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<ReviewWorkDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    if body.company_id != auth.user.id {
        return Err(HttpError::forbidden(ErrorMessage::Unauthorized.to_string()));
    }

    let failure = match body.review_type {
        ReviewOutcome::Approved => "Failed to approve submission",
        ReviewOutcome::NeedsRevision => "Failed to request revision",
    };

    let result = app_state
        .work_service
        .review(ReviewRequest {
            project_id: body.project_id,
            submission_id: body.submission_id,
            company_id: body.company_id,
            outcome: body.review_type,
            revision_notes: body.revision_notes,
            rating: body.rating,
        })
        .await
        .map_err(|e| e.into_http(failure))?;

    let message = match result.review.outcome {
        ReviewOutcome::Approved => "Work approved and payment released",
        ReviewOutcome::NeedsRevision => "Revision requested",
    };

    Ok(Json(ApiResponse::success(message, result)))
}

pub async fn get_project_submissions(
    Path(project_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let submissions = app_state
        .work_service
        .submissions_for_project(project_id, auth.user.id)
        .await
        .map_err(|e| e.into_http("Failed to load submissions"))?;

    Ok(Json(ApiResponse::success("Submissions retrieved successfully", submissions)))
}

pub async fn get_submission(
    Path(submission_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let (submission, review) = app_state
        .work_service
        .submission(submission_id, auth.user.id)
        .await
        .map_err(|e| e.into_http("Failed to load submission"))?;

    Ok(Json(ApiResponse::success(
        "Submission retrieved successfully",
        SubmissionDetailDto { submission, review },
    )))
}

fn file_response(submission: WorkSubmission, bytes: Vec<u8>, disposition: &str) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, submission.mime_type),
            (
                header::CONTENT_DISPOSITION,
                format!("{}; filename=\"{}\"", disposition, submission.file_name),
            ),
        ],
        bytes,
    )
}

pub async fn view_submission_file(
    Path(submission_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let (submission, bytes) = app_state
        .work_service
        .open_file(submission_id, auth.user.id, FileAccess::View)
        .await
        .map_err(|e| e.into_http("Failed to open submission"))?;

    Ok(file_response(submission, bytes, "inline"))
}

pub async fn download_submission_file(
    Path(submission_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let (submission, bytes) = app_state
        .work_service
        .open_file(submission_id, auth.user.id, FileAccess::Download)
        .await
        .map_err(|e| e.into_http("Failed to download submission"))?;

    Ok(file_response(submission, bytes, "attachment"))
}
