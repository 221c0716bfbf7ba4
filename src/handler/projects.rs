use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{projectdtos::*, userdtos::RequestQueryDto, ApiResponse},
    error::HttpError,
    middleware::JWTAuthMiddeware,
    AppState,
};

pub fn projects_handler() -> Router {
    Router::new()
        .route("/jobs", post(create_job).get(list_open_jobs))
        .route("/jobs/:job_id", get(get_job))
        .route("/jobs/:job_id/applications", post(apply_to_job).get(get_job_applications))
        .route("/applications/:application_id/accept", put(accept_application))
        .route("/projects", get(get_my_projects))
        .route("/projects/past", get(get_past_projects))
        .route("/projects/:project_id", get(get_project))
        .route("/projects/:project_id/progress", put(update_progress))
        .route("/projects/:project_id/cancel", post(cancel_project))
}

pub async fn create_job(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<CreateJobDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let job = app_state
        .project_service
        .create_job(&auth.user, body.title, body.description, body.budget)
        .await
        .map_err(|e| e.into_http("Failed to create job"))?;

    Ok(Json(ApiResponse::success("Job created successfully", job)))
}

pub async fn list_open_jobs(
    Query(query): Query<RequestQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    query.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;
    let (limit, offset) = query.limit_offset();

    let jobs = app_state
        .project_service
        .open_jobs(limit, offset)
        .await
        .map_err(|e| e.into_http("Failed to load jobs"))?;

    Ok(Json(ApiResponse::success("Jobs retrieved successfully", jobs)))
}

pub async fn get_job(
    Path(job_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let job = app_state
        .project_service
        .get_job(job_id)
        .await
        .map_err(|e| e.into_http("Failed to load job"))?;

    Ok(Json(ApiResponse::success("Job retrieved successfully", job)))
}

pub async fn apply_to_job(
    Path(job_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<ApplyJobDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let application = app_state
        .project_service
        .apply(job_id, &auth.user, body.proposed_rate, body.cover_letter)
        .await
        .map_err(|e| e.into_http("Failed to submit application"))?;

    Ok(Json(ApiResponse::success("Application submitted successfully", application)))
}

pub async fn get_job_applications(
    Path(job_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let applications = app_state
        .project_service
        .applications(job_id, auth.user.id)
        .await
        .map_err(|e| e.into_http("Failed to load applications"))?;

    Ok(Json(ApiResponse::success("Applications retrieved successfully", applications)))
}

pub async fn accept_application(
    Path(application_id): Path<Uuid>,
    Query(query): Query<AcceptApplicationQuery>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let start = app_state
        .project_service
        .accept_application(application_id, auth.user.id, query.fund_escrow.unwrap_or(true))
        .await
        .map_err(|e| e.into_http("Failed to accept application"))?;

    Ok(Json(ApiResponse::success("Application accepted and project started", start)))
}

pub async fn get_my_projects(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let projects = app_state
        .project_service
        .projects_for(auth.user.id)
        .await
        .map_err(|e| e.into_http("Failed to load projects"))?;

    Ok(Json(ApiResponse::success("Projects retrieved successfully", projects)))
}

pub async fn get_past_projects(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let projects = app_state
        .project_service
        .past_projects_for(auth.user.id)
        .await
        .map_err(|e| e.into_http("Failed to load past projects"))?;

    Ok(Json(ApiResponse::success("Past projects retrieved successfully", projects)))
}

pub async fn get_project(
    Path(project_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let project = app_state
        .project_service
        .project(project_id, auth.user.id)
        .await
        .map_err(|e| e.into_http("Failed to load project"))?;

    Ok(Json(ApiResponse::success("Project retrieved successfully", project)))
}

pub async fn update_progress(
    Path(project_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<UpdateProgressDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let project = app_state
        .project_service
        .update_progress(project_id, auth.user.id, body.progress)
        .await
        .map_err(|e| e.into_http("Failed to update progress"))?;

    Ok(Json(ApiResponse::success("Progress updated", project)))
}

pub async fn cancel_project(
    Path(project_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let cancellation = app_state
        .project_service
        .cancel_project(project_id, auth.user.id)
        .await
        .map_err(|e| e.into_http("Failed to cancel project"))?;

    Ok(Json(ApiResponse::success("Project cancelled", cancellation)))
}
