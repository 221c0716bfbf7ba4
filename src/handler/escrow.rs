use std::sync::Arc;

use axum::{
    extract::Path,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{escrowdtos::FundEscrowDto, ApiResponse},
    error::{ErrorMessage, HttpError},
    middleware::JWTAuthMiddeware,
    AppState,
};

pub fn escrow_handler() -> Router {
    Router::new()
        .route("/fund", post(fund_escrow))
        .route("/project/:project_id", get(get_project_escrow))
}

pub async fn fund_escrow(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<FundEscrowDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    if body.company_id != auth.user.id {
        return Err(HttpError::forbidden(ErrorMessage::Unauthorized.to_string()));
    }

    let escrow = app_state
        .escrow_service
        .fund(body.project_id, body.company_id, body.freelancer_id, body.amount)
        .await
        .map_err(|e| e.into_http("Failed to fund escrow"))?;

    Ok(Json(ApiResponse::success("Escrow funded successfully", escrow)))
}

pub async fn get_project_escrow(
    Path(project_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    // Party check on the project first.
    app_state
        .project_service
        .project(project_id, auth.user.id)
        .await
        .map_err(|e| e.into_http("Failed to load escrow"))?;

    let escrows = app_state
        .escrow_service
        .for_project(project_id)
        .await
        .map_err(|e| e.into_http("Failed to load escrow"))?;

    Ok(Json(ApiResponse::success("Escrow retrieved successfully", escrows)))
}
