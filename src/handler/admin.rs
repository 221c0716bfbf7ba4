use std::sync::Arc;

use axum::{
    extract::Path,
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{subscriptiondtos::ProcessWithdrawalDto, ApiResponse},
    error::HttpError,
    middleware::{admin_only, JWTAuthMiddeware},
    models::withdrawalmodels::WithdrawalDecision,
    AppState,
};

pub fn admin_handler() -> Router {
    Router::new()
        .route("/withdrawals", get(get_pending_withdrawals))
        .route("/withdrawals/:withdrawal_id/process", post(process_withdrawal))
        .route("/escrow/:escrow_id/release", post(release_escrow))
        .route("/escrow/:escrow_id/refund", post(refund_escrow))
        .route("/ledger/:user_id/audit", get(audit_ledger))
        .layer(middleware::from_fn(admin_only))
}

pub async fn get_pending_withdrawals(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let withdrawals = app_state
        .withdrawal_service
        .pending_queue()
        .await
        .map_err(|e| e.into_http("Failed to load withdrawals"))?;

    Ok(Json(ApiResponse::success("Pending withdrawals retrieved", withdrawals)))
}

pub async fn process_withdrawal(
    Path(withdrawal_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<ProcessWithdrawalDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let withdrawal = app_state
        .withdrawal_service
        .process(withdrawal_id, auth.user.id, body.decision, body.notes)
        .await
        .map_err(|e| e.into_http("Failed to process withdrawal"))?;

    let message = match body.decision {
        WithdrawalDecision::Completed => "Withdrawal completed",
        WithdrawalDecision::Rejected => "Withdrawal rejected and VCreds returned",
    };
    Ok(Json(ApiResponse::success(message, withdrawal)))
}

pub async fn release_escrow(
    Path(escrow_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    tracing::warn!("Admin {} forcing release of escrow {}", auth.user.id, escrow_id);

    let escrow = app_state
        .escrow_service
        .release(escrow_id)
        .await
        .map_err(|e| e.into_http("Failed to release escrow"))?;

    Ok(Json(ApiResponse::success("Escrow released", escrow)))
}

pub async fn refund_escrow(
    Path(escrow_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    tracing::warn!("Admin {} forcing refund of escrow {}", auth.user.id, escrow_id);

    let escrow = app_state
        .escrow_service
        .refund(escrow_id)
        .await
        .map_err(|e| e.into_http("Failed to refund escrow"))?;

    Ok(Json(ApiResponse::success("Escrow refunded", escrow)))
}

pub async fn audit_ledger(
    Path(user_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let audit = app_state
        .ledger_service
        .audit(user_id)
        .await
        .map_err(|e| e.into_http("Failed to audit ledger"))?;

    Ok(Json(ApiResponse::success("Ledger audit complete", audit)))
}
