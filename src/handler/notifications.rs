use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{userdtos::RequestQueryDto, ApiResponse},
    error::HttpError,
    middleware::JWTAuthMiddeware,
    AppState,
};

pub fn notifications_handler() -> Router {
    Router::new()
        .route("/", get(get_notifications))
        .route("/unread-count", get(get_unread_count))
        .route("/:notification_id/read", post(mark_notification_read))
        .route("/read-all", post(mark_all_read))
}

pub async fn get_notifications(
    Query(query): Query<RequestQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    query.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;
    let (limit, offset) = query.limit_offset();

    let notifications = app_state
        .notification_service
        .list(auth.user.id, limit, offset)
        .await
        .map_err(|e| e.into_http("Failed to load notifications"))?;

    Ok(Json(ApiResponse::success("Notifications retrieved successfully", notifications)))
}

pub async fn get_unread_count(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let count = app_state
        .notification_service
        .unread_count(auth.user.id)
        .await
        .map_err(|e| e.into_http("Failed to count notifications"))?;

    Ok(Json(ApiResponse::success("Unread count retrieved", json!({ "unread": count }))))
}

pub async fn mark_notification_read(
    Path(notification_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let notification = app_state
        .notification_service
        .mark_read(notification_id, auth.user.id)
        .await
        .map_err(|e| e.into_http("Failed to update notification"))?;

    Ok(Json(ApiResponse::success("Notification marked as read", notification)))
}

pub async fn mark_all_read(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let updated = app_state
        .notification_service
        .mark_all_read(auth.user.id)
        .await
        .map_err(|e| e.into_http("Failed to update notifications"))?;

    Ok(Json(ApiResponse::success("Notifications marked as read", json!({ "updated": updated }))))
}
