use std::sync::Arc;

use axum::{response::IntoResponse, routing::get, Extension, Json, Router};

use crate::{
    dtos::{
        userdtos::{FilterUserDto, UserProfileDto},
        ApiResponse,
    },
    error::HttpError,
    middleware::JWTAuthMiddeware,
    AppState,
};

pub fn users_handler() -> Router {
    Router::new().route("/me", get(get_me))
}

pub async fn get_me(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let balance = app_state
        .ledger_service
        .balance(auth.user.id)
        .await
        .map_err(|e| e.into_http("Failed to load balance"))?;

    let subscription = app_state
        .subscription_service
        .current(auth.user.id)
        .await
        .map_err(|e| e.into_http("Failed to load subscription"))?;

    Ok(Json(ApiResponse::success(
        "User retrieved successfully",
        UserProfileDto {
            user: FilterUserDto::filter_user(&auth.user),
            balance,
            subscription,
        },
    )))
}
