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
    dtos::{subscriptiondtos::*, ApiResponse},
    error::HttpError,
    middleware::JWTAuthMiddeware,
    service::subscription_service::PaymentProof,
    AppState,
};

pub fn subscriptions_handler() -> Router {
    Router::new()
        .route("/plans", get(get_plans))
        .route("/order", post(create_subscription_order))
        .route("/verify", post(verify_subscription_payment))
        .route("/current", get(get_current_subscription))
        .route("/:subscription_id/cancel", post(cancel_subscription))
}

pub async fn get_plans(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let plans = app_state
        .subscription_service
        .plans()
        .await
        .map_err(|e| e.into_http("Failed to load plans"))?;

    Ok(Json(ApiResponse::success("Plans retrieved successfully", plans)))
}

pub async fn create_subscription_order(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<SubscriptionOrderDto>,
) -> Result<impl IntoResponse, HttpError> {
    let checkout = app_state
        .subscription_service
        .create_order(body.plan_id, auth.user.id)
        .await
        .map_err(|e| e.into_http("Failed to create subscription order"))?;

    Ok(Json(ApiResponse::success("Subscription order created", checkout)))
}

pub async fn verify_subscription_payment(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<VerifySubscriptionDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let activated = app_state
        .subscription_service
        .verify_payment(
            auth.user.id,
            body.plan_id,
            PaymentProof {
                order_id: body.order_id,
                payment_id: body.payment_id,
                signature: body.signature,
            },
        )
        .await
        .map_err(|e| e.into_http("Failed to verify subscription payment"))?;

    Ok(Json(ApiResponse::success("Subscription activated", activated)))
}

pub async fn get_current_subscription(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let subscription = app_state
        .subscription_service
        .current(auth.user.id)
        .await
        .map_err(|e| e.into_http("Failed to load subscription"))?;

    Ok(Json(ApiResponse::success("Subscription retrieved successfully", subscription)))
}

pub async fn cancel_subscription(
    Path(subscription_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let subscription = app_state
        .subscription_service
        .cancel(subscription_id, auth.user.id)
        .await
        .map_err(|e| e.into_http("Failed to cancel subscription"))?;

    Ok(Json(ApiResponse::success("Subscription cancelled", subscription)))
}
