use std::sync::Arc;

use axum::{middleware, routing::get, Extension, Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::{
    handler::{
        admin::admin_handler, escrow::escrow_handler, notifications::notifications_handler,
        projects::projects_handler, subscriptions::subscriptions_handler, users::users_handler,
        wallet::wallet_handler, work::work_handler,
    },
    middleware::auth,
    AppState,
};

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "message": "Server is running"
    }))
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_route = Router::new()
        .nest("/users", users_handler())
        .merge(projects_handler())
        .nest("/escrow", escrow_handler())
        .nest("/work", work_handler())
        .nest("/wallet", wallet_handler())
        .nest("/subscriptions", subscriptions_handler())
        .nest("/notifications", notifications_handler())
        .nest("/admin", admin_handler())
        .layer(middleware::from_fn(auth))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(app_state));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_route)
}
