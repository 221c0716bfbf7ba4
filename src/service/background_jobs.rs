// service/background_jobs.rs
use std::sync::Arc;

use chrono::Utc;
use tokio::time::{interval, Duration};

use crate::AppState;

/// Flips lapsed subscriptions to expired, once an hour.
pub async fn start_subscription_expiry_job(app_state: Arc<AppState>) {
    let mut interval = interval(Duration::from_secs(3600));

    loop {
        interval.tick().await;

        tracing::info!("Running subscription expiry job at {}", Utc::now());

        match app_state.subscription_service.expire_due().await {
            Ok(expired) => tracing::info!("Subscription expiry job completed: {} expired", expired),
            Err(e) => tracing::error!("Subscription expiry job failed: {}", e),
        }
    }
}
