pub mod error;
pub mod ledger_service;
pub mod notification_service;
pub mod escrow_service;
pub mod project_service;
pub mod work_service;
pub mod settlement_service;
pub mod withdrawal_service;
pub mod payment_gateway;
pub mod subscription_service;
pub mod purchase_service;
pub mod background_jobs;

use sqlx::{Postgres, Transaction};

use self::error::ServiceError;

/// Commits on success. On failure rolls back explicitly and logs the cause.
pub(crate) async fn finish_tx<T>(
    tx: Transaction<'_, Postgres>,
    result: Result<T, ServiceError>,
    context: &str,
) -> Result<T, ServiceError> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(e) => {
            tracing::error!("{} rolled back: {}", context, e);
            if let Err(rollback_err) = tx.rollback().await {
                tracing::error!("Rollback failed for {}: {}", context, rollback_err);
            }
            Err(e)
        }
    }
}
