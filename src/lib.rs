pub mod config;
pub mod db;
pub mod dtos;
pub mod error;
pub mod handler;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod service;
pub mod utils;

use std::sync::Arc;

use config::Config;
use db::db::DBClient;
use service::{
    escrow_service::EscrowService,
    ledger_service::LedgerService,
    notification_service::NotificationService,
    payment_gateway::{PaymentGateway, RazorpayGateway},
    project_service::ProjectService,
    purchase_service::PurchaseService,
    settlement_service::SettlementService,
    subscription_service::SubscriptionService,
    withdrawal_service::WithdrawalService,
    work_service::WorkService,
};
use utils::upload::FileStore;

#[derive(Debug, Clone)]
pub struct AppState {
    pub env: Config,
    pub db_client: Arc<DBClient>,
    // Services
    pub ledger_service: Arc<LedgerService>,
    pub notification_service: Arc<NotificationService>,
    pub escrow_service: Arc<EscrowService>,
    pub project_service: Arc<ProjectService>,
    pub work_service: Arc<WorkService>,
    pub withdrawal_service: Arc<WithdrawalService>,
    pub subscription_service: Arc<SubscriptionService>,
    pub purchase_service: Arc<PurchaseService>,
}

impl AppState {
    pub fn new(db_client: DBClient, config: Config) -> Self {
        let gateway: Arc<dyn PaymentGateway> = Arc::new(RazorpayGateway::new(&config));
        Self::with_gateway(db_client, config, gateway)
    }

    pub fn with_gateway(db_client: DBClient, config: Config, gateway: Arc<dyn PaymentGateway>) -> Self {
        let db_client_arc = Arc::new(db_client);
        let policy = config.credit_policy;

        let ledger_service = Arc::new(LedgerService::new(db_client_arc.clone()));
        let notification_service = Arc::new(NotificationService::new(db_client_arc.clone()));
        let escrow_service = Arc::new(EscrowService::new(db_client_arc.clone()));
        let project_service = Arc::new(ProjectService::new(db_client_arc.clone()));
        let work_service = Arc::new(WorkService::new(
            db_client_arc.clone(),
            FileStore::new(&config.upload_dir),
            SettlementService::new(config.allow_fund_on_approval),
        ));
        let withdrawal_service = Arc::new(WithdrawalService::new(db_client_arc.clone(), policy));
        let subscription_service = Arc::new(SubscriptionService::new(db_client_arc.clone(), gateway.clone()));
        let purchase_service = Arc::new(PurchaseService::new(db_client_arc.clone(), gateway, policy));

        Self {
            env: config,
            db_client: db_client_arc,
            ledger_service,
            notification_service,
            escrow_service,
            project_service,
            work_service,
            withdrawal_service,
            subscription_service,
            purchase_service,
        }
    }
}
