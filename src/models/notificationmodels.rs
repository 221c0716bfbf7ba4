use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NotificationKind {
    ApplicationReceived,
    ApplicationAccepted,
    EscrowFunded,
    WorkSubmitted,
    RevisionRequested,
    PaymentReceived,
    WorkApproved,
    ProjectCancelled,
    EscrowRefunded,
    WithdrawalRequested,
    WithdrawalProcessed,
    SubscriptionActivated,
    CreditsPurchased,
    CreditsReceived,
}

impl NotificationKind {
    pub fn to_str(&self) -> &str {
        match self {
            NotificationKind::ApplicationReceived => "application_received",
            NotificationKind::ApplicationAccepted => "application_accepted",
            NotificationKind::EscrowFunded => "escrow_funded",
            NotificationKind::WorkSubmitted => "work_submitted",
            NotificationKind::RevisionRequested => "revision_requested",
            NotificationKind::PaymentReceived => "payment_received",
            NotificationKind::WorkApproved => "work_approved",
            NotificationKind::ProjectCancelled => "project_cancelled",
            NotificationKind::EscrowRefunded => "escrow_refunded",
            NotificationKind::WithdrawalRequested => "withdrawal_requested",
            NotificationKind::WithdrawalProcessed => "withdrawal_processed",
            NotificationKind::SubscriptionActivated => "subscription_activated",
            NotificationKind::CreditsPurchased => "credits_purchased",
            NotificationKind::CreditsReceived => "credits_received",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub project_id: Option<Uuid>,
    pub metadata: Option<serde_json::Value>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub project_id: Option<Uuid>,
    pub metadata: Option<serde_json::Value>,
}

impl NewNotification {
    pub fn new(user_id: Uuid, kind: NotificationKind, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            user_id,
            kind,
            title: title.into(),
            message: message.into(),
            project_id: None,
            metadata: None,
        }
    }

    pub fn for_project(mut self, project_id: Uuid) -> Self {
        self.project_id = Some(project_id);
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}
