use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::ledgermodels::LedgerTransaction;

#[derive(Debug, Serialize)]
pub struct WalletDto {
    pub balance: i64,
    pub recent_transactions: Vec<LedgerTransaction>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TransferDto {
    pub recipient_id: Uuid,

    #[validate(range(min = 1, message = "Amount must be greater than zero"))]
    pub amount: i64,

    #[validate(length(max = 255, message = "Note must be at most 255 characters"))]
    pub note: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TransferResultDto {
    pub sent: LedgerTransaction,
    pub balance: i64,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalRequestDto {
    #[validate(range(min = 1, message = "Credits must be greater than zero"))]
    pub credits: i64,

    pub payout_details: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreditOrderDto {
    #[validate(range(min = 1, message = "Credits must be greater than zero"))]
    pub credits: i64,
}

/// Checkout callback as posted by the payment widget.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct VerifyPaymentDto {
    #[validate(length(min = 1, message = "Order id is required"))]
    pub razorpay_order_id: String,

    #[validate(length(min = 1, message = "Payment id is required"))]
    pub razorpay_payment_id: String,

    #[validate(length(min = 1, message = "Signature is required"))]
    pub razorpay_signature: String,
}
