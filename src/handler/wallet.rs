use std::sync::Arc;

use axum::{
    extract::Query,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use validator::Validate;

use crate::{
    dtos::{userdtos::RequestQueryDto, walletdtos::*, ApiResponse},
    error::HttpError,
    middleware::JWTAuthMiddeware,
    service::subscription_service::PaymentProof,
    AppState,
};

pub fn wallet_handler() -> Router {
    Router::new()
        .route("/", get(get_wallet))
        .route("/transactions", get(get_transactions))
        .route("/transfer", post(transfer_credits))
        .route("/withdrawals", post(request_withdrawal).get(get_my_withdrawals))
        .route("/purchase/order", post(create_credit_order))
        .route("/purchase/verify", post(verify_credit_purchase))
}

pub async fn get_wallet(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let balance = app_state
        .ledger_service
        .balance(auth.user.id)
        .await
        .map_err(|e| e.into_http("Failed to load wallet"))?;
    let recent_transactions = app_state
        .ledger_service
        .transactions(auth.user.id, 10, 0)
        .await
        .map_err(|e| e.into_http("Failed to load wallet"))?;

    Ok(Json(ApiResponse::success(
        "Wallet retrieved successfully",
        WalletDto {
            balance,
            recent_transactions,
        },
    )))
}

pub async fn get_transactions(
    Query(query): Query<RequestQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    query.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;
    let (limit, offset) = query.limit_offset();

    let transactions = app_state
        .ledger_service
        .transactions(auth.user.id, limit, offset)
        .await
        .map_err(|e| e.into_http("Failed to load transactions"))?;

    Ok(Json(ApiResponse::success("Transactions retrieved successfully", transactions)))
}

pub async fn transfer_credits(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<TransferDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let (sent, _) = app_state
        .ledger_service
        .transfer(auth.user.id, body.recipient_id, body.amount, body.note)
        .await
        .map_err(|e| e.into_http("Failed to transfer VCreds"))?;

    let balance = app_state
        .ledger_service
        .balance(auth.user.id)
        .await
        .map_err(|e| e.into_http("Failed to load balance"))?;

    Ok(Json(ApiResponse::success(
        "VCreds transferred successfully",
        TransferResultDto { sent, balance },
    )))
}

pub async fn request_withdrawal(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<WithdrawalRequestDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let withdrawal = app_state
        .withdrawal_service
        .request(auth.user.id, body.credits, body.payout_details)
        .await
        .map_err(|e| e.into_http("Failed to request withdrawal"))?;

    let message = format!(
        "Withdrawal requested. You will receive {} after a {} processing fee",
        withdrawal.net_amount, withdrawal.fee_amount
    );
    Ok(Json(ApiResponse::success(&message, withdrawal)))
}

pub async fn get_my_withdrawals(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let withdrawals = app_state
        .withdrawal_service
        .list_own(auth.user.id)
        .await
        .map_err(|e| e.into_http("Failed to load withdrawals"))?;

    Ok(Json(ApiResponse::success("Withdrawals retrieved successfully", withdrawals)))
}

pub async fn create_credit_order(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<CreditOrderDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let checkout = app_state
        .purchase_service
        .create_credit_order(&auth.user, body.credits)
        .await
        .map_err(|e| e.into_http("Failed to create payment order"))?;

    Ok(Json(ApiResponse::success("Payment order created", checkout)))
}

pub async fn verify_credit_purchase(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<VerifyPaymentDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let purchase = app_state
        .purchase_service
        .verify_credit_payment(
            auth.user.id,
            PaymentProof {
                order_id: body.razorpay_order_id,
                payment_id: body.razorpay_payment_id,
                signature: body.razorpay_signature,
            },
        )
        .await
        .map_err(|e| e.into_http("Failed to verify payment"))?;

    Ok(Json(ApiResponse::success("Payment verified and VCreds added", purchase)))
}
