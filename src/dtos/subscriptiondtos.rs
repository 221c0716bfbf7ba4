use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::withdrawalmodels::WithdrawalDecision;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionOrderDto {
    pub plan_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VerifySubscriptionDto {
    pub plan_id: Uuid,

    #[serde(rename = "razorpay_order_id")]
    #[validate(length(min = 1, message = "Order id is required"))]
    pub order_id: String,

    #[serde(rename = "razorpay_payment_id")]
    #[validate(length(min = 1, message = "Payment id is required"))]
    pub payment_id: String,

    #[serde(rename = "razorpay_signature")]
    #[validate(length(min = 1, message = "Signature is required"))]
    pub signature: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ProcessWithdrawalDto {
    pub decision: WithdrawalDecision,

    #[validate(length(max = 1000, message = "Notes must be at most 1000 characters"))]
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_body_mixes_gateway_and_app_fields() {
        let plan = Uuid::new_v4();
        let body = format!(
            r#"{{"planId":"{}","razorpay_order_id":"order_1","razorpay_payment_id":"pay_1","razorpay_signature":"abc"}}"#,
            plan
        );
        let dto: VerifySubscriptionDto = serde_json::from_str(&body).unwrap();
        assert_eq!(dto.plan_id, plan);
        assert_eq!(dto.order_id, "order_1");
        assert!(dto.validate().is_ok());
    }

    #[test]
    fn test_process_decision_is_restricted() {
        let dto: Result<ProcessWithdrawalDto, _> = serde_json::from_str(r#"{"decision":"pending"}"#);
        assert!(dto.is_err());
    }
}
