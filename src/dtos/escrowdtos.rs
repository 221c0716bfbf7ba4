use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FundEscrowDto {
    pub project_id: Uuid,
    pub company_id: Uuid,
    pub freelancer_id: Uuid,

    #[validate(range(min = 1, message = "Amount must be greater than zero"))]
    pub amount: i64,
}
