use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{subscriptionmodels::UserSubscription, usermodel::User};

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RequestQueryDto {
    #[validate(range(min = 1))]
    pub page: Option<usize>,
    #[validate(range(min = 1, max = 50))]
    pub limit: Option<usize>,
}

impl RequestQueryDto {
    /// (limit, offset) with a default page size of 20.
    pub fn limit_offset(&self) -> (i64, i64) {
        let limit = self.limit.unwrap_or(20) as i64;
        let page = self.page.unwrap_or(1) as i64;
        (limit, (page - 1) * limit)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FilterUserDto {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl FilterUserDto {
    pub fn filter_user(user: &User) -> Self {
        FilterUserDto {
            id: user.id.to_string(),
            name: user.name.to_owned(),
            email: user.email.to_owned(),
            role: user.role.to_str().to_string(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserProfileDto {
    pub user: FilterUserDto,
    pub balance: i64,
    pub subscription: Option<UserSubscription>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults() {
        let query = RequestQueryDto { page: None, limit: None };
        assert_eq!(query.limit_offset(), (20, 0));

        let query = RequestQueryDto { page: Some(3), limit: Some(10) };
        assert_eq!(query.limit_offset(), (10, 20));
    }

    #[test]
    fn test_pagination_bounds() {
        let query = RequestQueryDto { page: Some(0), limit: Some(51) };
        assert!(query.validate().is_err());
    }
}
