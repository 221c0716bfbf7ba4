// config.rs
use anyhow::{Context, Result};

use crate::utils::credits::CreditPolicy;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub port: u16,
    pub upload_dir: String,
    // Payment gateway
    pub razorpay_key_id: String,
    pub razorpay_key_secret: String,
    pub razorpay_base_url: String,
    pub credit_policy: CreditPolicy,
    pub allow_fund_on_approval: bool,
    pub cors_origins: Vec<String>,
}

fn var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{} has an invalid value: {}", key, raw)),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn init() -> Result<Config> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let jwt_secret = std::env::var("JWT_SECRET_KEY").context("JWT_SECRET_KEY must be set")?;

        let defaults = CreditPolicy::default();
        let credit_policy = CreditPolicy {
            purchase_rate: parse_or("VCRED_PURCHASE_RATE", defaults.purchase_rate)?,
            payout_rate: parse_or("VCRED_PAYOUT_RATE", defaults.payout_rate)?,
            withdrawal_min_credits: parse_or("WITHDRAWAL_MIN_CREDITS", defaults.withdrawal_min_credits)?,
            withdrawal_fee_percent: parse_or("WITHDRAWAL_FEE_PERCENT", defaults.withdrawal_fee_percent)?,
        };

        let cors_origins = var_or("CORS_ORIGINS", "http://localhost:5173,http://localhost:8000")
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Ok(Config {
            database_url,
            jwt_secret,
            port: parse_or("PORT", 8000)?,
            upload_dir: var_or("UPLOAD_DIR", "uploads"),
            razorpay_key_id: var_or("RAZORPAY_KEY_ID", "test_key_id"),
            razorpay_key_secret: var_or("RAZORPAY_KEY_SECRET", "test_key_secret"),
            razorpay_base_url: var_or("RAZORPAY_BASE_URL", "https://api.razorpay.com/v1"),
            credit_policy,
            allow_fund_on_approval: parse_or("ALLOW_FUND_ON_APPROVAL", true)?,
            cors_origins,
        })
    }

    /// Defaults with an explicit database, used by tests and tooling.
    pub fn local(database_url: impl Into<String>) -> Config {
        Config {
            database_url: database_url.into(),
            jwt_secret: "local_jwt_secret".to_string(),
            port: 8000,
            upload_dir: std::env::temp_dir()
                .join("skill-vault-uploads")
                .to_string_lossy()
                .into_owned(),
            razorpay_key_id: "test_key_id".to_string(),
            razorpay_key_secret: "test_key_secret".to_string(),
            razorpay_base_url: "https://api.razorpay.com/v1".to_string(),
            credit_policy: CreditPolicy::default(),
            allow_fund_on_approval: true,
            cors_origins: vec!["http://localhost:5173".to_string()],
        }
    }
}
