//! VCred conversion rules.
//!
//! Companies buy VCreds at `purchase_rate` currency units each and freelancers
//! cash them out at `payout_rate`. Gateway amounts are in minor units
//! (1 unit = 100 minor units).
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CreditPolicy {
    pub purchase_rate: i64,
    pub payout_rate: i64,
    pub withdrawal_min_credits: i64,
    pub withdrawal_fee_percent: i64,
}

impl Default for CreditPolicy {
    fn default() -> Self {
        Self {
            purchase_rate: 10,
            payout_rate: 9,
            withdrawal_min_credits: 10,
            withdrawal_fee_percent: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WithdrawalQuote {
    pub credits: i64,
    pub gross_amount: i64,
    pub fee_amount: i64,
    pub net_amount: i64,
}

impl CreditPolicy {
    /// Prices a withdrawal. The fee is rounded half up to whole currency units.
    pub fn quote_withdrawal(&self, credits: i64) -> Result<WithdrawalQuote, String> {
        if credits < self.withdrawal_min_credits {
            return Err(format!(
                "Minimum withdrawal is {} VCreds",
                self.withdrawal_min_credits
            ));
        }

        let too_large = || "Withdrawal amount is too large".to_string();
        let gross_amount = credits.checked_mul(self.payout_rate).ok_or_else(too_large)?;
        let fee_amount = gross_amount
            .checked_mul(self.withdrawal_fee_percent)
            .and_then(|fee| fee.checked_add(50))
            .ok_or_else(too_large)?
            / 100;

        Ok(WithdrawalQuote {
            credits,
            gross_amount,
            fee_amount,
            net_amount: gross_amount - fee_amount,
        })
    }

    /// Gateway charge for buying `credits` VCreds, in minor units.
    pub fn purchase_amount_minor(&self, credits: i64) -> Result<i64, String> {
        if credits <= 0 {
            return Err("Credits must be greater than zero".to_string());
        }
        credits
            .checked_mul(self.purchase_rate)
            .and_then(to_minor_units)
            .ok_or_else(|| "Purchase amount is too large".to_string())
    }
}

pub fn to_minor_units(units: i64) -> Option<i64> {
    units.checked_mul(100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_twenty_credits() {
        let quote = CreditPolicy::default().quote_withdrawal(20).unwrap();
        assert_eq!(quote.gross_amount, 180);
        assert_eq!(quote.fee_amount, 4);
        assert_eq!(quote.net_amount, 176);
    }

    #[test]
    fn test_quote_at_minimum() {
        let quote = CreditPolicy::default().quote_withdrawal(10).unwrap();
        assert_eq!(quote.gross_amount, 90);
        // 1.8 rounds to 2
        assert_eq!(quote.fee_amount, 2);
        assert_eq!(quote.net_amount, 88);
    }

    #[test]
    fn test_quote_below_minimum() {
        let err = CreditPolicy::default().quote_withdrawal(9).unwrap_err();
        assert_eq!(err, "Minimum withdrawal is 10 VCreds");
        assert!(CreditPolicy::default().quote_withdrawal(0).is_err());
        assert!(CreditPolicy::default().quote_withdrawal(-5).is_err());
    }

    #[test]
    fn test_quote_too_large() {
        let policy = CreditPolicy::default();
        let err = policy.quote_withdrawal(1_000_000_000_000_000_000).unwrap_err();
        assert_eq!(err, "Withdrawal amount is too large");
        assert!(policy.quote_withdrawal(i64::MAX).is_err());
        // gross fits, fee product does not
        assert!(policy.quote_withdrawal(i64::MAX / 9).is_err());
    }

    #[test]
    fn test_fee_rounds_half_up() {
        let policy = CreditPolicy {
            payout_rate: 25,
            ..CreditPolicy::default()
        };
        // 10 * 25 = 250, 2% = 5.0
        assert_eq!(policy.quote_withdrawal(10).unwrap().fee_amount, 5);
        // 11 * 25 = 275, 2% = 5.5
        assert_eq!(policy.quote_withdrawal(11).unwrap().fee_amount, 6);
    }

    #[test]
    fn test_purchase_amount_minor() {
        let policy = CreditPolicy::default();
        assert_eq!(policy.purchase_amount_minor(50), Ok(50_000));
        assert!(policy.purchase_amount_minor(0).is_err());
        assert!(policy.purchase_amount_minor(i64::MAX).is_err());
    }
}
