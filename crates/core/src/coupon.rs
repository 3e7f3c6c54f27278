//! Coupon validation and discount computation.
//!
//! A coupon is looked up by code and then checked against the cart: it must
//! be active, inside its validity window, under its usage limits, and the
//! subtotal must reach the minimum order value. The discount is a percentage
//! (optionally capped) or a fixed amount, and never exceeds the subtotal.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{DiscountKind, Money};

/// Minimum coupon code length.
pub const MIN_CODE_LENGTH: usize = 3;

/// Maximum coupon code length.
pub const MAX_CODE_LENGTH: usize = 32;

/// Reasons a coupon cannot be applied or defined.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CouponError {
    /// Code is empty, too long, or has characters outside `A-Z 0-9 - _`.
    #[error("invalid coupon code")]
    InvalidCode,
    /// No coupon with that code.
    #[error("coupon not found")]
    NotFound,
    /// Coupon has been switched off.
    #[error("coupon is not active")]
    Inactive,
    /// Validity window has not opened yet.
    #[error("coupon is not valid yet")]
    NotStarted,
    /// Validity window has closed.
    #[error("coupon has expired")]
    Expired,
    /// Global usage limit reached.
    #[error("coupon usage limit reached")]
    UsageLimitReached,
    /// This customer already used the coupon the allowed number of times.
    #[error("you have already used this coupon")]
    UserLimitReached,
    /// Subtotal below the coupon's minimum order value.
    #[error("minimum order value of {minimum} not met")]
    MinimumOrderNotMet {
        /// Required subtotal.
        minimum: Decimal,
    },
    /// Discount value is out of range for its kind.
    #[error("invalid discount value: {0}")]
    InvalidValue(String),
}

/// The rule set of a stored coupon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponRules {
    /// Normalized (upper-case) code.
    pub code: String,
    /// Percentage or fixed amount.
    pub kind: DiscountKind,
    /// Percentage (0-100] or rupee amount, depending on `kind`.
    pub value: Decimal,
    /// Cap for percentage discounts.
    pub max_discount: Option<Decimal>,
    /// Minimum subtotal required.
    pub min_order_value: Option<Decimal>,
    /// Total redemptions allowed across all customers.
    pub usage_limit: Option<i32>,
    /// Redemptions so far.
    pub usage_count: i32,
    /// Redemptions allowed per customer.
    pub per_user_limit: Option<i32>,
    /// Start of validity window.
    pub starts_at: Option<DateTime<Utc>>,
    /// End of validity window.
    pub expires_at: Option<DateTime<Utc>>,
    /// Admin on/off switch.
    pub active: bool,
}

impl CouponRules {
    /// Check a coupon against a cart and compute the discount.
    ///
    /// `uses_by_user` is how many paid orders this customer already placed
    /// with the code.
    ///
    /// # Errors
    ///
    /// Returns the first failing rule, checked in this order: active,
    /// start, expiry, global limit, per-user limit, minimum order value.
    pub fn validate(
        &self,
        now: DateTime<Utc>,
        subtotal: Money,
        uses_by_user: i64,
    ) -> Result<Money, CouponError> {
        if !self.active {
            return Err(CouponError::Inactive);
        }

        if self.starts_at.is_some_and(|start| now < start) {
            return Err(CouponError::NotStarted);
        }

        if self.expires_at.is_some_and(|end| now > end) {
            return Err(CouponError::Expired);
        }

        self.check_redemption(uses_by_user)?;

        if let Some(minimum) = self.min_order_value
            && subtotal.amount < minimum
        {
            return Err(CouponError::MinimumOrderNotMet { minimum });
        }

        Ok(self.discount_for(subtotal))
    }

    /// Check the global and per-customer usage limits.
    ///
    /// Checked again when a payment is captured, since several checkouts can
    /// hold the same coupon at once.
    ///
    /// # Errors
    ///
    /// Returns `CouponError::UsageLimitReached` or
    /// `CouponError::UserLimitReached`.
    pub fn check_redemption(&self, uses_by_user: i64) -> Result<(), CouponError> {
        if self
            .usage_limit
            .is_some_and(|limit| self.usage_count >= limit)
        {
            return Err(CouponError::UsageLimitReached);
        }

        if self
            .per_user_limit
            .is_some_and(|limit| uses_by_user >= i64::from(limit))
        {
            return Err(CouponError::UserLimitReached);
        }

        Ok(())
    }

    /// Discount this coupon gives on `subtotal`, ignoring eligibility.
    #[must_use]
    pub fn discount_for(&self, subtotal: Money) -> Money {
        let raw = match self.kind {
            DiscountKind::Percentage => {
                let pct = subtotal.amount * self.value / Decimal::ONE_HUNDRED;
                self.max_discount.map_or(pct, |cap| pct.min(cap))
            }
            DiscountKind::Fixed => self.value,
        };

        Money::new(raw.max(Decimal::ZERO), subtotal.currency).min(subtotal)
    }

    /// Validate a coupon definition before it is stored.
    ///
    /// # Errors
    ///
    /// Returns `CouponError::InvalidCode` for a malformed code and
    /// `CouponError::InvalidValue` for out-of-range amounts or a window that
    /// ends before it starts.
    pub fn check_definition(&self) -> Result<(), CouponError> {
        normalize_code(&self.code)?;

        match self.kind {
            DiscountKind::Percentage
                if self.value <= Decimal::ZERO || self.value > Decimal::ONE_HUNDRED =>
            {
                return Err(CouponError::InvalidValue(
                    "percentage must be between 0 and 100".to_owned(),
                ));
            }
            DiscountKind::Fixed if self.value <= Decimal::ZERO => {
                return Err(CouponError::InvalidValue(
                    "fixed discount must be positive".to_owned(),
                ));
            }
            _ => {}
        }

        if self.max_discount.is_some_and(|cap| cap <= Decimal::ZERO) {
            return Err(CouponError::InvalidValue(
                "max discount must be positive".to_owned(),
            ));
        }

        if self.min_order_value.is_some_and(|min| min < Decimal::ZERO) {
            return Err(CouponError::InvalidValue(
                "minimum order value cannot be negative".to_owned(),
            ));
        }

        if self.usage_limit.is_some_and(|l| l <= 0) || self.per_user_limit.is_some_and(|l| l <= 0)
        {
            return Err(CouponError::InvalidValue(
                "usage limits must be positive".to_owned(),
            ));
        }

        if let (Some(start), Some(end)) = (self.starts_at, self.expires_at)
            && end <= start
        {
            return Err(CouponError::InvalidValue(
                "expiry must be after start".to_owned(),
            ));
        }

        Ok(())
    }
}

/// Normalize a customer-entered code: trim and upper-case.
///
/// # Errors
///
/// Returns `CouponError::InvalidCode` if the result is too short, too long,
/// or contains characters other than ASCII letters, digits, `-` and `_`.
pub fn normalize_code(raw: &str) -> Result<String, CouponError> {
    let code = raw.trim().to_ascii_uppercase();

    if code.len() < MIN_CODE_LENGTH || code.len() > MAX_CODE_LENGTH {
        return Err(CouponError::InvalidCode);
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(CouponError::InvalidCode);
    }

    Ok(code)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn rupees(n: i64) -> Money {
        Money::inr(Decimal::from(n))
    }

    fn percent_coupon(value: i64) -> CouponRules {
        CouponRules {
            code: "READ20".to_owned(),
            kind: DiscountKind::Percentage,
            value: Decimal::from(value),
            max_discount: None,
            min_order_value: None,
            usage_limit: None,
            usage_count: 0,
            per_user_limit: None,
            starts_at: None,
            expires_at: None,
            active: true,
        }
    }

    #[test]
    fn test_percentage_discount() {
        let coupon = percent_coupon(20);
        let discount = coupon.validate(Utc::now(), rupees(500), 0).unwrap();
        assert_eq!(discount, rupees(100));
    }

    #[test]
    fn test_percentage_discount_capped() {
        let coupon = CouponRules {
            max_discount: Some(Decimal::from(75)),
            ..percent_coupon(20)
        };
        assert_eq!(coupon.discount_for(rupees(500)), rupees(75));
    }

    #[test]
    fn test_fixed_discount_never_exceeds_subtotal() {
        let coupon = CouponRules {
            kind: DiscountKind::Fixed,
            value: Decimal::from(300),
            ..percent_coupon(0)
        };
        assert_eq!(coupon.discount_for(rupees(199)), rupees(199));
    }

    #[test]
    fn test_percentage_rounds_to_paise() {
        let coupon = percent_coupon(15);
        let subtotal = Money::inr(Decimal::new(33_333, 2));
        // 15% of 333.33 = 49.9995
        assert_eq!(coupon.discount_for(subtotal).amount, Decimal::new(5_000, 2));
    }

    #[test]
    fn test_redemption_ignores_window_and_minimum() {
        let coupon = CouponRules {
            expires_at: Some(Utc::now() - Duration::days(1)),
            min_order_value: Some(Decimal::from(1_000)),
            usage_limit: Some(10),
            usage_count: 9,
            per_user_limit: Some(1),
            ..percent_coupon(10)
        };
        assert_eq!(coupon.check_redemption(0), Ok(()));
    }

    #[test]
    fn test_redemption_limits_reached_between_checkouts() {
        let coupon = CouponRules {
            usage_limit: Some(10),
            usage_count: 10,
            ..percent_coupon(10)
        };
        assert_eq!(coupon.check_redemption(0), Err(CouponError::UsageLimitReached));

        let coupon = CouponRules {
            per_user_limit: Some(1),
            ..percent_coupon(10)
        };
        assert_eq!(coupon.check_redemption(1), Err(CouponError::UserLimitReached));
    }

    #[test]
    fn test_inactive() {
        let coupon = CouponRules {
            active: false,
            ..percent_coupon(10)
        };
        assert_eq!(
            coupon.validate(Utc::now(), rupees(100), 0),
            Err(CouponError::Inactive)
        );
    }

    #[test]
    fn test_window() {
        let now = Utc::now();
        let future = CouponRules {
            starts_at: Some(now + Duration::days(1)),
            ..percent_coupon(10)
        };
        assert_eq!(
            future.validate(now, rupees(100), 0),
            Err(CouponError::NotStarted)
        );

        let expired = CouponRules {
            expires_at: Some(now - Duration::hours(1)),
            ..percent_coupon(10)
        };
        assert_eq!(
            expired.validate(now, rupees(100), 0),
            Err(CouponError::Expired)
        );
    }

    #[test]
    fn test_usage_limits() {
        let exhausted = CouponRules {
            usage_limit: Some(5),
            usage_count: 5,
            ..percent_coupon(10)
        };
        assert_eq!(
            exhausted.validate(Utc::now(), rupees(100), 0),
            Err(CouponError::UsageLimitReached)
        );

        let once_per_user = CouponRules {
            per_user_limit: Some(1),
            ..percent_coupon(10)
        };
        assert_eq!(
            once_per_user.validate(Utc::now(), rupees(100), 1),
            Err(CouponError::UserLimitReached)
        );
        assert!(once_per_user.validate(Utc::now(), rupees(100), 0).is_ok());
    }

    #[test]
    fn test_minimum_order_value() {
        let coupon = CouponRules {
            min_order_value: Some(Decimal::from(499)),
            ..percent_coupon(10)
        };
        assert_eq!(
            coupon.validate(Utc::now(), rupees(498), 0),
            Err(CouponError::MinimumOrderNotMet {
                minimum: Decimal::from(499)
            })
        );
        assert_eq!(
            coupon.validate(Utc::now(), rupees(499), 0).unwrap(),
            Money::inr(Decimal::new(4_990, 2))
        );
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("  welcome10 ").unwrap(), "WELCOME10");
        assert_eq!(normalize_code("ab"), Err(CouponError::InvalidCode));
        assert_eq!(normalize_code("no spaces"), Err(CouponError::InvalidCode));
        assert_eq!(normalize_code("AUTHOR_RIYA-5").unwrap(), "AUTHOR_RIYA-5");
    }

    #[test]
    fn test_check_definition() {
        assert!(percent_coupon(20).check_definition().is_ok());
        assert!(matches!(
            percent_coupon(120).check_definition(),
            Err(CouponError::InvalidValue(_))
        ));

        let now = Utc::now();
        let backwards = CouponRules {
            starts_at: Some(now),
            expires_at: Some(now - Duration::days(1)),
            ..percent_coupon(20)
        };
        assert!(matches!(
            backwards.check_definition(),
            Err(CouponError::InvalidValue(_))
        ));
    }
}
