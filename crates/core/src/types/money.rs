//! Decimal money amounts.
//!
//! Prices are stored as `NUMERIC(12, 2)` and handled as [`Decimal`] in
//! rupees. The payment gateway works in paise, so [`Money::to_minor_units`]
//! and [`Money::from_minor_units`] convert at the boundary.

use core::fmt;
use core::ops::{Add, Sub};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// ISO 4217 currency codes accepted by the store.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum CurrencyCode {
    #[default]
    INR,
    USD,
}

impl CurrencyCode {
    /// Display symbol for the currency.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::INR => "₹",
            Self::USD => "$",
        }
    }

    /// Three-letter ISO code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::INR => "INR",
            Self::USD => "USD",
        }
    }
}

/// A non-currency-mixing amount of money.
///
/// Arithmetic between two `Money` values assumes the same currency; the
/// store only sells in a single currency at a time so mixing is a bug, not
/// a runtime condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money {
    /// Amount in the currency's standard unit (rupees, not paise).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency: CurrencyCode,
}

impl Money {
    /// Create a new amount, rounded to two decimal places.
    #[must_use]
    pub fn new(amount: Decimal, currency: CurrencyCode) -> Self {
        Self {
            amount: round_currency(amount),
            currency,
        }
    }

    /// Create an amount in rupees.
    #[must_use]
    pub fn inr(amount: Decimal) -> Self {
        Self::new(amount, CurrencyCode::INR)
    }

    /// Zero rupees.
    #[must_use]
    pub const fn zero() -> Self {
        Self {
            amount: Decimal::ZERO,
            currency: CurrencyCode::INR,
        }
    }

    /// Whether the amount is exactly zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Multiply by a quantity.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self::new(self.amount * Decimal::from(quantity), self.currency)
    }

    /// Subtract, flooring at zero.
    #[must_use]
    pub fn saturating_sub(self, other: Self) -> Self {
        let amount = (self.amount - other.amount).max(Decimal::ZERO);
        Self::new(amount, self.currency)
    }

    /// The smaller of two amounts.
    #[must_use]
    pub fn min(self, other: Self) -> Self {
        if other.amount < self.amount { other } else { self }
    }

    /// Amount in minor units (paise), as the payment gateway expects.
    ///
    /// Returns `None` if the amount does not fit in an `i64`.
    #[must_use]
    pub fn to_minor_units(&self) -> Option<i64> {
        use rust_decimal::prelude::ToPrimitive;
        (round_currency(self.amount) * Decimal::ONE_HUNDRED).to_i64()
    }

    /// Build an amount from minor units (paise).
    #[must_use]
    pub fn from_minor_units(minor: i64, currency: CurrencyCode) -> Self {
        Self::new(Decimal::new(minor, 2), currency)
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.amount + rhs.amount, self.currency)
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.amount - rhs.amount, self.currency)
    }
}

impl core::iter::Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), Add::add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:.2}", self.currency.symbol(), self.amount)
    }
}

/// Round to two decimal places, half away from zero.
#[must_use]
pub fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minor_units() {
        let price = Money::inr(Decimal::new(49_950, 2));
        assert_eq!(price.to_minor_units(), Some(49_950));
        assert_eq!(Money::from_minor_units(49_950, CurrencyCode::INR), price);
    }

    #[test]
    fn test_rounding_half_up() {
        assert_eq!(round_currency(Decimal::new(12_345, 3)), Decimal::new(1_235, 2));
        assert_eq!(round_currency(Decimal::new(12_344, 3)), Decimal::new(1_234, 2));
    }

    #[test]
    fn test_saturating_sub_floors_at_zero() {
        let a = Money::inr(Decimal::from(100));
        let b = Money::inr(Decimal::from(150));
        assert!(a.saturating_sub(b).is_zero());
        assert_eq!(b.saturating_sub(a).amount, Decimal::from(50));
    }

    #[test]
    fn test_sum_and_display() {
        let total: Money = [Decimal::from(199), Decimal::from(300)]
            .into_iter()
            .map(Money::inr)
            .sum();
        assert_eq!(total.to_string(), "₹499.00");
    }
}
