//! Type-safe price representation using decimal arithmetic.
//!
//! Prices come from the backend as JSON numbers. They are held as
//! [`Decimal`] so that cart totals (`Σ price × quantity`) never pick up
//! binary floating point drift.

use core::fmt;
use core::iter::Sum;
use core::ops::Add;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., euros, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// A zero amount in the default currency.
    #[must_use]
    pub const fn zero() -> Self {
        Self::new(Decimal::ZERO, CurrencyCode::EUR)
    }

    /// Create a price from a whole number of cents.
    #[must_use]
    pub fn from_cents(cents: i64, currency_code: CurrencyCode) -> Self {
        Self::new(Decimal::new(cents, 2), currency_code)
    }

    /// Price of `quantity` units at this unit price.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self::new(self.amount * Decimal::from(quantity), self.currency_code)
    }

    /// Whether the amount is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }
}

impl Default for Price {
    fn default() -> Self {
        Self::zero()
    }
}

impl Add for Price {
    type Output = Self;

    /// Adds amounts. The catalogue is single-currency, so the left-hand
    /// currency is kept.
    fn add(self, rhs: Self) -> Self {
        Self::new(self.amount + rhs.amount, self.currency_code)
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), Add::add)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{:.2}",
            self.currency_code.symbol(),
            self.amount.round_dp(2)
        )
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    EUR,
    USD,
    GBP,
    CAD,
    AUD,
}

impl CurrencyCode {
    /// Display symbol for the currency.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::EUR => "€",
            Self::USD | Self::CAD | Self::AUD => "$",
            Self::GBP => "£",
        }
    }

    /// Three-letter ISO code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::EUR => "EUR",
            Self::USD => "USD",
            Self::GBP => "GBP",
            Self::CAD => "CAD",
            Self::AUD => "AUD",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_times() {
        let unit = Price::from_cents(1050, CurrencyCode::EUR);
        assert_eq!(unit.times(3), Price::from_cents(3150, CurrencyCode::EUR));
        assert!(unit.times(0).is_zero());
    }

    #[test]
    fn test_sum_of_lines() {
        let total: Price = [
            Price::from_cents(1000, CurrencyCode::EUR).times(2),
            Price::from_cents(500, CurrencyCode::EUR).times(1),
        ]
        .into_iter()
        .sum();
        assert_eq!(total.amount, Decimal::new(25, 0));
    }

    #[test]
    fn test_sum_empty_is_zero() {
        let total: Price = core::iter::empty().sum();
        assert!(total.is_zero());
    }

    #[test]
    fn test_display() {
        assert_eq!(Price::from_cents(2500, CurrencyCode::EUR).to_string(), "€25.00");
        assert_eq!(Price::from_cents(199, CurrencyCode::USD).to_string(), "$1.99");
    }

    #[test]
    fn test_currency_code() {
        assert_eq!(CurrencyCode::default().code(), "EUR");
        assert_eq!(CurrencyCode::GBP.symbol(), "£");
    }
}
