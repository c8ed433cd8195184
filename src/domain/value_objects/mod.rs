//! Value Objects for the storefront

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub const DEFAULT_CURRENCY: &str = "TRY";

/// Amount in a single currency. Arithmetic across currencies is refused.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money { amount: Decimal, currency: String }

impl Money {
    pub fn new(amount: Decimal, currency: &str) -> Self { Self { amount, currency: currency.to_string() } }
    pub fn lira(amount: Decimal) -> Self { Self::new(amount, DEFAULT_CURRENCY) }
    pub fn zero(currency: &str) -> Self { Self::new(Decimal::ZERO, currency) }
    pub fn amount(&self) -> Decimal { self.amount }
    pub fn currency(&self) -> &str { &self.currency }

    pub fn add(&self, other: &Money) -> Result<Money, MoneyError> {
        let currency = self.same_currency(other)?;
        self.amount.checked_add(other.amount).map(|a| Money::new(a, currency)).ok_or(MoneyError::Overflow)
    }

    pub fn subtract(&self, other: &Money) -> Result<Money, MoneyError> {
        let currency = self.same_currency(other)?;
        self.amount.checked_sub(other.amount).map(|a| Money::new(a, currency)).ok_or(MoneyError::Overflow)
    }

    fn same_currency(&self, other: &Money) -> Result<&str, MoneyError> {
        if self.currency == other.currency { Ok(&self.currency) } else { Err(MoneyError::CurrencyMismatch) }
    }

    pub fn multiply(&self, qty: u32) -> Result<Money, MoneyError> {
        self.amount.checked_mul(Decimal::from(qty)).map(|a| Money::new(a, &self.currency)).ok_or(MoneyError::Overflow)
    }

    /// `percent` of this amount, e.g. `percent(2)` of 1000 is 20.
    pub fn percent(&self, percent: Decimal) -> Result<Money, MoneyError> {
        self.amount
            .checked_mul(percent)
            .and_then(|a| a.checked_div(Decimal::ONE_HUNDRED))
            .map(|a| Money::new(a, &self.currency))
            .ok_or(MoneyError::Overflow)
    }
}

impl Default for Money { fn default() -> Self { Self::zero(DEFAULT_CURRENCY) } }

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{} {}", self.amount.round_dp(2), self.currency) }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    #[error("Currency mismatch")]
    CurrencyMismatch,
    #[error("Amount out of range")]
    Overflow,
}

/// Parcel dimensions in centimetres.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Dimensions { pub length_cm: f64, pub width_cm: f64, pub height_cm: f64 }

impl Dimensions {
    pub const DESI_DIVISOR: f64 = 3000.0;

    pub fn new(length_cm: f64, width_cm: f64, height_cm: f64) -> Self { Self { length_cm, width_cm, height_cm } }

    /// Volumetric weight as used by Turkish carriers.
    pub fn desi(&self) -> f64 { (self.length_cm * self.width_cm * self.height_cm) / Self::DESI_DIVISOR }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lira_amounts_add_up() {
        let a = Money::lira(Decimal::new(100, 0));
        let b = Money::lira(Decimal::new(50, 0));
        assert_eq!(a.add(&b).unwrap().amount(), Decimal::new(150, 0));
    }

    #[test]
    fn mixed_currencies_are_refused() {
        let a = Money::lira(Decimal::ONE);
        let b = Money::new(Decimal::ONE, "EUR");
        assert_eq!(a.subtract(&b), Err(MoneyError::CurrencyMismatch));
    }

    #[test]
    fn test_money_percent() {
        let total = Money::lira(Decimal::new(1000, 0));
        assert_eq!(total.percent(Decimal::new(2, 0)).unwrap().amount(), Decimal::new(20, 0));
    }

    #[test]
    fn arithmetic_past_decimal_range_is_an_error() {
        let huge = Money::lira(Decimal::MAX);
        assert_eq!(huge.multiply(1000), Err(MoneyError::Overflow));
        assert_eq!(huge.add(&Money::lira(Decimal::ONE)), Err(MoneyError::Overflow));
        assert_eq!(huge.percent(Decimal::ONE_HUNDRED * Decimal::ONE_HUNDRED), Err(MoneyError::Overflow));
        assert_eq!(Money::lira(Decimal::new(25, 0)).multiply(4).unwrap().amount(), Decimal::ONE_HUNDRED);
    }

    #[test]
    fn test_desi() {
        assert_eq!(Dimensions::new(30.0, 20.0, 10.0).desi(), 2.0);
    }
}
