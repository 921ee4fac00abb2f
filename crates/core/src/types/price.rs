//! Monetary amounts as exact decimals.

use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A price in US dollars.
///
/// The platform stores prices as plain numeric columns; this wrapper keeps
/// the arithmetic exact and renders with a dollar sign and two decimal
/// places.
///
/// # Examples
///
/// ```
/// use plateful_core::Price;
///
/// let price: Price = "12.5".parse().unwrap();
/// assert_eq!(price.to_string(), "$12.50");
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Line total for `quantity` units at this price.
    #[must_use]
    pub fn times(&self, quantity: u32) -> Self {
        Self(self.0 * Decimal::from(quantity))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut amount = self.0.round_dp(2);
        amount.rescale(2);
        write!(f, "${amount}")
    }
}

impl From<Decimal> for Price {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl FromStr for Price {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Decimal::from_str(s)?))
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn display_pads_to_cents() {
        let price = Price::from(Decimal::from(12));
        assert_eq!(price.to_string(), "$12.00");
    }

    #[test]
    fn display_rounds_fractional_cents() {
        let price: Price = "12.346".parse().unwrap();
        assert_eq!(price.to_string(), "$12.35");
    }

    #[test]
    fn times_multiplies_by_quantity() {
        let price: Price = "2.50".parse().unwrap();
        assert_eq!(price.times(3).to_string(), "$7.50");
    }

    #[test]
    fn sum_adds_line_totals() {
        let totals = vec!["1.25".parse::<Price>().unwrap(), "2.50".parse().unwrap()];
        let subtotal: Price = totals.into_iter().sum();
        assert_eq!(subtotal.to_string(), "$3.75");
    }

    #[test]
    fn deserializes_from_numbers_and_strings() {
        let from_number: Price = serde_json::from_value(serde_json::json!(9.99)).unwrap();
        let from_string: Price = serde_json::from_value(serde_json::json!("9.99")).unwrap();
        assert_eq!(from_number, from_string);
    }

    #[test]
    fn serde_round_trip() {
        let price: Price = "42.10".parse().unwrap();
        let value = serde_json::to_value(price).unwrap();
        let back: Price = serde_json::from_value(value).unwrap();
        assert_eq!(back, price);
    }
}
