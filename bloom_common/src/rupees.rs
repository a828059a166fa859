use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Mul, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const RUPEE_CURRENCY_CODE: &str = "INR";
pub const RUPEE_CURRENCY_CODE_LOWER: &str = "inr";

//--------------------------------------      Rupees       -----------------------------------------------------------
/// A monetary amount in Indian paise (1/100th of a rupee). All pricing arithmetic in the pipeline happens in integer
/// paise so that totals are exact and reproducible.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Rupees(i64);

op!(binary Rupees, Add, add);
op!(binary Rupees, Sub, sub);
op!(inplace Rupees, SubAssign, sub_assign);
op!(unary Rupees, Neg, neg);

impl Mul<i64> for Rupees {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Rupees {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in paise: {0}")]
pub struct RupeesConversionError(String);

impl From<i64> for Rupees {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Rupees {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Rupees {}

impl TryFrom<u64> for Rupees {
    type Error = RupeesConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(RupeesConversionError(format!("Value {} is too large to convert to Rupees", value)))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for Rupees {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let whole = self.0 / 100;
        let paise = (self.0 % 100).abs();
        write!(f, "₹{whole}.{paise:02}")
    }
}

impl Rupees {
    /// The amount in paise.
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_rupees(rupees: i64) -> Self {
        Self(rupees * 100)
    }

    /// `p` percent of this amount, truncated to whole paise.
    pub fn percent(&self, p: i64) -> Self {
        Self(self.0 * p / 100)
    }

    /// Subtraction that never goes below zero. Used wherever a discount is taken off a subtotal.
    pub fn saturating_sub(&self, rhs: Rupees) -> Self {
        Self((self.0 - rhs.0).max(0))
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display_formats_paise() {
        assert_eq!(Rupees::from_rupees(2250).to_string(), "₹2250.00");
        assert_eq!(Rupees::from(12_345).to_string(), "₹123.45");
        assert_eq!(Rupees::from(5).to_string(), "₹0.05");
    }

    #[test]
    fn saturating_sub_floors_at_zero() {
        let subtotal = Rupees::from_rupees(300);
        let discount = Rupees::from_rupees(500);
        assert_eq!(subtotal.saturating_sub(discount), Rupees::from(0));
        assert_eq!(discount.saturating_sub(subtotal), Rupees::from_rupees(200));
    }

    #[test]
    fn percent_is_integer_paise() {
        assert_eq!(Rupees::from_rupees(2300).percent(10), Rupees::from_rupees(230));
        assert_eq!(Rupees::from(333).percent(10), Rupees::from(33));
    }
}
