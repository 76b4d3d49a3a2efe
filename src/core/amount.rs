//! Money as a fixed-point decimal.
//!
//! Balances and ledger amounts are stored as integer minor units (hundredths) so that
//! replaying the ledger reproduces balances exactly.

use crate::errors::Error;
use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Fixed-point decimal with 2 decimal places, stored as a scaled integer.
///
/// Deserializes from a decimal string (`"12.50"`) or a whole number (`12`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash, Deserialize)]
#[serde(try_from = "AmountRepr")]
pub struct Amount(i64);

#[derive(Deserialize)]
#[serde(untagged)]
enum AmountRepr {
    Whole(i64),
    Text(String),
}

impl TryFrom<AmountRepr> for Amount {
    type Error = Error;

    fn try_from(value: AmountRepr) -> Result<Self, Self::Error> {
        match value {
            AmountRepr::Whole(units) => units
                .checked_mul(Self::SCALE)
                .map(Self)
                .ok_or_else(|| Error::InvalidAmount {
                    amount: units.to_string(),
                }),
            AmountRepr::Text(text) => text.parse(),
        }
    }
}

const HALF_AWAY: RoundingStrategy = RoundingStrategy::MidpointAwayFromZero;

impl Amount {
    const SCALE: i64 = 100;

    /// Zero.
    pub const ZERO: Self = Self(0);

    /// Wraps a value already expressed in minor units.
    #[must_use]
    pub const fn from_minor(value: i64) -> Self {
        Self(value)
    }

    /// Builds an amount from whole currency units.
    #[must_use]
    pub const fn from_units(value: i64) -> Self {
        Self(value * Self::SCALE)
    }

    /// The raw minor-unit value, as persisted.
    #[must_use]
    pub const fn minor(self) -> i64 {
        self.0
    }

    /// Strictly greater than zero.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Strictly less than zero.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Subtraction that refuses to cross below zero.
    #[must_use]
    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0
            .checked_sub(rhs.0)
            .filter(|value| *value >= 0)
            .map(Self)
    }

    /// `percent`% of this amount, rounded half away from zero to the nearest minor unit.
    ///
    /// The percentage is taken at its shortest decimal spelling (`2.3`, not the binary
    /// approximation of it), and the product is computed exactly.
    pub fn percent_of(self, percent: f64) -> Result<Self, Error> {
        let invalid = || Error::InvalidAmount {
            amount: format!("{self} * {percent}%"),
        };
        let rate = Decimal::from_str_exact(&percent.to_string()).map_err(|_| invalid())?;
        Decimal::from(self.0)
            .checked_mul(rate)
            .and_then(|value| value.checked_div(Decimal::ONE_HUNDRED))
            .map(|cents| cents.round_dp_with_strategy(0, HALF_AWAY))
            .and_then(|value| value.to_i64())
            .map(Self)
            .ok_or_else(invalid)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        let whole = abs / Self::SCALE;
        let frac = abs % Self::SCALE;
        write!(f, "{sign}{whole}.{frac:02}")
    }
}

impl FromStr for Amount {
    type Err = Error;

    /// Parses `"150"`, `"150.5"` or `"150.25"`. More than two fractional digits is an error
    /// rather than a silent rounding.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidAmount {
            amount: s.to_string(),
        };
        let trimmed = s.trim();
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let (whole, frac) = digits.split_once('.').unwrap_or((digits, ""));

        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if frac.len() > 2 || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let whole: i64 = whole.parse().map_err(|_| invalid())?;
        let mut frac_value: i64 = if frac.is_empty() {
            0
        } else {
            frac.parse().map_err(|_| invalid())?
        };
        if frac.len() == 1 {
            frac_value *= 10;
        }

        let value = whole
            .checked_mul(Self::SCALE)
            .and_then(|v| v.checked_add(frac_value))
            .ok_or_else(invalid)?;
        Ok(Self(if negative { -value } else { value }))
    }
}

impl std::ops::Add for Amount {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl std::ops::AddAssign for Amount {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl std::ops::Sub for Amount {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl std::ops::SubAssign for Amount {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl std::iter::Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, amount| acc + amount)
    }
}
