//! # Money Amounts
//!
//! [`Amount`] is a non-negative, exact, two-decimal quantity stored as
//! minor units (cents, paise, fils). Settlement arithmetic never touches
//! floating point.
//!
//! Forms and scripts hand the core either a number or a string. Both
//! arrive as [`AmountInput`] and are coerced by [`AmountInput::parse`],
//! which rejects, never zeroes:
//!
//! - negative values,
//! - NaN and infinities,
//! - non-numeric text,
//! - more than two decimal places,
//! - values beyond the exactly representable range.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Number of minor units in one major unit.
pub const MINOR_PER_MAJOR: u64 = 100;

/// Largest float accepted at the input boundary (2^53 minor units).
const MAX_EXACT_MINOR: f64 = 9_007_199_254_740_992.0;

/// A non-negative monetary amount with two decimal places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Amount(u64);

impl Amount {
    /// Zero.
    pub const ZERO: Amount = Amount(0);

    /// From minor units (e.g. cents).
    pub fn from_minor(minor: u64) -> Self {
        Self(minor)
    }

    /// From whole major units.
    pub fn from_major(major: u64) -> Option<Self> {
        major.checked_mul(MINOR_PER_MAJOR).map(Self)
    }

    /// Minor units.
    pub fn minor(&self) -> u64 {
        self.0
    }

    /// Whether the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checked addition.
    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    /// Parse a decimal string such as `"500"`, `"500.5"` or `"500.50"`.
    ///
    /// # Errors
    ///
    /// [`ValidationError::InvalidAmount`] on any input outside the accepted
    /// grammar `digits [ "." 1*2digits ]`.
    pub fn parse_decimal(field: &'static str, raw: &str) -> Result<Self, ValidationError> {
        let s = raw.trim();
        let reject = |reason: &str| ValidationError::InvalidAmount {
            field,
            reason: format!("{reason}: {raw:?}"),
        };

        if s.is_empty() {
            return Err(reject("empty value"));
        }
        if s.starts_with('-') {
            return Err(reject("negative value"));
        }

        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(reject("not a number"));
        }
        if !frac.bytes().all(|b| b.is_ascii_digit()) || (s.contains('.') && frac.is_empty()) {
            return Err(reject("not a number"));
        }
        if frac.len() > 2 {
            return Err(reject("more than two decimal places"));
        }

        let major: u64 = whole.parse().map_err(|_| reject("out of range"))?;
        let minor_part: u64 = match frac.len() {
            0 => 0,
            1 => u64::from(frac.as_bytes()[0] - b'0') * 10,
            _ => frac.parse().map_err(|_| reject("not a number"))?,
        };
        major
            .checked_mul(MINOR_PER_MAJOR)
            .and_then(|m| m.checked_add(minor_part))
            .map(Amount)
            .ok_or_else(|| reject("out of range"))
    }

    /// Coerce a float, rejecting anything that is not an exact,
    /// non-negative two-decimal value.
    ///
    /// # Errors
    ///
    /// [`ValidationError::InvalidAmount`] for NaN, infinities, negatives,
    /// excess precision, or magnitudes past 2^53 minor units.
    pub fn from_f64(field: &'static str, value: f64) -> Result<Self, ValidationError> {
        let reject = |reason: &str| ValidationError::InvalidAmount {
            field,
            reason: format!("{reason}: {value}"),
        };

        if value.is_nan() {
            return Err(reject("not a number"));
        }
        if value.is_infinite() {
            return Err(reject("infinite value"));
        }
        if value < 0.0 {
            return Err(reject("negative value"));
        }
        let scaled = value * MINOR_PER_MAJOR as f64;
        if scaled > MAX_EXACT_MINOR {
            return Err(reject("out of range"));
        }
        let rounded = scaled.round();
        if (scaled - rounded).abs() > 1e-6 {
            return Err(reject("more than two decimal places"));
        }
        // `rounded` is finite, non-negative and at most 2^53 here.
        Ok(Amount(rounded as u64))
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{:02}",
            self.0 / MINOR_PER_MAJOR,
            self.0 % MINOR_PER_MAJOR
        )
    }
}

impl TryFrom<String> for Amount {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse_decimal("amount", &value)
    }
}

impl From<Amount> for String {
    fn from(a: Amount) -> Self {
        a.to_string()
    }
}

/// Raw amount as typed into a form or script: a number or a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    /// A numeric literal.
    Number(f64),
    /// A textual literal, parsed as a decimal.
    Text(String),
}

impl AmountInput {
    /// Coerce to an [`Amount`], naming `field` in any rejection.
    pub fn parse(&self, field: &'static str) -> Result<Amount, ValidationError> {
        match self {
            Self::Number(n) => Amount::from_f64(field, *n),
            Self::Text(s) => Amount::parse_decimal(field, s),
        }
    }
}

impl From<f64> for AmountInput {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<u32> for AmountInput {
    fn from(n: u32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<&str> for AmountInput {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Display output always parses back to the same amount.
        #[test]
        fn display_parses_back(minor in 0u64..1_000_000_000_000) {
            let a = Amount::from_minor(minor);
            prop_assert_eq!(Amount::parse_decimal("x", &a.to_string()).unwrap(), a);
        }

        /// Negative floats are always rejected.
        #[test]
        fn negative_floats_rejected(v in -1.0e12f64..-0.001) {
            prop_assert!(Amount::from_f64("x", v).is_err());
        }

        /// Whole-number floats map to exact minor units.
        #[test]
        fn whole_floats_exact(major in 0u32..10_000_000) {
            let a = Amount::from_f64("x", f64::from(major)).unwrap();
            prop_assert_eq!(a.minor(), u64::from(major) * 100);
        }
    }
}
