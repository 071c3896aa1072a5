//! Fixed-point price representation.
//!
//! Prices are stored as 64-bit signed integers scaled by
//! [`crate::constants::PRICE_SCALE`] (four decimal places). Conversion from
//! a floating-point wire value rounds half-to-even and saturates on
//! overflow rather than panicking or wrapping.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::PRICE_SCALE;

/// A price, stored as an integer at [`PRICE_SCALE`] precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(pub i64);

impl Price {
    /// Construct a `Price` directly from its scaled integer representation.
    pub fn from_scaled(scaled: i64) -> Self {
        Self(scaled)
    }

    /// Convert a floating-point value (e.g. `12.3456`) to a `Price`.
    ///
    /// Returns `None` if the value is `NaN`, infinite, or otherwise fails to
    /// convert. Rounding is half-to-even at the fourth decimal place;
    /// conversion saturates rather than overflowing on out-of-range input.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        let scaled = value * PRICE_SCALE as f64;
        if !scaled.is_finite() {
            return None;
        }
        // `f64::round_ties_even` applies half-to-even rounding per the design note.
        let rounded = scaled.round_ties_even();
        if rounded > i64::MAX as f64 {
            return Some(Self(i64::MAX));
        }
        if rounded < i64::MIN as f64 {
            return Some(Self(i64::MIN));
        }
        Some(Self(rounded as i64))
    }

    /// Parse a JSON value that may be a number, a numeric string, `null`, or
    /// `NaN`-producing garbage, returning `None` for anything unconvertible.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => n.as_f64().and_then(Self::from_f64),
            serde_json::Value::String(s) => s.parse::<f64>().ok().and_then(Self::from_f64),
            _ => None,
        }
    }

    /// The underlying scaled integer value.
    pub fn scaled(self) -> i64 {
        self.0
    }

    /// Convert back to a floating-point value, for display or wire re-export.
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / PRICE_SCALE as f64
    }

    /// Whether this price is strictly positive.
    pub fn is_positive(self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}", self.to_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_from_f64() {
        assert_eq!(Price::from_f64(12.3456), Some(Price(123_456)));
        assert_eq!(Price::from_f64(100.12), Some(Price(1_001_200)));
        assert_eq!(Price::from_f64(100.15), Some(Price(1_001_500)));
    }

    #[test]
    fn rejects_nan_and_infinite() {
        assert_eq!(Price::from_f64(f64::NAN), None);
        assert_eq!(Price::from_f64(f64::INFINITY), None);
    }

    #[test]
    fn from_json_handles_null_and_non_numeric() {
        assert_eq!(Price::from_json(&serde_json::Value::Null), None);
        assert_eq!(
            Price::from_json(&serde_json::Value::String("abc".into())),
            None
        );
        assert_eq!(
            Price::from_json(&serde_json::json!(100.12)),
            Some(Price(1_001_200))
        );
    }

    #[test]
    fn saturates_on_overflow() {
        assert_eq!(Price::from_f64(f64::MAX), Some(Price(i64::MAX)));
        assert_eq!(Price::from_f64(-f64::MAX), Some(Price(i64::MIN)));
    }
}
