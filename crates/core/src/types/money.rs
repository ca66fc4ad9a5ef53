//! Opportunity monetary value using decimal arithmetic.

use core::fmt;
use core::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Errors that can occur when parsing a [`MonetaryValue`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MonetaryValueError {
    /// The input could not be read as a number.
    #[error("invalid monetary value: {0}")]
    Invalid(String),
    /// The value is below zero.
    #[error("monetary value cannot be negative")]
    Negative,
}

/// Non-negative monetary value of an opportunity. Defaults to zero.
///
/// Serialises as a JSON number (`1500`, `1800.5`) because that is what the
/// CRM's `monetaryValue` field accepts. Parsing tolerates Brazilian
/// formatting (`1.500,00`) as well as `1500.00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct MonetaryValue(Decimal);

impl MonetaryValue {
    /// Zero value.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a value from a decimal amount.
    ///
    /// # Errors
    ///
    /// Returns [`MonetaryValueError::Negative`] for amounts below zero.
    pub fn new(amount: Decimal) -> Result<Self, MonetaryValueError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(MonetaryValueError::Negative);
        }
        Ok(Self(amount.normalize()))
    }

    /// Create a value from a float, as found in JSON argument bags.
    ///
    /// # Errors
    ///
    /// Returns an error if the float is not finite or is negative.
    pub fn from_f64(amount: f64) -> Result<Self, MonetaryValueError> {
        let decimal = Decimal::try_from(amount)
            .map_err(|_| MonetaryValueError::Invalid(amount.to_string()))?;
        Self::new(decimal)
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Render for pt-BR display, e.g. `R$ 1500.00`.
    #[must_use]
    pub fn display_brl(&self) -> String {
        format!("R$ {:.2}", self.0)
    }
}

impl FromStr for MonetaryValue {
    type Err = MonetaryValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches("R$").trim();
        if trimmed.is_empty() {
            return Err(MonetaryValueError::Invalid(s.to_owned()));
        }
        // "1.500,00" -> "1500.00"; "1500,5" -> "1500.5"
        let normalized = if trimmed.contains(',') {
            trimmed.replace('.', "").replace(',', ".")
        } else {
            trimmed.to_owned()
        };
        let decimal = Decimal::from_str(&normalized)
            .map_err(|_| MonetaryValueError::Invalid(s.to_owned()))?;
        Self::new(decimal)
    }
}

impl fmt::Display for MonetaryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for MonetaryValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0.fract().is_zero() {
            if let Some(whole) = self.0.to_i64() {
                return serializer.serialize_i64(whole);
            }
        }
        let float = self
            .0
            .to_f64()
            .ok_or_else(|| serde::ser::Error::custom("monetary value out of range"))?;
        serializer.serialize_f64(float)
    }
}

impl<'de> Deserialize<'de> for MonetaryValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        match value {
            serde_json::Value::Null => Ok(Self::ZERO),
            serde_json::Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| serde::de::Error::custom("monetary value out of range"))
                .and_then(|f| Self::from_f64(f).map_err(serde::de::Error::custom)),
            serde_json::Value::String(s) => s.parse().map_err(serde::de::Error::custom),
            other => Err(serde::de::Error::custom(format!(
                "expected a number, found {other}"
            ))),
        }
    }
}
