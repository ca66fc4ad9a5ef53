//! Phone number normalisation.
//!
//! Callers type phone numbers in every shape (`(11) 99999-9999`,
//! `+55 11 99999 9999`, `11999999999`). The CRM wants E.164, so numbers are
//! reduced to digits and a country code is inferred from the digit count.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Brazilian area codes (DDD) recognised by the country-code heuristic.
const BRAZILIAN_AREA_CODES: &[&str] = &[
    "11", "12", "13", "14", "15", "16", "17", "18", "19", "21", "22", "24", "27", "28",
];

/// Minimum digit count for a token to be treated as a phone number.
pub const MIN_PHONE_DIGITS: usize = 8;

/// Characters stripped from raw input before validation.
const SEPARATORS: &[char] = &['+', '-', ' ', '(', ')', '.'];

/// Errors that can occur when parsing a [`PhoneNumber`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    /// No digits remained after stripping separators.
    #[error("phone number cannot be empty")]
    Empty,
    /// A character other than a digit or separator was found.
    #[error("phone number contains invalid character '{0}'")]
    InvalidCharacter(char),
}

/// A phone number held as bare digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Parse a phone number, discarding `+`, `-`, spaces, dots and parentheses.
    ///
    /// # Errors
    ///
    /// Returns an error if nothing but separators was supplied or a
    /// non-digit character remains.
    pub fn parse(raw: &str) -> Result<Self, PhoneError> {
        let digits: String = raw.chars().filter(|c| !SEPARATORS.contains(c)).collect();
        if let Some(bad) = digits.chars().find(|c| !c.is_ascii_digit()) {
            return Err(PhoneError::InvalidCharacter(bad));
        }
        if digits.is_empty() {
            return Err(PhoneError::Empty);
        }
        Ok(Self(digits))
    }

    /// Whether a free-text token looks like a phone number (at least
    /// [`MIN_PHONE_DIGITS`] digits once separators are removed).
    #[must_use]
    pub fn looks_like(token: &str) -> bool {
        Self::parse(token).is_ok_and(|p| p.0.len() >= MIN_PHONE_DIGITS)
    }

    /// The bare digits.
    #[must_use]
    pub fn digits(&self) -> &str {
        &self.0
    }

    /// Infer a country code from the digit count.
    ///
    /// - 11 digits starting with a recognised Brazilian area code: `+55`
    /// - 10 digits: `+1`
    /// - anything else: `None`
    #[must_use]
    pub fn with_inferred_country_code(&self) -> Option<String> {
        let digits = self.0.as_str();
        if digits.len() == 11
            && BRAZILIAN_AREA_CODES
                .iter()
                .any(|code| digits.starts_with(code))
        {
            return Some(format!("+55{digits}"));
        }
        if digits.len() == 10 {
            return Some(format!("+1{digits}"));
        }
        None
    }

    /// E.164 rendering: inferred country code, or the digits prefixed with `+`.
    #[must_use]
    pub fn to_e164(&self) -> String {
        self.with_inferred_country_code()
            .unwrap_or_else(|| format!("+{}", self.0))
    }

    /// Returns a copy whose trailing digits are rewritten with `suffix`.
    ///
    /// The last three digits are replaced by the last three digits of
    /// `suffix`; numbers shorter than [`MIN_PHONE_DIGITS`] get them appended.
    #[must_use]
    pub fn with_trailing_digits(&self, suffix: u32) -> Self {
        let suffix = format!("{suffix:03}");
        let tail = suffix.get(suffix.len() - 3..).unwrap_or_default();
        let head = if self.0.len() >= MIN_PHONE_DIGITS {
            self.0.get(..self.0.len() - 3).unwrap_or_default()
        } else {
            &self.0
        };
        Self(format!("{head}{tail}"))
    }

    /// E.164 rendering for a synthesised number: the inferred country code
    /// when one applies, otherwise a `+1555` number built from the last
    /// seven digits.
    #[must_use]
    pub fn to_synthetic_e164(&self) -> String {
        self.with_inferred_country_code().unwrap_or_else(|| {
            let start = self.0.len().saturating_sub(7);
            format!("+1555{}", self.0.get(start..).unwrap_or_default())
        })
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
