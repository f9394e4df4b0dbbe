//! Phone number normalization and formatting.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// A normalized North American phone number: exactly ten ASCII digits.
///
/// Construction goes through [`PhoneNumber::parse`], which strips formatting
/// characters first, so `(404) 509-3823` and `4045093823` compare equal.
/// Deserialization applies the same validation, which means a persisted
/// snapshot holding a malformed identifier fails to decode as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PhoneNumber(String);

/// Why an input string is not a usable phone number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PhoneParseError {
    /// The input contained no digits at all.
    #[error("input contains no digits")]
    NoDigits,

    /// The input had digits, but not exactly ten of them.
    #[error("expected exactly 10 digits, found {0}")]
    WrongLength(usize),
}

impl PhoneNumber {
    /// Parse a number from free-form input, ignoring punctuation and spaces.
    pub fn parse(input: &str) -> Result<Self, PhoneParseError> {
        let digits: String = input.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            return Err(PhoneParseError::NoDigits);
        }
        if digits.len() != 10 {
            return Err(PhoneParseError::WrongLength(digits.len()));
        }
        Ok(Self(digits))
    }

    /// The raw ten digits.
    pub fn digits(&self) -> &str {
        &self.0
    }

    /// Human-readable `(XXX) XXX-XXXX` form, used in tables and CSV export.
    pub fn formatted(&self) -> String {
        format!("({}) {}-{}", &self.0[..3], &self.0[3..6], &self.0[6..])
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for PhoneNumber {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        PhoneNumber::parse(&raw).map_err(serde::de::Error::custom)
    }
}
