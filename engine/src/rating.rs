//! Review rating on a 1-10 scale.

use crate::{error::Result, Error};
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// A validated rating, always within [`Rating::MIN`]..=[`Rating::MAX`].
///
/// Ratings come from two places: user input (an integer or the text of a
/// form field) and documents read back from the remote store. Both go
/// through the same checks, so an out-of-range value can never reach a
/// projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 10;

    /// Validate an integer rating.
    pub fn new(value: i64) -> Result<Self> {
        if value < i64::from(Self::MIN) || value > i64::from(Self::MAX) {
            return Err(Error::RatingOutOfRange(value));
        }
        // Bounds checked above.
        Ok(Self(value as u8))
    }

    /// The rating as a plain number.
    pub fn get(self) -> u8 {
        self.0
    }

    /// Coerce a stored JSON value into a rating.
    ///
    /// Accepts integers, whole floats (`7.0`) and numeric strings (`"7"`),
    /// which older clients wrote.
    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::new(i)
                } else if let Some(f) = n.as_f64().filter(|f| f.fract() == 0.0) {
                    if f.abs() > i64::MAX as f64 {
                        Err(Error::RatingOutOfRange(if f > 0.0 { i64::MAX } else { i64::MIN }))
                    } else {
                        Self::new(f as i64)
                    }
                } else {
                    Err(Error::RatingNotNumeric(n.to_string()))
                }
            }
            Value::String(s) => s.parse(),
            other => Err(Error::RatingNotNumeric(other.to_string())),
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Rating {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let value: i64 = trimmed
            .parse()
            .map_err(|_| Error::RatingNotNumeric(s.to_string()))?;
        Self::new(value)
    }
}

impl TryFrom<i64> for Rating {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        Self::new(value)
    }
}

impl TryFrom<i32> for Rating {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self> {
        Self::new(i64::from(value))
    }
}

impl TryFrom<u8> for Rating {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        Self::new(i64::from(value))
    }
}

impl TryFrom<&str> for Rating {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        value.parse()
    }
}

impl TryFrom<String> for Rating {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl<'de> Deserialize<'de> for Rating {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Rating::from_json(&value).map_err(de::Error::custom)
    }
}
