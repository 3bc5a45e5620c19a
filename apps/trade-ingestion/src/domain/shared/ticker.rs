//! Ticker value object for instrument identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::shared::DomainError;

/// An exchange instrument symbol as it appears in the dump, e.g. "PETR4"
/// or "WINQ25".
///
/// Kept verbatim: exchange tickers are case-sensitive in the dumps and
/// queries must match what was stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ticker(String);

impl Ticker {
    /// Create a ticker, rejecting empty or blank values.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidValue`] when the value is empty after
    /// trimming surrounding whitespace.
    pub fn parse(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(DomainError::InvalidValue {
                field: "ticker".to_string(),
                message: "Ticker cannot be empty".to_string(),
            });
        }
        if trimmed.len() == value.len() {
            Ok(Self(value))
        } else {
            Ok(Self(trimmed.to_string()))
        }
    }

    /// Get the ticker string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume and return the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Ticker {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Ticker {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Ticker> for String {
    fn from(ticker: Ticker) -> Self {
        ticker.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticker_keeps_case() {
        let ticker = Ticker::parse("winQ25").unwrap();
        assert_eq!(ticker.as_str(), "winQ25");
    }

    #[test]
    fn ticker_trims_whitespace() {
        let ticker = Ticker::parse("  PETR4 ").unwrap();
        assert_eq!(ticker.as_str(), "PETR4");
    }

    #[test]
    fn ticker_rejects_blank() {
        assert!(Ticker::parse("").is_err());
        assert!(Ticker::parse("   ").is_err());
    }

    #[test]
    fn ticker_serde_roundtrip() {
        let ticker = Ticker::parse("AAPL").unwrap();
        let json = serde_json::to_string(&ticker).unwrap();
        assert_eq!(json, "\"AAPL\"");

        let back: Ticker = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ticker);
        assert!(serde_json::from_str::<Ticker>("\"\"").is_err());
    }

    #[test]
    fn ticker_display() {
        assert_eq!(Ticker::parse("VALE3").unwrap().to_string(), "VALE3");
    }
}
