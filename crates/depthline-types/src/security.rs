//! Instrument identifiers (SYM@VENUE format)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Instrument identifier in `SYM@VENUE` format (e.g. "AAPL@NASDAQ")
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecurityId(String);

impl SecurityId {
    /// Create a new identifier from a string
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get the symbol part (e.g. "AAPL" from "AAPL@NASDAQ")
    pub fn symbol(&self) -> Option<&str> {
        self.0.split('@').next()
    }

    /// Get the venue part (e.g. "NASDAQ" from "AAPL@NASDAQ")
    pub fn venue(&self) -> Option<&str> {
        self.0.split('@').nth(1)
    }
}

impl FromStr for SecurityId {
    type Err = SecurityIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Validate format: SYM@VENUE
        if !s.contains('@') {
            return Err(SecurityIdParseError::MissingSeparator(s.to_string()));
        }

        let parts: Vec<&str> = s.split('@').collect();
        if parts.len() != 2 {
            return Err(SecurityIdParseError::InvalidFormat(s.to_string()));
        }

        if parts[0].is_empty() || parts[1].is_empty() {
            return Err(SecurityIdParseError::EmptyPart(s.to_string()));
        }

        Ok(Self(s.to_string()))
    }
}

impl fmt::Display for SecurityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SecurityId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Error when parsing a security identifier
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SecurityIdParseError {
    /// Missing the '@' separator
    #[error("security id missing '@' separator: {0}")]
    MissingSeparator(String),
    /// More than one separator
    #[error("invalid security id format: {0}")]
    InvalidFormat(String),
    /// Symbol or venue part is empty
    #[error("security id has an empty part: {0}")]
    EmptyPart(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        let id: SecurityId = "AAPL@NASDAQ".parse().unwrap();
        assert_eq!(id.symbol(), Some("AAPL"));
        assert_eq!(id.venue(), Some("NASDAQ"));
        assert_eq!(id.to_string(), "AAPL@NASDAQ");
    }

    #[test]
    fn test_parse_invalid() {
        assert!(matches!(
            "AAPL".parse::<SecurityId>(),
            Err(SecurityIdParseError::MissingSeparator(_))
        ));
        assert!(matches!(
            "AAPL@NASDAQ@US".parse::<SecurityId>(),
            Err(SecurityIdParseError::InvalidFormat(_))
        ));
        assert!(matches!(
            "@NASDAQ".parse::<SecurityId>(),
            Err(SecurityIdParseError::EmptyPart(_))
        ));
    }
}
