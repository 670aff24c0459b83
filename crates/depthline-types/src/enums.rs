//! Side, book state, quote action, and provenance enums

use serde::{Deserialize, Serialize};

/// Order-book side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Buy orders (bids)
    Buy,
    /// Sell orders (asks)
    Sell,
}

impl Side {
    /// Returns the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }

    /// Returns true for the bid side
    pub fn is_bids(&self) -> bool {
        matches!(self, Self::Buy)
    }
}

/// Assembly state of an order-book message
///
/// A message with no state (`None` in [`OrderBookUpdate::state`]) is a
/// self-contained snapshot candidate.
///
/// [`OrderBookUpdate::state`]: crate::OrderBookUpdate::state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookState {
    /// First frame of a multi-frame snapshot
    SnapshotStarted,
    /// Final frame of a snapshot; the book is complete
    SnapshotComplete,
    /// Partial update to be applied on top of prior state
    Increment,
}

/// Per-level action carried by exchange-native incremental frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteAction {
    /// Insert a new level
    New,
    /// Update an existing level
    Update,
    /// Remove a level
    Delete,
}

/// Quote condition flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteCondition {
    /// Non-tradable indicative quote
    Indicative,
}

/// Order-log row action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderLogAction {
    /// Order placed into the book
    Register,
    /// Order removed from the book
    Cancel,
    /// Order (partially) traded
    Match,
}

/// Data type a derived message was built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    /// Raw order-log entries
    OrderLog,
    /// Best-of-market field changes
    Level1,
    /// Full order-book depth
    MarketDepth,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_opposite() {
        assert_eq!(Side::Buy.opposite(), Side::Sell);
        assert_eq!(Side::Sell.opposite(), Side::Buy);
        assert!(Side::Buy.is_bids());
        assert!(!Side::Sell.is_bids());
    }
}
