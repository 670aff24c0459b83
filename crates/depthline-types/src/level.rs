//! Order-book price levels with decimal precision

use crate::enums::{QuoteAction, QuoteCondition};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single order-book price level
///
/// A level with zero volume is a removal marker, never a tradable level.
/// `inner_quotes` is populated only by grouping and holds the original
/// levels a bucket absorbed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteChange {
    /// Price of this level
    pub price: Decimal,
    /// Volume at this price level (zero marks a removed level)
    pub volume: Decimal,
    /// Number of resting orders at this level, when the venue reports it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orders_count: Option<u64>,
    /// Exchange-native incremental action
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<QuoteAction>,
    /// Quote condition flag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<QuoteCondition>,
    /// Start position for exchange-native paging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_position: Option<usize>,
    /// End position for exchange-native paging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_position: Option<usize>,
    /// Original levels absorbed by a grouped bucket
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inner_quotes: Option<Vec<QuoteChange>>,
}

impl QuoteChange {
    /// Create a plain price level
    pub fn new(price: Decimal, volume: Decimal) -> Self {
        Self {
            price,
            volume,
            orders_count: None,
            action: None,
            condition: None,
            start_position: None,
            end_position: None,
            inner_quotes: None,
        }
    }

    /// Create a zero-volume placeholder at a price (removal marker or
    /// sparse "no liquidity" marker)
    pub fn placeholder(price: Decimal) -> Self {
        Self::new(price, Decimal::ZERO)
    }

    /// Set the resting order count
    pub fn with_orders_count(mut self, count: u64) -> Self {
        self.orders_count = Some(count);
        self
    }

    /// Set the incremental action
    pub fn with_action(mut self, action: QuoteAction) -> Self {
        self.action = Some(action);
        self
    }

    /// Set the start position for positioned updates
    pub fn with_start_position(mut self, position: usize) -> Self {
        self.start_position = Some(position);
        self
    }

    /// Check if this level carries zero volume (removal marker)
    pub fn is_zero(&self) -> bool {
        self.volume.is_zero()
    }

    /// True when price and volume are both strictly positive
    pub fn is_real(&self) -> bool {
        self.price > Decimal::ZERO && self.volume > Decimal::ZERO
    }

    /// True when the non-structural fields (everything a delta compares)
    /// match the other level
    pub fn same_as(&self, other: &QuoteChange) -> bool {
        self.volume == other.volume
            && self.orders_count == other.orders_count
            && self.action == other.action
            && self.condition == other.condition
            && self.start_position == other.start_position
            && self.end_position == other.end_position
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_is_zero() {
        assert!(QuoteChange::placeholder(dec!(100)).is_zero());
        assert!(!QuoteChange::new(dec!(100), dec!(1)).is_zero());
    }

    #[test]
    fn test_is_real() {
        assert!(QuoteChange::new(dec!(100), dec!(1)).is_real());
        assert!(!QuoteChange::placeholder(dec!(100)).is_real());
        assert!(!QuoteChange::new(dec!(0), dec!(1)).is_real());
    }

    #[test]
    fn test_same_as_ignores_price() {
        let a = QuoteChange::new(dec!(100), dec!(1));
        let b = QuoteChange::new(dec!(101), dec!(1));
        assert!(a.same_as(&b));

        let c = QuoteChange::new(dec!(100), dec!(2));
        assert!(!a.same_as(&c));

        let d = QuoteChange::new(dec!(100), dec!(1)).with_orders_count(3);
        assert!(!a.same_as(&d));
    }
}
