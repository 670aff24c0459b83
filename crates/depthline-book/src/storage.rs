//! BTreeMap-based price-ladder storage
//!
//! Provides O(log N) level operations for the incremental builder.
//! Uses `Reverse<Decimal>` for bids to maintain descending order.

use depthline_types::{QuoteChange, Side};
use rust_decimal::Decimal;
use std::cmp::Reverse;
use std::collections::BTreeMap;

/// Price-ladder storage holding one instrument's depth
///
/// - Bids: stored with `Reverse<Decimal>` key for descending order (highest first)
/// - Asks: stored with `Decimal` key for ascending order (lowest first)
#[derive(Debug, Clone, Default)]
pub struct Ladder {
    /// Bids: highest price first
    bids: BTreeMap<Reverse<Decimal>, QuoteChange>,
    /// Asks: lowest price first
    asks: BTreeMap<Decimal, QuoteChange>,
}

impl Ladder {
    /// Create a new empty ladder
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a level; zero volume removes it
    pub fn insert(&mut self, side: Side, level: QuoteChange) {
        if level.volume.is_zero() {
            self.remove(side, level.price);
            return;
        }

        // Structural fields never survive into authoritative state
        let stored = QuoteChange {
            action: None,
            start_position: None,
            end_position: None,
            inner_quotes: None,
            ..level
        };

        match side {
            Side::Buy => {
                self.bids.insert(Reverse(stored.price), stored);
            }
            Side::Sell => {
                self.asks.insert(stored.price, stored);
            }
        }
    }

    /// Remove a level by price
    pub fn remove(&mut self, side: Side, price: Decimal) -> Option<QuoteChange> {
        match side {
            Side::Buy => self.bids.remove(&Reverse(price)),
            Side::Sell => self.asks.remove(&price),
        }
    }

    /// Get a level by price
    pub fn get(&self, side: Side, price: Decimal) -> Option<&QuoteChange> {
        match side {
            Side::Buy => self.bids.get(&Reverse(price)),
            Side::Sell => self.asks.get(&price),
        }
    }

    /// Add order volume at a price, tracking the resting-order count
    pub fn add_volume(&mut self, side: Side, price: Decimal, volume: Decimal) {
        match self.get(side, price).cloned() {
            Some(mut level) => {
                level.volume += volume;
                level.orders_count = Some(level.orders_count.unwrap_or(0) + 1);
                self.insert(side, level);
            }
            None => {
                self.insert(side, QuoteChange::new(price, volume).with_orders_count(1));
            }
        }
    }

    /// Subtract order volume at a price; the level disappears at zero.
    /// Decrements the order count when the order itself leaves the book.
    pub fn sub_volume(&mut self, side: Side, price: Decimal, volume: Decimal, order_gone: bool) {
        if let Some(mut level) = self.get(side, price).cloned() {
            level.volume -= volume;
            if order_gone {
                level.orders_count = level.orders_count.map(|c| c.saturating_sub(1));
            }
            if level.volume <= Decimal::ZERO {
                self.remove(side, price);
            } else {
                self.insert(side, level);
            }
        }
    }

    /// Number of levels on a side
    pub fn len(&self, side: Side) -> usize {
        match side {
            Side::Buy => self.bids.len(),
            Side::Sell => self.asks.len(),
        }
    }

    /// Bids as a vector, highest price first
    pub fn bids_vec(&self) -> Vec<QuoteChange> {
        self.bids.values().cloned().collect()
    }

    /// Asks as a vector, lowest price first
    pub fn asks_vec(&self) -> Vec<QuoteChange> {
        self.asks.values().cloned().collect()
    }
}
