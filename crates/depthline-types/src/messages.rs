//! Depth, tick, and order-log message types

use crate::enums::{BookState, DataKind, OrderLogAction, Side};
use crate::level::QuoteChange;
use crate::security::SecurityId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An order-book snapshot or diff
///
/// Bids are ordered descending by price, asks ascending, prices unique per
/// side. `state == None` marks a self-contained snapshot candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBookUpdate {
    /// Instrument identifier
    pub security_id: SecurityId,
    /// Venue timestamp
    pub server_time: DateTime<Utc>,
    /// Local receive timestamp
    pub local_time: DateTime<Utc>,
    /// Bid levels, descending by price
    pub bids: Vec<QuoteChange>,
    /// Ask levels, ascending by price
    pub asks: Vec<QuoteChange>,
    /// Assembly state; `None` means self-contained snapshot candidate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<BookState>,
    /// Data type this book was derived from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_from: Option<DataKind>,
}

impl OrderBookUpdate {
    /// Create an empty self-contained book
    pub fn new(security_id: SecurityId, server_time: DateTime<Utc>) -> Self {
        Self {
            security_id,
            server_time,
            local_time: server_time,
            bids: Vec::new(),
            asks: Vec::new(),
            state: None,
            build_from: None,
        }
    }

    /// Set the bid levels
    pub fn with_bids(mut self, bids: Vec<QuoteChange>) -> Self {
        self.bids = bids;
        self
    }

    /// Set the ask levels
    pub fn with_asks(mut self, asks: Vec<QuoteChange>) -> Self {
        self.asks = asks;
        self
    }

    /// Set the assembly state
    pub fn with_state(mut self, state: BookState) -> Self {
        self.state = Some(state);
        self
    }

    /// Set the local receive timestamp
    pub fn with_local_time(mut self, local_time: DateTime<Utc>) -> Self {
        self.local_time = local_time;
        self
    }

    /// Set the build-from provenance
    pub fn with_build_from(mut self, kind: DataKind) -> Self {
        self.build_from = Some(kind);
        self
    }

    /// Levels of one side, in that side's order
    pub fn side(&self, side: Side) -> &[QuoteChange] {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    /// Get the best bid
    pub fn best_bid(&self) -> Option<&QuoteChange> {
        self.bids.first()
    }

    /// Get the best ask
    pub fn best_ask(&self) -> Option<&QuoteChange> {
        self.asks.first()
    }

    /// Get the spread (ask - bid)
    pub fn spread(&self) -> Option<Decimal> {
        match (self.best_ask(), self.best_bid()) {
            (Some(ask), Some(bid)) => Some(ask.price - bid.price),
            _ => None,
        }
    }

    /// Get the mid price ((ask + bid) / 2)
    pub fn mid_price(&self) -> Option<Decimal> {
        match (self.best_ask(), self.best_bid()) {
            (Some(ask), Some(bid)) => Some((ask.price + bid.price) / Decimal::TWO),
            _ => None,
        }
    }

    /// True when the book is usable as-is: a self-contained candidate or a
    /// completed snapshot, not a partial frame
    pub fn is_final(&self) -> bool {
        matches!(self.state, None | Some(BookState::SnapshotComplete))
    }
}

/// A single trade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    /// Instrument identifier
    pub security_id: SecurityId,
    /// Venue timestamp
    pub server_time: DateTime<Utc>,
    /// Local receive timestamp
    pub local_time: DateTime<Utc>,
    /// Numeric trade id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trade_id: Option<i64>,
    /// String trade id (venues without numeric ids)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trade_string_id: Option<String>,
    /// Trade price
    pub price: Decimal,
    /// Trade volume
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<Decimal>,
    /// Aggressor side
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_side: Option<Side>,
    /// Up-tick flag relative to the previous trade
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_up_tick: Option<bool>,
    /// Open interest after the trade
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_interest: Option<Decimal>,
    /// Data type this tick was derived from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_from: Option<DataKind>,
}

/// A raw order-log row (register / cancel / match)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLogEntry {
    /// Instrument identifier
    pub security_id: SecurityId,
    /// Venue timestamp
    pub server_time: DateTime<Utc>,
    /// Local receive timestamp
    pub local_time: DateTime<Utc>,
    /// Venue order id
    pub order_id: i64,
    /// Order price
    pub price: Decimal,
    /// Order (remaining) volume
    pub volume: Decimal,
    /// Order side
    pub side: Side,
    /// Row action
    pub action: OrderLogAction,
    /// Trade id for match rows
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trade_id: Option<i64>,
    /// String trade id for match rows
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trade_string_id: Option<String>,
    /// Trade price for match rows
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trade_price: Option<Decimal>,
    /// Open interest after the event
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_interest: Option<Decimal>,
    /// System (non-auction) session flag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_system: Option<bool>,
}

impl OrderLogEntry {
    /// True when this row reports a trade
    pub fn is_trade(&self) -> bool {
        self.trade_id.is_some() || self.trade_string_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn book() -> OrderBookUpdate {
        OrderBookUpdate::new(SecurityId::new("AAPL@NASDAQ"), Utc::now())
            .with_bids(vec![QuoteChange::new(dec!(100), dec!(1))])
            .with_asks(vec![QuoteChange::new(dec!(102), dec!(2))])
    }

    #[test]
    fn test_spread_and_mid() {
        let book = book();
        assert_eq!(book.spread(), Some(dec!(2)));
        assert_eq!(book.mid_price(), Some(dec!(101)));
    }

    #[test]
    fn test_is_final() {
        let book = book();
        assert!(book.is_final());
        assert!(book.clone().with_state(BookState::SnapshotComplete).is_final());
        assert!(!book.clone().with_state(BookState::Increment).is_final());
        assert!(!book.with_state(BookState::SnapshotStarted).is_final());
    }
}
