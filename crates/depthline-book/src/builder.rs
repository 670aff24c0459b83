//! Incremental depth assembly
//!
//! A [`DepthBuilder`] folds partial order-book frames (and raw order-log
//! rows) into a complete per-instrument book. The default
//! [`IncrementBuilder`] keeps a [`Ladder`] plus an order-id index and
//! covers the common exchange feed shapes; venues with exotic framing can
//! plug in their own implementation.

use crate::storage::Ladder;
use chrono::{DateTime, Utc};
use depthline_types::{
    BookState, DataKind, FeedError, FeedResult, OrderBookUpdate, OrderLogAction, OrderLogEntry,
    QuoteAction, QuoteChange, SecurityId, Side,
};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Assembles incremental frames into complete books for one instrument
pub trait DepthBuilder: Send {
    /// Create a builder for one instrument
    fn new(security_id: SecurityId) -> Self
    where
        Self: Sized;

    /// The instrument this builder assembles
    fn security_id(&self) -> &SecurityId;

    /// Fold one book frame into the assembled state
    ///
    /// Returns `Ok(Some(book))` when the frame completes a usable book
    /// (a full rebuilt snapshot marked `SnapshotComplete`), `Ok(None)`
    /// when more frames are needed, and an error when the frame is
    /// inconsistent with the current state.
    fn try_apply(&mut self, book: &OrderBookUpdate) -> FeedResult<Option<OrderBookUpdate>>;

    /// Materialize the current assembled state as of a timestamp
    fn snapshot(&self, as_of: DateTime<Utc>) -> OrderBookUpdate;

    /// Fold one order-log row into the assembled state
    ///
    /// Returns `Ok(Some(book))` when the row changed the book.
    fn update(&mut self, entry: &OrderLogEntry) -> FeedResult<Option<OrderBookUpdate>>;
}

/// Default [`DepthBuilder`] over a [`Ladder`]
///
/// Handles the four frame states (self-contained, snapshot started /
/// complete, increment) and the register/cancel/match order-log actions.
/// Increments arriving before any snapshot are buffered away as no-ops
/// until a snapshot seeds the book.
#[derive(Debug)]
pub struct IncrementBuilder {
    security_id: SecurityId,
    ladder: Ladder,
    /// Live orders by venue id: side, price, remaining volume
    orders: HashMap<i64, (Side, Decimal, Decimal)>,
    has_snapshot: bool,
    /// A multi-frame snapshot is in flight (between started and complete)
    assembling: bool,
}

impl IncrementBuilder {
    /// Apply a whole frame onto a scratch copy of the current state
    ///
    /// The live ladder is replaced only when every level is accepted, so
    /// a rejected frame never leaves partially applied levels behind.
    fn applied(&self, book: &OrderBookUpdate, fresh: bool) -> FeedResult<Ladder> {
        let mut ladder = if fresh {
            Ladder::new()
        } else {
            self.ladder.clone()
        };
        Self::apply_side(&mut ladder, &book.bids, Side::Buy)?;
        Self::apply_side(&mut ladder, &book.asks, Side::Sell)?;
        Ok(ladder)
    }

    fn apply_side(ladder: &mut Ladder, levels: &[QuoteChange], side: Side) -> FeedResult<()> {
        let mut seen: Vec<Decimal> = Vec::with_capacity(levels.len());

        for level in levels {
            if seen.contains(&level.price) {
                return Err(FeedError::DuplicatePrice {
                    side,
                    price: level.price,
                });
            }
            seen.push(level.price);

            if let Some(position) = level.start_position {
                let len = ladder.len(side);
                if position > len {
                    return Err(FeedError::InvalidPosition { position, len });
                }
            }

            if level.action == Some(QuoteAction::Delete) || level.volume.is_zero() {
                ladder.remove(side, level.price);
            } else {
                ladder.insert(side, level.clone());
            }
        }

        Ok(())
    }

    fn materialize(&self, as_of: DateTime<Utc>, build_from: Option<DataKind>) -> OrderBookUpdate {
        OrderBookUpdate {
            security_id: self.security_id.clone(),
            server_time: as_of,
            local_time: as_of,
            bids: self.ladder.bids_vec(),
            asks: self.ladder.asks_vec(),
            state: Some(BookState::SnapshotComplete),
            build_from,
        }
    }
}

impl DepthBuilder for IncrementBuilder {
    fn new(security_id: SecurityId) -> Self {
        Self {
            security_id,
            ladder: Ladder::new(),
            orders: HashMap::new(),
            has_snapshot: false,
            assembling: false,
        }
    }

    fn security_id(&self) -> &SecurityId {
        &self.security_id
    }

    fn try_apply(&mut self, book: &OrderBookUpdate) -> FeedResult<Option<OrderBookUpdate>> {
        match book.state {
            None => {
                self.ladder = self.applied(book, true)?;
                self.assembling = false;
                self.has_snapshot = true;
                Ok(Some(self.materialize(book.server_time, book.build_from)))
            }
            Some(BookState::SnapshotStarted) => {
                self.ladder = self.applied(book, true)?;
                self.assembling = true;
                self.has_snapshot = false;
                Ok(None)
            }
            Some(BookState::SnapshotComplete) => {
                // A lone complete frame restarts the book; a continuation
                // finishes the assembly in flight
                self.ladder = self.applied(book, !self.assembling)?;
                self.assembling = false;
                self.has_snapshot = true;
                Ok(Some(self.materialize(book.server_time, book.build_from)))
            }
            Some(BookState::Increment) => {
                if !self.has_snapshot {
                    // Nothing to patch yet
                    return Ok(None);
                }
                self.ladder = self.applied(book, false)?;
                Ok(Some(self.materialize(book.server_time, book.build_from)))
            }
        }
    }

    fn snapshot(&self, as_of: DateTime<Utc>) -> OrderBookUpdate {
        self.materialize(as_of, Some(DataKind::OrderLog))
    }

    fn update(&mut self, entry: &OrderLogEntry) -> FeedResult<Option<OrderBookUpdate>> {
        match entry.action {
            OrderLogAction::Register => {
                self.orders
                    .insert(entry.order_id, (entry.side, entry.price, entry.volume));
                self.ladder.add_volume(entry.side, entry.price, entry.volume);
            }
            OrderLogAction::Cancel => {
                let Some((side, price, volume)) = self.orders.remove(&entry.order_id) else {
                    // Cancel for an order registered before our window
                    return Ok(None);
                };
                self.ladder.sub_volume(side, price, volume, true);
            }
            OrderLogAction::Match => {
                let Some((side, price, volume)) = self.orders.get(&entry.order_id).copied() else {
                    return Ok(None);
                };
                let remaining = volume - entry.volume;
                if remaining <= Decimal::ZERO {
                    self.orders.remove(&entry.order_id);
                    self.ladder.sub_volume(side, price, volume, true);
                } else {
                    self.orders.insert(entry.order_id, (side, price, remaining));
                    self.ladder.sub_volume(side, price, entry.volume, false);
                }
            }
        }

        Ok(Some(self.materialize(entry.server_time, Some(DataKind::OrderLog))))
    }
}
