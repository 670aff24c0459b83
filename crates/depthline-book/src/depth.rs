//! Order-book snapshot cache with failure containment
//!
//! Reduces inbound books to forwardable diffs, rebuilds full snapshots
//! from increments, and permanently disables an instrument's processing
//! after too many consecutive failures so one bad feed cannot poison the
//! rest of the session.

use crate::algebra;
use crate::builder::{DepthBuilder, IncrementBuilder};
use depthline_types::{BookState, FeedError, FeedResult, OrderBookUpdate, SecurityId};
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Consecutive failures after which an instrument is disabled
pub const ERROR_CEILING: u32 = 100;

/// Outcome of feeding one book into the holder
#[derive(Debug, Clone, PartialEq)]
pub enum Processed {
    /// A book worth forwarding downstream (seed echo, diff, or rebuilt
    /// snapshot)
    Forward(OrderBookUpdate),
    /// Nothing to forward: the update was absorbed into state (or the
    /// caller declined a response)
    Skip,
    /// The instrument tripped its failure ceiling; the update was dropped
    Disabled,
}

struct Entry<B> {
    /// Last complete book, `None` while a multi-frame snapshot assembles
    snapshot: Option<OrderBookUpdate>,
    builder: B,
    errors: u32,
}

/// Per-instrument order-book state cache
///
/// Self-contained books are diffed against the cached snapshot;
/// incremental frames are folded through a [`DepthBuilder`]. Processing
/// failures count per instrument, and at [`ERROR_CEILING`] consecutive
/// failures the instrument is disabled until [`reset_snapshot`] clears
/// it. Shared across feed threads; all methods take `&self`.
///
/// [`reset_snapshot`]: OrderBookSnapshotHolder::reset_snapshot
pub struct OrderBookSnapshotHolder<B: DepthBuilder = IncrementBuilder> {
    by_security: RwLock<HashMap<SecurityId, Entry<B>>>,
}

impl<B: DepthBuilder> Default for OrderBookSnapshotHolder<B> {
    fn default() -> Self {
        Self {
            by_security: RwLock::new(HashMap::new()),
        }
    }
}

impl<B: DepthBuilder> OrderBookSnapshotHolder<B> {
    /// Create an empty holder
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one book into the cache
    ///
    /// A self-contained book (state `None`) seeds or replaces the cached
    /// snapshot; against an existing snapshot the forwarded value is the
    /// diff between the two. Any other state goes through the instrument's
    /// [`DepthBuilder`], and a completed rebuild refreshes the cache while
    /// the original increment is forwarded. `need_response = false`
    /// suppresses diff responses but state is updated either way.
    pub fn process(&self, book: &OrderBookUpdate, need_response: bool) -> FeedResult<Processed> {
        let mut cache = self.by_security.write();

        if let Some(entry) = cache.get(&book.security_id) {
            if entry.errors >= ERROR_CEILING {
                return Ok(Processed::Disabled);
            }
        }

        match book.state {
            None => self.process_snapshot(&mut cache, book, need_response),
            Some(_) => self.process_increment(&mut cache, book, need_response),
        }
    }

    fn process_snapshot(
        &self,
        cache: &mut HashMap<SecurityId, Entry<B>>,
        book: &OrderBookUpdate,
        need_response: bool,
    ) -> FeedResult<Processed> {
        let snapshot = book.clone().with_state(BookState::SnapshotComplete);

        let Some(entry) = cache.get_mut(&book.security_id) else {
            let mut builder = B::new(book.security_id.clone());
            builder
                .try_apply(&snapshot)
                .map_err(|e| FeedError::rejected_seed(book.security_id.clone(), e))?;
            cache.insert(
                book.security_id.clone(),
                Entry {
                    snapshot: Some(snapshot.clone()),
                    builder,
                    errors: 0,
                },
            );
            return Ok(Processed::Forward(snapshot));
        };

        let Some(prev) = &entry.snapshot else {
            // A snapshot assembly was in flight; the full book supersedes it
            entry
                .builder
                .try_apply(&snapshot)
                .map_err(|e| FeedError::rejected_seed(book.security_id.clone(), e))?;
            entry.snapshot = Some(snapshot.clone());
            entry.errors = 0;
            return Ok(Processed::Forward(snapshot));
        };

        match algebra::get_delta(prev, &snapshot) {
            Ok(delta) => {
                // Re-seed the builder so later increments patch this book
                entry
                    .builder
                    .try_apply(&snapshot)
                    .map_err(|e| FeedError::rejected_seed(book.security_id.clone(), e))?;
                entry.snapshot = Some(snapshot);
                entry.errors = 0;

                if need_response {
                    Ok(Processed::Forward(delta))
                } else {
                    Ok(Processed::Skip)
                }
            }
            Err(source) => {
                entry.errors += 1;
                if entry.errors >= ERROR_CEILING {
                    warn!(
                        security_id = %book.security_id,
                        errors = entry.errors,
                        "book processing disabled after repeated failures"
                    );
                }
                Err(FeedError::book_processing(book.security_id.clone(), source))
            }
        }
    }

    fn process_increment(
        &self,
        cache: &mut HashMap<SecurityId, Entry<B>>,
        book: &OrderBookUpdate,
        need_response: bool,
    ) -> FeedResult<Processed> {
        let Some(entry) = cache.get_mut(&book.security_id) else {
            let mut builder = B::new(book.security_id.clone());
            return match builder.try_apply(book) {
                Ok(rebuilt) => {
                    let processed = match &rebuilt {
                        Some(snapshot) => Processed::Forward(snapshot.clone()),
                        None => Processed::Skip,
                    };
                    cache.insert(
                        book.security_id.clone(),
                        Entry {
                            snapshot: rebuilt,
                            builder,
                            errors: 0,
                        },
                    );
                    Ok(processed)
                }
                Err(source) => {
                    cache.insert(
                        book.security_id.clone(),
                        Entry {
                            snapshot: None,
                            builder,
                            errors: 1,
                        },
                    );
                    Err(FeedError::book_processing(book.security_id.clone(), source))
                }
            };
        };

        match entry.builder.try_apply(book) {
            Ok(None) => {
                debug!(security_id = %book.security_id, "frame absorbed, book not complete yet");
                Ok(Processed::Skip)
            }
            Ok(Some(rebuilt)) => {
                entry.snapshot = Some(rebuilt);
                entry.errors = 0;

                if need_response {
                    Ok(Processed::Forward(book.clone()))
                } else {
                    Ok(Processed::Skip)
                }
            }
            Err(source) => {
                entry.errors += 1;
                if entry.errors >= ERROR_CEILING {
                    warn!(
                        security_id = %book.security_id,
                        errors = entry.errors,
                        "book processing disabled after repeated failures"
                    );
                }
                Err(FeedError::book_processing(book.security_id.clone(), source))
            }
        }
    }

    /// Last complete book for an instrument
    pub fn try_get_snapshot(&self, security_id: &SecurityId) -> Option<OrderBookUpdate> {
        self.by_security
            .read()
            .get(security_id)
            .and_then(|entry| entry.snapshot.clone())
    }

    /// Drop cached state (including a tripped failure ceiling) for one
    /// instrument, or all when `None`
    pub fn reset_snapshot(&self, security_id: Option<&SecurityId>) {
        let mut cache = self.by_security.write();
        match security_id {
            Some(id) => {
                cache.remove(id);
            }
            None => cache.clear(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use depthline_types::QuoteChange;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn sec() -> SecurityId {
        SecurityId::new("AAPL@NASDAQ")
    }

    fn snapshot(bids: Vec<(Decimal, Decimal)>, asks: Vec<(Decimal, Decimal)>) -> OrderBookUpdate {
        OrderBookUpdate::new(sec(), Utc::now())
            .with_bids(bids.into_iter().map(|(p, v)| QuoteChange::new(p, v)).collect())
            .with_asks(asks.into_iter().map(|(p, v)| QuoteChange::new(p, v)).collect())
    }

    #[test]
    fn test_first_snapshot_forwarded_complete() {
        let holder: OrderBookSnapshotHolder = OrderBookSnapshotHolder::new();
        let book = snapshot(vec![(dec!(100), dec!(5))], vec![(dec!(101), dec!(5))]);

        let Processed::Forward(out) = holder.process(&book, true).unwrap() else {
            panic!("expected forward");
        };
        assert_eq!(out.state, Some(BookState::SnapshotComplete));
        assert_eq!(out.bids, book.bids);
    }

    #[test]
    fn test_second_snapshot_forwards_diff() {
        let holder: OrderBookSnapshotHolder = OrderBookSnapshotHolder::new();
        holder
            .process(
                &snapshot(vec![(dec!(100), dec!(5))], vec![(dec!(101), dec!(5))]),
                true,
            )
            .unwrap();

        let next = snapshot(vec![(dec!(100), dec!(7))], vec![(dec!(101), dec!(5))]);
        let Processed::Forward(diff) = holder.process(&next, true).unwrap() else {
            panic!("expected forward");
        };

        assert_eq!(diff.state, Some(BookState::Increment));
        assert_eq!(diff.bids.len(), 1);
        assert_eq!(diff.bids[0].volume, dec!(7));
        assert!(diff.asks.is_empty());

        // Cache holds the new full book, not the diff
        let cached = holder.try_get_snapshot(&sec()).unwrap();
        assert_eq!(cached.bids[0].volume, dec!(7));
        assert_eq!(cached.asks.len(), 1);
    }

    #[test]
    fn test_no_response_still_updates_state() {
        let holder: OrderBookSnapshotHolder = OrderBookSnapshotHolder::new();
        holder
            .process(&snapshot(vec![(dec!(100), dec!(5))], vec![]), true)
            .unwrap();

        let out = holder
            .process(&snapshot(vec![(dec!(100), dec!(9))], vec![]), false)
            .unwrap();
        assert_eq!(out, Processed::Skip);

        let cached = holder.try_get_snapshot(&sec()).unwrap();
        assert_eq!(cached.bids[0].volume, dec!(9));
    }

    #[test]
    fn test_increment_rebuilds_and_forwards_original() {
        let holder: OrderBookSnapshotHolder = OrderBookSnapshotHolder::new();
        holder
            .process(
                &snapshot(vec![(dec!(100), dec!(5))], vec![(dec!(101), dec!(5))]),
                true,
            )
            .unwrap();

        let increment = OrderBookUpdate::new(sec(), Utc::now())
            .with_bids(vec![QuoteChange::placeholder(dec!(100))])
            .with_state(BookState::Increment);

        let Processed::Forward(out) = holder.process(&increment, true).unwrap() else {
            panic!("expected forward");
        };
        // The original increment goes downstream untouched
        assert_eq!(out, increment);

        // The cache holds the rebuilt full book
        let cached = holder.try_get_snapshot(&sec()).unwrap();
        assert_eq!(cached.state, Some(BookState::SnapshotComplete));
        assert!(cached.bids.is_empty());
        assert_eq!(cached.asks.len(), 1);
    }

    #[test]
    fn test_increment_without_snapshot_is_skipped() {
        let holder: OrderBookSnapshotHolder = OrderBookSnapshotHolder::new();
        let increment = OrderBookUpdate::new(sec(), Utc::now())
            .with_bids(vec![QuoteChange::new(dec!(100), dec!(1))])
            .with_state(BookState::Increment);

        assert_eq!(holder.process(&increment, true).unwrap(), Processed::Skip);
        assert!(holder.try_get_snapshot(&sec()).is_none());
    }

    #[test]
    fn test_multi_frame_snapshot_completes() {
        let holder: OrderBookSnapshotHolder = OrderBookSnapshotHolder::new();

        let started = OrderBookUpdate::new(sec(), Utc::now())
            .with_bids(vec![QuoteChange::new(dec!(100), dec!(5))])
            .with_state(BookState::SnapshotStarted);
        assert_eq!(holder.process(&started, true).unwrap(), Processed::Skip);

        let complete = OrderBookUpdate::new(sec(), Utc::now())
            .with_asks(vec![QuoteChange::new(dec!(101), dec!(5))])
            .with_state(BookState::SnapshotComplete);
        let Processed::Forward(out) = holder.process(&complete, true).unwrap() else {
            panic!("expected forward");
        };
        assert_eq!(out, complete);

        let cached = holder.try_get_snapshot(&sec()).unwrap();
        assert_eq!(cached.bids.len(), 1);
        assert_eq!(cached.asks.len(), 1);
    }

    #[test]
    fn test_rejected_increment_never_corrupts_cache() {
        let holder: OrderBookSnapshotHolder = OrderBookSnapshotHolder::new();
        holder
            .process(
                &snapshot(vec![(dec!(100), dec!(5))], vec![(dec!(101), dec!(5))]),
                true,
            )
            .unwrap();

        // Valid level followed by a duplicate; the whole frame is rejected
        let bad = OrderBookUpdate::new(sec(), Utc::now())
            .with_bids(vec![
                QuoteChange::new(dec!(99), dec!(1)),
                QuoteChange::new(dec!(99), dec!(2)),
            ])
            .with_state(BookState::Increment);
        assert!(holder.process(&bad, true).is_err());

        // The next valid increment rebuilds from uncorrupted state
        let empty = OrderBookUpdate::new(sec(), Utc::now()).with_state(BookState::Increment);
        holder.process(&empty, true).unwrap();

        let cached = holder.try_get_snapshot(&sec()).unwrap();
        assert_eq!(cached.bids.len(), 1);
        assert_eq!(cached.bids[0].price, dec!(100));
        assert_eq!(cached.asks.len(), 1);
        assert!(!cached.bids.iter().any(|q| q.price == dec!(99)));
    }

    #[test]
    fn test_error_counter_resets_on_success() {
        let holder: OrderBookSnapshotHolder = OrderBookSnapshotHolder::new();
        holder
            .process(&snapshot(vec![(dec!(100), dec!(5))], vec![]), true)
            .unwrap();

        let bad = snapshot(
            vec![(dec!(100), dec!(1)), (dec!(100), dec!(2))],
            vec![],
        );
        for _ in 0..(ERROR_CEILING - 1) {
            assert!(holder.process(&bad, true).is_err());
        }

        // A good book clears the streak
        holder
            .process(&snapshot(vec![(dec!(100), dec!(3))], vec![]), true)
            .unwrap();
        for _ in 0..(ERROR_CEILING - 1) {
            assert!(holder.process(&bad, true).is_err());
        }
        assert!(matches!(
            holder.process(&snapshot(vec![(dec!(100), dec!(4))], vec![]), true),
            Ok(Processed::Forward(_))
        ));
    }

    #[test]
    fn test_ceiling_disables_permanently() {
        let holder: OrderBookSnapshotHolder = OrderBookSnapshotHolder::new();
        holder
            .process(&snapshot(vec![(dec!(100), dec!(5))], vec![]), true)
            .unwrap();

        let bad = snapshot(vec![(dec!(100), dec!(1)), (dec!(100), dec!(2))], vec![]);
        for _ in 0..ERROR_CEILING {
            assert!(holder.process(&bad, true).is_err());
        }

        // Valid input no longer heals the instrument
        let good = snapshot(vec![(dec!(100), dec!(3))], vec![]);
        assert_eq!(holder.process(&good, true).unwrap(), Processed::Disabled);
        assert_eq!(holder.process(&good, true).unwrap(), Processed::Disabled);

        // Other instruments are unaffected
        let other = OrderBookUpdate::new(SecurityId::new("MSFT@NASDAQ"), Utc::now())
            .with_bids(vec![QuoteChange::new(dec!(50), dec!(1))]);
        assert!(matches!(
            holder.process(&other, true).unwrap(),
            Processed::Forward(_)
        ));

        // Only an explicit reset restores processing
        holder.reset_snapshot(Some(&sec()));
        assert!(matches!(
            holder.process(&good, true).unwrap(),
            Processed::Forward(_)
        ));
    }

    #[test]
    fn test_reset_all() {
        let holder: OrderBookSnapshotHolder = OrderBookSnapshotHolder::new();
        holder
            .process(&snapshot(vec![(dec!(100), dec!(5))], vec![]), true)
            .unwrap();

        holder.reset_snapshot(None);
        assert!(holder.try_get_snapshot(&sec()).is_none());
    }
}
