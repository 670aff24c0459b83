//! Level1 snapshot cache and diffing
//!
//! Accumulates per-instrument best-of-market state and reduces inbound
//! change sets to the fields that actually changed.

use depthline_types::{Level1Change, SecurityId};
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

/// Per-instrument accumulator of level1 field state
///
/// The cached entry for an instrument is the union of every field ever
/// seen for it with each field's latest value. Shared across feed
/// threads; all methods take `&self`.
#[derive(Debug, Default)]
pub struct Level1SnapshotHolder {
    by_security: RwLock<HashMap<SecurityId, Level1Change>>,
}

impl Level1SnapshotHolder {
    /// Create an empty holder
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a change set into the cache and return what changed
    ///
    /// The first message for an instrument seeds the cache and is echoed
    /// back whole. Later messages update the cached fields and, when
    /// `need_response` is set, return a diff holding only the fields
    /// whose values differ from the cache. `None` means nothing changed
    /// (or the diff was not requested); an empty inbound change set is
    /// ignored entirely.
    pub fn process(&self, incoming: &Level1Change, need_response: bool) -> Option<Level1Change> {
        if !incoming.has_changes() {
            return None;
        }

        let mut cache = self.by_security.write();

        let Some(entry) = cache.get_mut(&incoming.security_id) else {
            debug!(security_id = %incoming.security_id, "seeding level1 snapshot");
            cache.insert(incoming.security_id.clone(), incoming.clone());
            return Some(incoming.clone());
        };

        entry.server_time = incoming.server_time;
        entry.local_time = incoming.local_time;

        let mut diff = Level1Change::new(incoming.security_id.clone(), incoming.server_time)
            .with_local_time(incoming.local_time);
        diff.build_from = incoming.build_from;

        for (field, value) in &incoming.changes {
            if entry.get(*field) == Some(value) {
                continue;
            }
            entry.changes.insert(*field, value.clone());
            if need_response {
                diff.changes.insert(*field, value.clone());
            }
        }

        if diff.has_changes() {
            Some(diff)
        } else {
            None
        }
    }

    /// Current accumulated snapshot for an instrument
    pub fn try_get_snapshot(&self, security_id: &SecurityId) -> Option<Level1Change> {
        self.by_security.read().get(security_id).cloned()
    }

    /// Drop cached state for one instrument, or all when `None`
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
    use depthline_types::{Level1Field, Level1Value};
    use rust_decimal_macros::dec;

    fn sec() -> SecurityId {
        SecurityId::new("AAPL@NASDAQ")
    }

    fn change(price: rust_decimal::Decimal) -> Level1Change {
        Level1Change::new(sec(), Utc::now()).add(Level1Field::LastTradePrice, price)
    }

    #[test]
    fn test_first_message_seeds_and_echoes() {
        let holder = Level1SnapshotHolder::new();
        let msg = change(dec!(100));

        let out = holder.process(&msg, false).unwrap();
        assert_eq!(out.changes, msg.changes);
        assert!(holder.try_get_snapshot(&sec()).is_some());
    }

    #[test]
    fn test_repeat_is_idempotent() {
        let holder = Level1SnapshotHolder::new();
        holder.process(&change(dec!(100)), true);

        assert!(holder.process(&change(dec!(100)), true).is_none());
        assert!(holder.process(&change(dec!(100)), false).is_none());
    }

    #[test]
    fn test_diff_contains_only_changed_fields() {
        let holder = Level1SnapshotHolder::new();
        let seed = Level1Change::new(sec(), Utc::now())
            .add(Level1Field::BestBidPrice, dec!(99))
            .add(Level1Field::BestAskPrice, dec!(101));
        holder.process(&seed, true);

        let update = Level1Change::new(sec(), Utc::now())
            .add(Level1Field::BestBidPrice, dec!(99))
            .add(Level1Field::BestAskPrice, dec!(102));

        let diff = holder.process(&update, true).unwrap();
        assert_eq!(diff.changes.len(), 1);
        assert_eq!(
            diff.get(Level1Field::BestAskPrice),
            Some(&Level1Value::Decimal(dec!(102)))
        );
    }

    #[test]
    fn test_cache_accumulates_across_messages() {
        let holder = Level1SnapshotHolder::new();
        holder.process(
            &Level1Change::new(sec(), Utc::now()).add(Level1Field::BestBidPrice, dec!(99)),
            true,
        );
        holder.process(
            &Level1Change::new(sec(), Utc::now()).add(Level1Field::BestAskPrice, dec!(101)),
            true,
        );

        let snapshot = holder.try_get_snapshot(&sec()).unwrap();
        assert_eq!(snapshot.get_decimal(Level1Field::BestBidPrice), Some(dec!(99)));
        assert_eq!(snapshot.get_decimal(Level1Field::BestAskPrice), Some(dec!(101)));
    }

    #[test]
    fn test_changes_still_applied_without_response() {
        let holder = Level1SnapshotHolder::new();
        holder.process(&change(dec!(100)), true);

        assert!(holder.process(&change(dec!(101)), false).is_none());
        let snapshot = holder.try_get_snapshot(&sec()).unwrap();
        assert_eq!(snapshot.get_decimal(Level1Field::LastTradePrice), Some(dec!(101)));
    }

    #[test]
    fn test_empty_change_set_creates_no_entry() {
        let holder = Level1SnapshotHolder::new();
        let empty = Level1Change::new(sec(), Utc::now());
        assert!(holder.process(&empty, true).is_none());
        assert!(holder.try_get_snapshot(&sec()).is_none());
    }

    #[test]
    fn test_reset() {
        let holder = Level1SnapshotHolder::new();
        holder.process(&change(dec!(100)), true);

        let other = SecurityId::new("MSFT@NASDAQ");
        holder.process(
            &Level1Change::new(other.clone(), Utc::now()).add(Level1Field::LastTradePrice, dec!(1)),
            true,
        );

        holder.reset_snapshot(Some(&sec()));
        assert!(holder.try_get_snapshot(&sec()).is_none());
        assert!(holder.try_get_snapshot(&other).is_some());

        holder.reset_snapshot(None);
        assert!(holder.try_get_snapshot(&other).is_none());
    }
}
