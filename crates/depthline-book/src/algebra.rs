//! Stateless order-book algebra
//!
//! Pure transformations over ordered price-level arrays: validation,
//! truncation, delta/patch, grouping/ungrouping, sparsification, and
//! merging. All functions expect already-sorted, de-duplicated input
//! (bids descending, asks ascending) and preserve that ordering.

use depthline_types::{
    BookState, FeedError, FeedResult, OrderBookUpdate, QuoteChange, Side,
};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Check the structural invariants of a book
///
/// True iff every level has strictly positive price and volume, each side
/// is strictly monotonic in its sort direction (which also rules out
/// duplicate prices), and the best bid is strictly below the best ask
/// when both sides are non-empty.
pub fn verify(book: &OrderBookUpdate) -> bool {
    if !verify_side(&book.bids, Side::Buy) || !verify_side(&book.asks, Side::Sell) {
        return false;
    }

    match (book.best_bid(), book.best_ask()) {
        (Some(bid), Some(ask)) => bid.price < ask.price,
        _ => true,
    }
}

fn verify_side(levels: &[QuoteChange], side: Side) -> bool {
    for level in levels {
        if level.price <= Decimal::ZERO || level.volume <= Decimal::ZERO {
            return false;
        }
    }

    levels.windows(2).all(|pair| {
        if side.is_bids() {
            pair[0].price > pair[1].price
        } else {
            pair[0].price < pair[1].price
        }
    })
}

/// Keep only the first `max_depth` levels per side
///
/// Requires a final book (self-contained or `SnapshotComplete`); an
/// incremental frame cannot be truncated losslessly.
pub fn truncate(book: &OrderBookUpdate, max_depth: usize) -> FeedResult<OrderBookUpdate> {
    if !book.is_final() {
        return Err(FeedError::NotFinal { state: book.state });
    }

    let mut out = book.clone();
    out.bids.truncate(max_depth);
    out.asks.truncate(max_depth);
    Ok(out)
}

/// Compute the change between two books
///
/// The result carries `state = Increment` and, applied to `from` via
/// [`add_delta`], reconstructs `to` exactly. A price appearing twice on
/// one side of either input is an error.
pub fn get_delta(from: &OrderBookUpdate, to: &OrderBookUpdate) -> FeedResult<OrderBookUpdate> {
    Ok(OrderBookUpdate {
        security_id: to.security_id.clone(),
        server_time: to.server_time,
        local_time: to.local_time,
        bids: get_delta_side(&from.bids, &to.bids, Side::Buy)?,
        asks: get_delta_side(&from.asks, &to.asks, Side::Sell)?,
        state: Some(BookState::Increment),
        build_from: to.build_from,
    })
}

/// Compute the change between two sides of a book
pub fn get_delta_side(
    from: &[QuoteChange],
    to: &[QuoteChange],
    side: Side,
) -> FeedResult<Vec<QuoteChange>> {
    let from_map = price_map(from, side)?;
    let mut to_map = price_map(to, side)?;

    for (price, from_level) in &from_map {
        match to_map.get(price) {
            // Unchanged level: nothing to report
            Some(to_level) if to_level.same_as(from_level) => {
                to_map.remove(price);
            }
            // Changed level: the `to` entry is the new value
            Some(_) => {}
            // Removed level: report a zero-volume marker
            None => {
                let mut removed = from_level.clone();
                removed.volume = Decimal::ZERO;
                removed.inner_quotes = None;
                to_map.insert(*price, removed);
            }
        }
    }

    Ok(in_side_order(to_map, side))
}

/// Apply a delta to a book
///
/// The inverse of [`get_delta`]: both inputs must be sorted, and the
/// result is the patched, still-sorted book.
pub fn add_delta(from: &OrderBookUpdate, delta: &OrderBookUpdate) -> OrderBookUpdate {
    OrderBookUpdate {
        security_id: from.security_id.clone(),
        server_time: delta.server_time,
        local_time: delta.local_time,
        bids: add_delta_side(&from.bids, &delta.bids, true),
        asks: add_delta_side(&from.asks, &delta.asks, false),
        state: None,
        build_from: from.build_from,
    }
}

/// Sorted merge-patch of one side
///
/// For a price present in both, the delta entry wins if its volume is
/// non-zero, otherwise the level is dropped; new non-zero delta prices
/// are inserted in sorted position; everything else passes through.
pub fn add_delta_side(
    from: &[QuoteChange],
    delta: &[QuoteChange],
    is_bids: bool,
) -> Vec<QuoteChange> {
    let ahead = |a: Decimal, b: Decimal| if is_bids { a > b } else { a < b };

    let mut result = Vec::with_capacity(from.len() + delta.len());
    let mut from_iter = from.iter();
    let mut current = from_iter.next();

    for change in delta {
        let mut consumed = false;

        while let Some(level) = current {
            if ahead(level.price, change.price) {
                result.push(level.clone());
                current = from_iter.next();
            } else if level.price == change.price {
                if !change.volume.is_zero() {
                    result.push(change.clone());
                }
                current = from_iter.next();
                consumed = true;
                break;
            } else {
                break;
            }
        }

        if !consumed && !change.volume.is_zero() {
            result.push(change.clone());
        }
    }

    while let Some(level) = current {
        result.push(level.clone());
        current = from_iter.next();
    }

    result
}

/// Group both sides of a book into price buckets of width `price_range`
pub fn group(book: &OrderBookUpdate, price_range: Decimal) -> FeedResult<OrderBookUpdate> {
    if price_range <= Decimal::ZERO {
        return Err(FeedError::InvalidPriceRange { value: price_range });
    }

    let mut out = book.clone();
    out.bids = group_side(&book.bids, Side::Buy, price_range);
    out.asks = group_side(&book.asks, Side::Sell, price_range);
    Ok(out)
}

/// Group one side into buckets anchored at the first level's price
///
/// The bucket boundary advances by `price_range` in the side's direction
/// each time a level falls outside the current bucket. Each output
/// level's `inner_quotes` holds the absorbed levels, its volume their
/// sum, so [`ungroup`] is lossless.
pub fn group_side(levels: &[QuoteChange], side: Side, price_range: Decimal) -> Vec<QuoteChange> {
    let Some(first) = levels.first() else {
        return Vec::new();
    };

    let mut out = Vec::new();
    let mut anchor = first.price;
    let mut bucket: Vec<QuoteChange> = Vec::new();

    for level in levels {
        loop {
            let outside = if side.is_bids() {
                level.price <= anchor - price_range
            } else {
                level.price >= anchor + price_range
            };

            if !outside {
                break;
            }

            if !bucket.is_empty() {
                out.push(make_bucket(anchor, std::mem::take(&mut bucket)));
            }
            anchor = if side.is_bids() {
                anchor - price_range
            } else {
                anchor + price_range
            };
        }

        bucket.push(level.clone());
    }

    if !bucket.is_empty() {
        out.push(make_bucket(anchor, bucket));
    }

    out
}

fn make_bucket(anchor: Decimal, inner: Vec<QuoteChange>) -> QuoteChange {
    let volume = inner.iter().map(|q| q.volume).sum();
    let orders_count = inner
        .iter()
        .filter_map(|q| q.orders_count)
        .reduce(|a, b| a + b);

    let mut bucket = QuoteChange::new(anchor, volume);
    bucket.orders_count = orders_count;
    bucket.inner_quotes = Some(inner);
    bucket
}

/// Flatten a grouped book back to its original levels
///
/// Fails if any level lacks `inner_quotes`, i.e. was not produced by
/// [`group`].
pub fn ungroup(book: &OrderBookUpdate) -> FeedResult<OrderBookUpdate> {
    let mut out = book.clone();
    out.bids = ungroup_side(&book.bids, Side::Buy)?;
    out.asks = ungroup_side(&book.asks, Side::Sell)?;
    Ok(out)
}

fn ungroup_side(levels: &[QuoteChange], side: Side) -> FeedResult<Vec<QuoteChange>> {
    let mut out = Vec::new();

    for level in levels {
        let inner = level
            .inner_quotes
            .as_ref()
            .ok_or(FeedError::NotGrouped { price: level.price })?;
        out.extend(inner.iter().cloned());
    }

    sort_side(&mut out, side);
    Ok(out)
}

/// Fill the open interval between a best bid and a best ask with
/// zero-volume placeholders
///
/// Candidates are spaced by `price_range`, rounded to `price_step` (bid
/// side toward higher prices, ask side toward lower), generated from both
/// ends alternately until the fronts meet or `max_depth` placeholders
/// exist in total. Generated prices never collide with the real bid/ask.
pub fn sparse_gap(
    bid: &QuoteChange,
    ask: &QuoteChange,
    price_range: Decimal,
    price_step: Decimal,
    max_depth: usize,
) -> FeedResult<(Vec<QuoteChange>, Vec<QuoteChange>)> {
    check_range(price_range)?;
    check_range(price_step)?;

    let mut bids = Vec::new();
    let mut asks = Vec::new();

    if bid.price >= ask.price {
        return Ok((bids, asks));
    }

    let mut bid_front = bid.price;
    let mut ask_front = ask.price;

    loop {
        if bids.len() + asks.len() >= max_depth {
            break;
        }

        bid_front = round_up_to_step(bid_front + price_range, price_step);
        ask_front = round_down_to_step(ask_front - price_range, price_step);

        if bid_front > ask_front {
            break;
        }

        bids.push(QuoteChange::placeholder(bid_front));

        if bid_front == ask_front || bids.len() + asks.len() >= max_depth {
            break;
        }

        asks.push(QuoteChange::placeholder(ask_front));
    }

    // Generated ascending/descending from the inside out; restore side order
    bids.reverse();
    asks.reverse();

    Ok((bids, asks))
}

/// Fill the gaps between consecutive real levels of one side with
/// zero-volume placeholders
///
/// Keeps all real levels, capped at `max_depth` total output levels.
pub fn sparse_side(
    levels: &[QuoteChange],
    side: Side,
    price_range: Decimal,
    price_step: Decimal,
    max_depth: usize,
) -> FeedResult<Vec<QuoteChange>> {
    check_range(price_range)?;
    check_range(price_step)?;

    let mut out = Vec::new();

    'outer: for (i, level) in levels.iter().enumerate() {
        if out.len() >= max_depth {
            break;
        }
        out.push(level.clone());

        let Some(next) = levels.get(i + 1) else {
            break;
        };

        let (from, to) = (level.price, next.price);
        let mut last = None;
        let mut k = Decimal::ONE;

        loop {
            let exact = if side.is_bids() {
                from - price_range * k
            } else {
                from + price_range * k
            };

            let inside = if side.is_bids() { exact > to } else { exact < to };
            if !inside {
                break;
            }

            let candidate = if side.is_bids() {
                round_up_to_step(exact, price_step)
            } else {
                round_down_to_step(exact, price_step)
            };

            let strictly_between = if side.is_bids() {
                candidate < from && candidate > to
            } else {
                candidate > from && candidate < to
            };

            if strictly_between && last != Some(candidate) {
                if out.len() >= max_depth {
                    break 'outer;
                }
                out.push(QuoteChange::placeholder(candidate));
                last = Some(candidate);
            }

            k += Decimal::ONE;
        }
    }

    Ok(out)
}

/// Create a sparse rendition of a whole book: gaps inside each side and
/// the bid/ask spread are filled with zero-volume placeholders
pub fn sparse(
    book: &OrderBookUpdate,
    price_range: Decimal,
    price_step: Decimal,
    max_depth: usize,
) -> FeedResult<OrderBookUpdate> {
    let mut bids = sparse_side(&book.bids, Side::Buy, price_range, price_step, max_depth)?;
    let mut asks = sparse_side(&book.asks, Side::Sell, price_range, price_step, max_depth)?;

    if let (Some(bid), Some(ask)) = (book.best_bid(), book.best_ask()) {
        let (gap_bids, gap_asks) = sparse_gap(bid, ask, price_range, price_step, max_depth)?;
        bids.splice(0..0, gap_bids);
        asks.splice(0..0, gap_asks);
    }

    let mut out = book.clone();
    out.bids = bids;
    out.asks = asks;
    Ok(out)
}

/// Merge a real book with a previously computed sparse book
///
/// Each side is re-sorted; on a price collision the level with non-zero
/// volume (the real one) wins, so sparse renditions that kept their real
/// levels merge cleanly.
pub fn join(original: &OrderBookUpdate, sparse: &OrderBookUpdate) -> OrderBookUpdate {
    let mut out = original.clone();
    out.bids = join_side(&original.bids, &sparse.bids, Side::Buy);
    out.asks = join_side(&original.asks, &sparse.asks, Side::Sell);
    out
}

fn join_side(original: &[QuoteChange], sparse: &[QuoteChange], side: Side) -> Vec<QuoteChange> {
    let mut by_price: BTreeMap<Decimal, QuoteChange> = BTreeMap::new();

    for level in sparse {
        by_price.insert(level.price, level.clone());
    }
    for level in original {
        by_price.insert(level.price, level.clone());
    }

    in_side_order(by_price, side)
}

/// Sort one side in its natural direction (bids descending, asks ascending)
pub fn sort_side(levels: &mut [QuoteChange], side: Side) {
    levels.sort_by(|a, b| {
        if side.is_bids() {
            b.price.cmp(&a.price)
        } else {
            a.price.cmp(&b.price)
        }
    });
}

fn price_map(levels: &[QuoteChange], side: Side) -> FeedResult<BTreeMap<Decimal, QuoteChange>> {
    let mut map = BTreeMap::new();
    for level in levels {
        if map.insert(level.price, level.clone()).is_some() {
            return Err(FeedError::DuplicatePrice {
                side,
                price: level.price,
            });
        }
    }
    Ok(map)
}

fn in_side_order(map: BTreeMap<Decimal, QuoteChange>, side: Side) -> Vec<QuoteChange> {
    if side.is_bids() {
        map.into_values().rev().collect()
    } else {
        map.into_values().collect()
    }
}

fn check_range(value: Decimal) -> FeedResult<()> {
    if value <= Decimal::ZERO {
        return Err(FeedError::InvalidPriceRange { value });
    }
    Ok(())
}

fn round_up_to_step(price: Decimal, step: Decimal) -> Decimal {
    (price / step).ceil() * step
}

fn round_down_to_step(price: Decimal, step: Decimal) -> Decimal {
    (price / step).floor() * step
}
