//! Order-log conversion: raw rows into ticks and order books
//!
//! Both shapes come as pull iterators for batch/replay use and as async
//! stream adapters for live feeds. The conversion state is shared between
//! the two so a replay and a live session see identical output.

use chrono::{DateTime, Duration, Utc};
use depthline_book::{algebra, DepthBuilder, IncrementBuilder};
use depthline_types::{DataKind, FeedResult, OrderBookUpdate, OrderLogEntry, Tick};
use futures_util::{future, stream, Stream, StreamExt};
use std::collections::{HashSet, VecDeque};

/// Trade extraction state: dedups by trade id across the whole run
#[derive(Debug, Default)]
struct TickDedup {
    seen_ids: HashSet<i64>,
    seen_string_ids: HashSet<String>,
}

impl TickDedup {
    /// Convert one row, skipping non-trades and repeated trade ids
    fn convert(&mut self, entry: &OrderLogEntry) -> Option<Tick> {
        if !entry.is_trade() {
            return None;
        }

        if let Some(id) = entry.trade_id {
            if !self.seen_ids.insert(id) {
                return None;
            }
        } else if let Some(id) = &entry.trade_string_id {
            if !self.seen_string_ids.insert(id.clone()) {
                return None;
            }
        }

        Some(Tick {
            security_id: entry.security_id.clone(),
            server_time: entry.server_time,
            local_time: entry.local_time,
            trade_id: entry.trade_id,
            trade_string_id: entry.trade_string_id.clone(),
            price: entry.trade_price.unwrap_or(entry.price),
            volume: Some(entry.volume),
            origin_side: Some(entry.side),
            is_up_tick: None,
            open_interest: entry.open_interest,
            build_from: Some(DataKind::OrderLog),
        })
    }
}

/// Book-folding state shared by the sync and async depth converters
struct DepthState<B> {
    builder: Option<B>,
    interval: Duration,
    max_depth: Option<usize>,
    last_emit: Option<DateTime<Utc>>,
    snapshot_sent: bool,
}

impl<B: DepthBuilder> DepthState<B> {
    fn new(interval: Duration, max_depth: Option<usize>) -> Self {
        Self {
            builder: None,
            interval,
            max_depth,
            last_emit: None,
            snapshot_sent: false,
        }
    }

    /// Fold one row; may yield an initial empty snapshot plus a book
    fn push(&mut self, entry: &OrderLogEntry) -> Vec<FeedResult<OrderBookUpdate>> {
        let mut out = Vec::new();

        let builder = self
            .builder
            .get_or_insert_with(|| B::new(entry.security_id.clone()));

        // Mark the start of coverage before the first row mutates anything
        if !self.snapshot_sent {
            self.snapshot_sent = true;
            out.push(Ok(builder.snapshot(entry.server_time)));
        }

        match builder.update(entry) {
            Ok(Some(book)) => {
                let throttled = self.interval > Duration::zero()
                    && self
                        .last_emit
                        .is_some_and(|last| book.server_time - last < self.interval);

                if !throttled {
                    self.last_emit = Some(book.server_time);
                    match self.max_depth {
                        Some(depth) => out.push(algebra::truncate(&book, depth)),
                        None => out.push(Ok(book)),
                    }
                }
            }
            Ok(None) => {}
            Err(e) => out.push(Err(e)),
        }

        out
    }
}

/// Iterator over trades extracted from an order log
///
/// Skips non-trade rows and repeated trade ids (a match reported once per
/// resting order).
pub struct OrderLogTicks<I> {
    inner: I,
    dedup: TickDedup,
}

impl<I: Iterator<Item = OrderLogEntry>> Iterator for OrderLogTicks<I> {
    type Item = Tick;

    fn next(&mut self) -> Option<Tick> {
        loop {
            let entry = self.inner.next()?;
            if let Some(tick) = self.dedup.convert(&entry) {
                return Some(tick);
            }
        }
    }
}

/// Convert an order log into its trades
pub fn to_ticks<I>(entries: I) -> OrderLogTicks<I::IntoIter>
where
    I: IntoIterator<Item = OrderLogEntry>,
{
    OrderLogTicks {
        inner: entries.into_iter(),
        dedup: TickDedup::default(),
    }
}

/// Async counterpart of [`to_ticks`]
pub fn to_ticks_stream<S>(entries: S) -> impl Stream<Item = Tick>
where
    S: Stream<Item = OrderLogEntry>,
{
    let mut dedup = TickDedup::default();
    entries.filter_map(move |entry| {
        let tick = dedup.convert(&entry);
        future::ready(tick)
    })
}

/// Iterator over order books rebuilt from an order log
///
/// The first item is an empty book marking the start of coverage; after
/// that, one complete book per effective row, throttled to `interval` and
/// trimmed to `max_depth` levels per side when set.
pub struct OrderLogDepths<I, B = IncrementBuilder> {
    inner: I,
    state: DepthState<B>,
    queue: VecDeque<FeedResult<OrderBookUpdate>>,
}

impl<I, B> Iterator for OrderLogDepths<I, B>
where
    I: Iterator<Item = OrderLogEntry>,
    B: DepthBuilder,
{
    type Item = FeedResult<OrderBookUpdate>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.queue.pop_front() {
                return Some(item);
            }
            let entry = self.inner.next()?;
            self.queue.extend(self.state.push(&entry));
        }
    }
}

/// Convert an order log into a sequence of complete order books
///
/// `interval` of zero emits every book; `max_depth` of `None` keeps the
/// full depth.
pub fn to_order_books<I>(
    entries: I,
    interval: Duration,
    max_depth: Option<usize>,
) -> OrderLogDepths<I::IntoIter>
where
    I: IntoIterator<Item = OrderLogEntry>,
{
    OrderLogDepths {
        inner: entries.into_iter(),
        state: DepthState::new(interval, max_depth),
        queue: VecDeque::new(),
    }
}

/// Async counterpart of [`to_order_books`]
pub fn to_order_books_stream<S>(
    entries: S,
    interval: Duration,
    max_depth: Option<usize>,
) -> impl Stream<Item = FeedResult<OrderBookUpdate>>
where
    S: Stream<Item = OrderLogEntry>,
{
    entries
        .scan(
            DepthState::<IncrementBuilder>::new(interval, max_depth),
            |state, entry| future::ready(Some(state.push(&entry))),
        )
        .map(stream::iter)
        .flatten()
}
