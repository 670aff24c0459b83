//! Book conversion: best-of-book extraction and on-demand rebuilding

use depthline_book::{DepthBuilder, IncrementBuilder};
use depthline_types::{
    DataKind, FeedResult, Level1Change, Level1Field, OrderBookUpdate, SecurityId,
};
use futures_util::{future, Stream, StreamExt};
use std::collections::HashMap;
use tracing::debug;

/// Convert one final book into a best bid/ask level1 change set
fn level1_from_book(book: &OrderBookUpdate) -> Option<Level1Change> {
    if !book.is_final() {
        return None;
    }

    let msg = Level1Change::new(book.security_id.clone(), book.server_time)
        .with_local_time(book.local_time)
        .with_build_from(DataKind::MarketDepth)
        .try_add(Level1Field::BestBidPrice, book.best_bid().map(|q| q.price))
        .try_add(Level1Field::BestBidVolume, book.best_bid().map(|q| q.volume))
        .try_add(Level1Field::BestAskPrice, book.best_ask().map(|q| q.price))
        .try_add(Level1Field::BestAskVolume, book.best_ask().map(|q| q.volume));

    if msg.has_changes() {
        Some(msg)
    } else {
        None
    }
}

/// Extract best bid/ask level1 change sets from complete books
///
/// Incremental frames and empty books produce nothing.
pub fn to_level1<I>(books: I) -> impl Iterator<Item = Level1Change>
where
    I: IntoIterator<Item = OrderBookUpdate>,
{
    books.into_iter().filter_map(|book| level1_from_book(&book))
}

/// Async counterpart of [`to_level1`]
pub fn to_level1_stream<S>(books: S) -> impl Stream<Item = Level1Change>
where
    S: Stream<Item = OrderBookUpdate>,
{
    books.filter_map(|book| future::ready(level1_from_book(&book)))
}

/// Rebuild complete books from a mixed snapshot/increment sequence
///
/// Self-contained books pass through untouched; stateful frames are
/// folded through a per-instrument [`DepthBuilder`] and the rebuilt
/// snapshot is emitted each time the book is complete. Frames that only
/// advance assembly produce nothing.
pub struct BuildIfNeed<I, B = IncrementBuilder> {
    inner: I,
    builders: HashMap<SecurityId, B>,
}

impl<I, B> Iterator for BuildIfNeed<I, B>
where
    I: Iterator<Item = OrderBookUpdate>,
    B: DepthBuilder,
{
    type Item = FeedResult<OrderBookUpdate>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let book = self.inner.next()?;

            if book.state.is_none() {
                return Some(Ok(book));
            }

            let builder = self
                .builders
                .entry(book.security_id.clone())
                .or_insert_with(|| B::new(book.security_id.clone()));

            match builder.try_apply(&book) {
                Ok(Some(rebuilt)) => return Some(Ok(rebuilt)),
                Ok(None) => {
                    debug!(security_id = %book.security_id, "frame absorbed, book not complete yet");
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// Rebuild complete books where the input is not already self-contained
pub fn build_if_need<I>(books: I) -> BuildIfNeed<I::IntoIter>
where
    I: IntoIterator<Item = OrderBookUpdate>,
{
    BuildIfNeed {
        inner: books.into_iter(),
        builders: HashMap::new(),
    }
}

/// Async counterpart of [`build_if_need`]
pub fn build_if_need_stream<S>(books: S) -> impl Stream<Item = FeedResult<OrderBookUpdate>>
where
    S: Stream<Item = OrderBookUpdate>,
{
    books.filter_map({
        let mut builders: HashMap<SecurityId, IncrementBuilder> = HashMap::new();
        move |book| {
            let out = if book.state.is_none() {
                Some(Ok(book))
            } else {
                let builder = builders
                    .entry(book.security_id.clone())
                    .or_insert_with(|| IncrementBuilder::new(book.security_id.clone()));
                match builder.try_apply(&book) {
                    Ok(rebuilt) => rebuilt.map(Ok),
                    Err(e) => Some(Err(e)),
                }
            };
            future::ready(out)
        }
    })
}
