//! Level1 conversion: order logs and level1 change sets re-expressed as
//! ticks and single-level books

use depthline_types::{
    DataKind, Level1Change, Level1Field, Level1Value, OrderBookUpdate, OrderLogEntry, QuoteChange,
    Tick,
};
use futures_util::{future, Stream, StreamExt};
use rust_decimal::Decimal;

/// Convert one trade row into a level1 change set
fn level1_from_entry(entry: &OrderLogEntry) -> Option<Level1Change> {
    if !entry.is_trade() {
        return None;
    }

    let msg = Level1Change::new(entry.security_id.clone(), entry.server_time)
        .with_local_time(entry.local_time)
        .with_build_from(DataKind::OrderLog)
        .try_add(Level1Field::LastTradeId, entry.trade_id)
        .try_add(Level1Field::LastTradeStringId, entry.trade_string_id.clone())
        .add(
            Level1Field::LastTradePrice,
            entry.trade_price.unwrap_or(entry.price),
        )
        .add(Level1Field::LastTradeVolume, entry.volume)
        .add(Level1Field::LastTradeTime, entry.server_time)
        .add(Level1Field::LastTradeOrigin, entry.side)
        .try_add(Level1Field::OpenInterest, entry.open_interest);

    Some(msg)
}

/// Convert an order log into last-trade level1 change sets
pub fn order_log_to_level1<I>(entries: I) -> impl Iterator<Item = Level1Change>
where
    I: IntoIterator<Item = OrderLogEntry>,
{
    entries
        .into_iter()
        .filter_map(|entry| level1_from_entry(&entry))
}

/// Async counterpart of [`order_log_to_level1`]
pub fn order_log_to_level1_stream<S>(entries: S) -> impl Stream<Item = Level1Change>
where
    S: Stream<Item = OrderLogEntry>,
{
    entries.filter_map(|entry| future::ready(level1_from_entry(&entry)))
}

/// Convert one level1 change set into a tick, when it carries trade data
fn tick_from_level1(msg: &Level1Change) -> Option<Tick> {
    let price = msg.get_decimal(Level1Field::LastTradePrice)?;

    Some(Tick {
        security_id: msg.security_id.clone(),
        server_time: msg
            .get(Level1Field::LastTradeTime)
            .and_then(Level1Value::as_time)
            .unwrap_or(msg.server_time),
        local_time: msg.local_time,
        trade_id: msg.get(Level1Field::LastTradeId).and_then(Level1Value::as_int),
        trade_string_id: msg
            .get(Level1Field::LastTradeStringId)
            .and_then(Level1Value::as_text)
            .map(str::to_owned),
        price,
        volume: msg.get_decimal(Level1Field::LastTradeVolume),
        origin_side: msg
            .get(Level1Field::LastTradeOrigin)
            .and_then(Level1Value::as_side),
        is_up_tick: msg
            .get(Level1Field::LastTradeUpDown)
            .and_then(Level1Value::as_bool),
        open_interest: msg.get_decimal(Level1Field::OpenInterest),
        build_from: Some(DataKind::Level1),
    })
}

/// Extract ticks from level1 change sets that carry last-trade data
pub fn to_ticks<I>(messages: I) -> impl Iterator<Item = Tick>
where
    I: IntoIterator<Item = Level1Change>,
{
    messages.into_iter().filter_map(|msg| tick_from_level1(&msg))
}

/// Async counterpart of [`to_ticks`]
pub fn to_ticks_stream<S>(messages: S) -> impl Stream<Item = Tick>
where
    S: Stream<Item = Level1Change>,
{
    messages.filter_map(|msg| future::ready(tick_from_level1(&msg)))
}

/// Last known best bid/ask for one instrument
///
/// Prices at or below zero mark the side as unknown, matching venues
/// that publish zero to clear a side.
#[derive(Debug, Default, Clone, PartialEq)]
struct BestPair {
    bid_price: Option<Decimal>,
    bid_volume: Option<Decimal>,
    ask_price: Option<Decimal>,
    ask_volume: Option<Decimal>,
}

impl BestPair {
    fn absorb(&mut self, msg: &Level1Change) {
        if let Some(price) = msg.get_decimal(Level1Field::BestBidPrice) {
            self.bid_price = (price > Decimal::ZERO).then_some(price);
        }
        if let Some(volume) = msg.get_decimal(Level1Field::BestBidVolume) {
            self.bid_volume = Some(volume);
        }
        if let Some(price) = msg.get_decimal(Level1Field::BestAskPrice) {
            self.ask_price = (price > Decimal::ZERO).then_some(price);
        }
        if let Some(volume) = msg.get_decimal(Level1Field::BestAskVolume) {
            self.ask_volume = Some(volume);
        }
    }

    fn to_book(&self, msg: &Level1Change) -> OrderBookUpdate {
        let mut book = OrderBookUpdate::new(msg.security_id.clone(), msg.server_time)
            .with_local_time(msg.local_time)
            .with_build_from(DataKind::Level1);

        if let Some(price) = self.bid_price {
            let volume = self.bid_volume.unwrap_or(Decimal::ZERO);
            book.bids.push(QuoteChange::new(price, volume));
        }
        if let Some(price) = self.ask_price {
            let volume = self.ask_volume.unwrap_or(Decimal::ZERO);
            book.asks.push(QuoteChange::new(price, volume));
        }

        book
    }
}

/// Convert level1 change sets into single-level books
///
/// Tracks the last known best pair per message run (one instrument per
/// converter) and emits a book only when the pair effectively changes.
pub fn to_order_books<I>(messages: I) -> impl Iterator<Item = OrderBookUpdate>
where
    I: IntoIterator<Item = Level1Change>,
{
    let mut best = BestPair::default();

    messages.into_iter().filter_map(move |msg| {
        if !msg.contains_quotes() {
            return None;
        }

        let before = best.clone();
        best.absorb(&msg);
        if best == before {
            return None;
        }

        Some(best.to_book(&msg))
    })
}

/// Async counterpart of [`to_order_books`]
pub fn to_order_books_stream<S>(messages: S) -> impl Stream<Item = OrderBookUpdate>
where
    S: Stream<Item = Level1Change>,
{
    let mut best = BestPair::default();

    messages.filter_map(move |msg| {
        let out = if msg.contains_quotes() {
            let before = best.clone();
            best.absorb(&msg);
            (best != before).then(|| best.to_book(&msg))
        } else {
            None
        };
        future::ready(out)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use depthline_types::{SecurityId, Side};
    use rust_decimal_macros::dec;

    fn sec() -> SecurityId {
        SecurityId::new("AAPL@NASDAQ")
    }

    #[test]
    fn test_tick_extraction() {
        let messages = vec![
            // No trade data
            Level1Change::new(sec(), Utc::now()).add(Level1Field::BestBidPrice, dec!(99)),
            Level1Change::new(sec(), Utc::now())
                .add(Level1Field::LastTradePrice, dec!(100))
                .add(Level1Field::LastTradeVolume, dec!(3))
                .add(Level1Field::LastTradeOrigin, Side::Sell),
        ];

        let ticks: Vec<Tick> = to_ticks(messages).collect();
        assert_eq!(ticks.len(), 1);
        assert_eq!(ticks[0].price, dec!(100));
        assert_eq!(ticks[0].volume, Some(dec!(3)));
        assert_eq!(ticks[0].origin_side, Some(Side::Sell));
        assert_eq!(ticks[0].build_from, Some(DataKind::Level1));
    }

    #[test]
    fn test_order_log_to_level1_trades_only() {
        use depthline_types::OrderLogAction;

        let trade = OrderLogEntry {
            security_id: sec(),
            server_time: Utc::now(),
            local_time: Utc::now(),
            order_id: 1,
            price: dec!(100),
            volume: dec!(2),
            side: Side::Buy,
            action: OrderLogAction::Match,
            trade_id: Some(7),
            trade_string_id: None,
            trade_price: Some(dec!(100.5)),
            open_interest: None,
            is_system: None,
        };
        let register = OrderLogEntry {
            action: OrderLogAction::Register,
            trade_id: None,
            trade_price: None,
            ..trade.clone()
        };

        let out: Vec<Level1Change> = order_log_to_level1(vec![register, trade]).collect();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].get_decimal(Level1Field::LastTradePrice), Some(dec!(100.5)));
        assert_eq!(
            out[0].get(Level1Field::LastTradeId),
            Some(&Level1Value::Int(7))
        );
    }

    #[test]
    fn test_books_emitted_only_on_change() {
        let messages = vec![
            Level1Change::new(sec(), Utc::now())
                .add(Level1Field::BestBidPrice, dec!(99))
                .add(Level1Field::BestBidVolume, dec!(10)),
            // Same pair repeated
            Level1Change::new(sec(), Utc::now())
                .add(Level1Field::BestBidPrice, dec!(99))
                .add(Level1Field::BestBidVolume, dec!(10)),
            // Ask appears
            Level1Change::new(sec(), Utc::now())
                .add(Level1Field::BestAskPrice, dec!(101))
                .add(Level1Field::BestAskVolume, dec!(5)),
            // Trade-only message is ignored
            Level1Change::new(sec(), Utc::now()).add(Level1Field::LastTradePrice, dec!(100)),
        ];

        let books: Vec<OrderBookUpdate> = to_order_books(messages).collect();
        assert_eq!(books.len(), 2);

        assert_eq!(books[0].bids[0].price, dec!(99));
        assert!(books[0].asks.is_empty());

        assert_eq!(books[1].bids[0].price, dec!(99));
        assert_eq!(books[1].asks[0].price, dec!(101));
        assert_eq!(books[1].asks[0].volume, dec!(5));
    }

    #[test]
    fn test_zero_price_clears_side() {
        let messages = vec![
            Level1Change::new(sec(), Utc::now())
                .add(Level1Field::BestBidPrice, dec!(99))
                .add(Level1Field::BestAskPrice, dec!(101)),
            Level1Change::new(sec(), Utc::now()).add(Level1Field::BestAskPrice, dec!(0)),
        ];

        let books: Vec<OrderBookUpdate> = to_order_books(messages).collect();
        assert_eq!(books.len(), 2);
        assert!(books[1].asks.is_empty());
        assert_eq!(books[1].bids[0].price, dec!(99));
    }

    #[tokio::test]
    async fn test_tick_stream_matches_iterator() {
        use futures_util::stream;

        let messages = vec![
            Level1Change::new(sec(), Utc::now()).add(Level1Field::LastTradePrice, dec!(100)),
            Level1Change::new(sec(), Utc::now()).add(Level1Field::BestBidPrice, dec!(99)),
        ];

        let from_iter: Vec<Tick> = to_ticks(messages.clone()).collect();
        let from_stream: Vec<Tick> = to_ticks_stream(stream::iter(messages)).collect().await;
        assert_eq!(from_iter, from_stream);
    }
}
