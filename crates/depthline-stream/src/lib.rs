//! Streaming converters between market-data shapes
//!
//! Re-expresses one feed as another: order logs become ticks or rebuilt
//! order books, level1 change sets become ticks or single-level books,
//! and books collapse back to best bid/ask level1. Each converter exists
//! as a pull iterator for batch/replay work and, where live feeds need
//! it, as an async stream adapter over `futures`.
//!
//! Converters are stateful but single-threaded; wrap one around each
//! feed rather than sharing it.

pub mod book;
pub mod level1;
pub mod order_log;

pub use book::{build_if_need, build_if_need_stream, to_level1, to_level1_stream, BuildIfNeed};
pub use order_log::{
    to_order_books, to_order_books_stream, to_ticks, to_ticks_stream, OrderLogDepths,
    OrderLogTicks,
};
