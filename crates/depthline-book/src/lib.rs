//! Order-book state and transform engine
//!
//! This crate provides the depthline core: a pure algebra over ordered
//! price-level arrays ([`algebra`]), a per-instrument incremental depth
//! builder ([`DepthBuilder`] / [`IncrementBuilder`]), and the two
//! authoritative per-instrument state caches ([`Level1SnapshotHolder`],
//! [`OrderBookSnapshotHolder`]).
//!
//! The engine creates no threads and performs no I/O; it is driven
//! synchronously by whatever thread delivers the inbound update. Holders
//! are internally synchronized and safe to share across feed threads.
//!
//! # Example
//!
//! ```
//! use depthline_book::OrderBookSnapshotHolder;
//! use depthline_types::{OrderBookUpdate, QuoteChange, SecurityId};
//! use chrono::Utc;
//! use rust_decimal_macros::dec;
//!
//! let holder: OrderBookSnapshotHolder = OrderBookSnapshotHolder::new();
//! let book = OrderBookUpdate::new(SecurityId::new("AAPL@NASDAQ"), Utc::now())
//!     .with_bids(vec![QuoteChange::new(dec!(100), dec!(5))])
//!     .with_asks(vec![QuoteChange::new(dec!(101), dec!(5))]);
//!
//! let processed = holder.process(&book, true).unwrap();
//! ```

pub mod algebra;
pub mod builder;
pub mod depth;
pub mod level1;
pub mod storage;

// Re-export main types
pub use builder::{DepthBuilder, IncrementBuilder};
pub use depth::{OrderBookSnapshotHolder, Processed, ERROR_CEILING};
pub use level1::Level1SnapshotHolder;
pub use storage::Ladder;
