//! Shared types for the depthline market-data normalization engine
//!
//! This crate provides the message model used across the depthline workspace.
//! It has minimal dependencies and can be used independently.
//!
//! # Key Types
//!
//! - [`SecurityId`] - Instrument identifiers (`SYM@VENUE` format)
//! - [`QuoteChange`] - A single order-book price level with decimal precision
//! - [`OrderBookUpdate`] - Full or incremental depth message
//! - [`Level1Change`] - Best-of-market field change set
//! - [`Tick`], [`OrderLogEntry`] - Trade and raw order-log messages
//! - [`FeedError`] - Error taxonomy for the engine

pub mod enums;
pub mod error;
pub mod level;
pub mod level1;
pub mod messages;
pub mod security;

// Re-export commonly used types
pub use enums::*;
pub use error::*;
pub use level::*;
pub use level1::*;
pub use messages::*;
pub use security::*;

// Re-export rust_decimal for users
pub use rust_decimal::Decimal;
