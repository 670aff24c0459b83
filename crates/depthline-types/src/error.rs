//! Error types for the depthline engine

use crate::enums::{BookState, Side};
use crate::security::SecurityId;
use rust_decimal::Decimal;
use thiserror::Error;

/// Main error type for depthline operations
#[derive(Error, Debug)]
pub enum FeedError {
    // === Algebra contract violations ===
    /// The same price appears twice on one side (data-feed or programming error)
    #[error("duplicate price {price} on the {side:?} side")]
    DuplicatePrice { side: Side, price: Decimal },

    /// Operation requires a final book (self-contained or SnapshotComplete)
    #[error("operation requires a final book, got state {state:?}")]
    NotFinal { state: Option<BookState> },

    /// Level was not produced by grouping (no inner quotes to flatten)
    #[error("level at {price} has no inner quotes; book was not grouped")]
    NotGrouped { price: Decimal },

    /// Price range or price step must be strictly positive
    #[error("price range/step must be positive, got {value}")]
    InvalidPriceRange { value: Decimal },

    // === Builder failures ===
    /// Positioned update points outside the current side
    #[error("position {position} out of range for side of {len} levels")]
    InvalidPosition { position: usize, len: usize },

    /// A self-contained snapshot failed to seed a fresh builder
    #[error("builder rejected snapshot seed for {security_id}")]
    RejectedSeed {
        security_id: SecurityId,
        #[source]
        source: Box<FeedError>,
    },

    // === Holder wrap ===
    /// Diff/patch failure inside a snapshot holder
    #[error("failed to process book update for {security_id}")]
    BookProcessing {
        security_id: SecurityId,
        #[source]
        source: Box<FeedError>,
    },
}

impl FeedError {
    /// Wrap a failure into the holder-level processing error
    pub fn book_processing(security_id: SecurityId, source: FeedError) -> Self {
        Self::BookProcessing {
            security_id,
            source: Box::new(source),
        }
    }

    /// Wrap a failure into the seed-rejection error
    pub fn rejected_seed(security_id: SecurityId, source: FeedError) -> Self {
        Self::RejectedSeed {
            security_id,
            source: Box::new(source),
        }
    }
}

/// Result type alias for depthline operations
pub type FeedResult<T> = Result<T, FeedError>;
