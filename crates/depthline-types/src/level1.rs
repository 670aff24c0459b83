//! Level1 (best-of-market) field change sets

use crate::enums::{DataKind, Side};
use crate::security::SecurityId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Level1 field tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level1Field {
    /// Best bid price
    BestBidPrice,
    /// Best bid volume
    BestBidVolume,
    /// Best ask price
    BestAskPrice,
    /// Best ask volume
    BestAskVolume,
    /// Last trade numeric id
    LastTradeId,
    /// Last trade string id
    LastTradeStringId,
    /// Last trade price
    LastTradePrice,
    /// Last trade volume
    LastTradeVolume,
    /// Last trade time
    LastTradeTime,
    /// Last trade was an up-tick
    LastTradeUpDown,
    /// Aggressor side of the last trade
    LastTradeOrigin,
    /// Open interest
    OpenInterest,
    /// Session open price
    OpenPrice,
    /// Session high price
    HighPrice,
    /// Session low price
    LowPrice,
    /// Session close price
    ClosePrice,
    /// Volume-weighted average price
    Vwap,
}

/// Untyped level1 field value
///
/// Compared by value equality when diffing change sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Level1Value {
    /// Decimal value (prices, volumes)
    Decimal(Decimal),
    /// Integer value (ids, counts)
    Int(i64),
    /// Boolean flag
    Bool(bool),
    /// Trade side
    Side(Side),
    /// Timestamp
    Time(DateTime<Utc>),
    /// Free-form string (string trade ids)
    Text(String),
}

impl Level1Value {
    /// Get the decimal payload, if this value is one
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Self::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    /// Get the integer payload, if this value is one
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get the boolean payload, if this value is one
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the side payload, if this value is one
    pub fn as_side(&self) -> Option<Side> {
        match self {
            Self::Side(s) => Some(*s),
            _ => None,
        }
    }

    /// Get the timestamp payload, if this value is one
    pub fn as_time(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Time(t) => Some(*t),
            _ => None,
        }
    }

    /// Get the string payload, if this value is one
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<Decimal> for Level1Value {
    fn from(d: Decimal) -> Self {
        Self::Decimal(d)
    }
}

impl From<i64> for Level1Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<bool> for Level1Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Side> for Level1Value {
    fn from(s: Side) -> Self {
        Self::Side(s)
    }
}

impl From<DateTime<Utc>> for Level1Value {
    fn from(t: DateTime<Utc>) -> Self {
        Self::Time(t)
    }
}

impl From<String> for Level1Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// A set of level1 field changes for one instrument
///
/// Keys are unique; insertion order is irrelevant. An empty change set
/// carries no information and downstream code treats it as a no-op.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level1Change {
    /// Instrument identifier
    pub security_id: SecurityId,
    /// Venue timestamp
    pub server_time: DateTime<Utc>,
    /// Local receive timestamp
    pub local_time: DateTime<Utc>,
    /// Data type this message was derived from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_from: Option<DataKind>,
    /// Field-tag to value mapping
    pub changes: BTreeMap<Level1Field, Level1Value>,
}

impl Level1Change {
    /// Create an empty change set
    pub fn new(security_id: SecurityId, server_time: DateTime<Utc>) -> Self {
        Self {
            security_id,
            server_time,
            local_time: server_time,
            build_from: None,
            changes: BTreeMap::new(),
        }
    }

    /// Set the local receive timestamp
    pub fn with_local_time(mut self, local_time: DateTime<Utc>) -> Self {
        self.local_time = local_time;
        self
    }

    /// Set the build-from provenance
    pub fn with_build_from(mut self, kind: DataKind) -> Self {
        self.build_from = Some(kind);
        self
    }

    /// Add a field value, skipping `None` (builder style)
    pub fn try_add(mut self, field: Level1Field, value: Option<impl Into<Level1Value>>) -> Self {
        if let Some(value) = value {
            self.changes.insert(field, value.into());
        }
        self
    }

    /// Add a field value
    pub fn add(self, field: Level1Field, value: impl Into<Level1Value>) -> Self {
        self.try_add(field, Some(value))
    }

    /// Get a field value
    pub fn get(&self, field: Level1Field) -> Option<&Level1Value> {
        self.changes.get(&field)
    }

    /// Get a decimal field value
    pub fn get_decimal(&self, field: Level1Field) -> Option<Decimal> {
        self.get(field).and_then(Level1Value::as_decimal)
    }

    /// True when the change set carries at least one field
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    /// True when the change set carries tick (last trade) data
    pub fn contains_tick(&self) -> bool {
        self.changes.contains_key(&Level1Field::LastTradePrice)
    }

    /// True when the change set carries best bid or ask data
    pub fn contains_quotes(&self) -> bool {
        self.changes.contains_key(&Level1Field::BestBidPrice)
            || self.changes.contains_key(&Level1Field::BestAskPrice)
    }
}
