//! Trade execution input records
//!
//! A [`Trade`] is an untrusted, read-only record delivered by the
//! upstream ingestion collaborator, one per exchange execution event.
//! Field coherence (positive price/quantity, precision limits, clock
//! tolerance) is the validator's concern; the record itself only fixes
//! the shape. Timestamps are Unix nanoseconds on the exchange clock,
//! UTC.

use crate::ids::{InstrumentId, TradeId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Trade side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    BUY,
    SELL,
}

impl Side {
    /// Get the opposite side
    pub fn opposite(&self) -> Side {
        match self {
            Side::BUY => Side::SELL,
            Side::SELL => Side::BUY,
        }
    }

    /// Lowercase label for logging and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::BUY => "buy",
            Side::SELL => "sell",
        }
    }
}

/// A single trade execution as received from the upstream feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    /// Unique trade identifier.
    pub trade_id: TradeId,
    /// Trading pair the execution happened on.
    pub instrument: InstrumentId,
    /// Taker side of the execution.
    pub side: Side,
    /// Execution price.
    pub price: Decimal,
    /// Executed quantity.
    pub quantity: Decimal,
    /// Execution timestamp (Unix nanos, exchange clock).
    pub timestamp: i64,
}

impl Trade {
    /// Create a new trade record.
    pub fn new(
        instrument: InstrumentId,
        side: Side,
        price: Decimal,
        quantity: Decimal,
        timestamp: i64,
    ) -> Self {
        Self {
            trade_id: TradeId::new(),
            instrument,
            side,
            price,
            quantity,
            timestamp,
        }
    }

    /// Trade notional value (price × quantity).
    pub fn notional(&self) -> Decimal {
        self.price * self.quantity
    }

    /// Execution timestamp as a UTC datetime.
    pub fn datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_nanos(self.timestamp)
    }
}
