//! Order book snapshot input records
//!
//! An [`OrderbookSnapshot`] is a point-in-time view of resting bid and
//! ask price levels, delivered pre-parsed by the upstream collaborator.
//! Bids are expected best-first (strictly descending by price), asks
//! best-first (strictly ascending); the type only fixes field shapes.
//! Ordering, positive prices, and the non-crossed invariant are
//! validation concerns, not construction invariants.

use crate::ids::InstrumentId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single price level in an order book snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    /// The price of this level.
    pub price: Decimal,
    /// Total resting quantity at this level.
    pub quantity: Decimal,
}

impl PriceLevel {
    /// Create a new price level.
    pub fn new(price: Decimal, quantity: Decimal) -> Self {
        Self { price, quantity }
    }

    /// Notional value of this level (price × quantity).
    pub fn notional(&self) -> Decimal {
        self.price * self.quantity
    }
}

/// A point-in-time order book snapshot for a single instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderbookSnapshot {
    /// Trading pair this snapshot is for.
    pub instrument: InstrumentId,
    /// Monotonically non-decreasing snapshot sequence number.
    pub sequence: u64,
    /// Snapshot timestamp (Unix nanos, exchange clock).
    pub timestamp: i64,
    /// Bid levels, best first (strictly descending by price).
    pub bids: Vec<PriceLevel>,
    /// Ask levels, best first (strictly ascending by price).
    pub asks: Vec<PriceLevel>,
}

impl OrderbookSnapshot {
    /// Create a new snapshot from pre-ordered level lists.
    pub fn new(
        instrument: InstrumentId,
        sequence: u64,
        timestamp: i64,
        bids: Vec<PriceLevel>,
        asks: Vec<PriceLevel>,
    ) -> Self {
        Self {
            instrument,
            sequence,
            timestamp,
            bids,
            asks,
        }
    }

    /// Best (highest) bid level, if any.
    pub fn best_bid(&self) -> Option<&PriceLevel> {
        self.bids.first()
    }

    /// Best (lowest) ask level, if any.
    pub fn best_ask(&self) -> Option<&PriceLevel> {
        self.asks.first()
    }

    /// Whether both sides are empty.
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// Whether exactly one side has levels.
    pub fn is_one_sided(&self) -> bool {
        self.bids.is_empty() != self.asks.is_empty()
    }
}
