//! Typed input events for the analytics pipeline
//!
//! The upstream transport decodes raw exchange frames into one of these
//! variants before handing them to the pipeline; this crate never sees
//! wire bytes. Every event carries a Unix-nanosecond timestamp; book
//! snapshots additionally carry a monotonic per-feed sequence number.

use serde::{Deserialize, Serialize};
use types::book::OrderbookSnapshot;
use types::ids::InstrumentId;
use types::trade::Trade;

/// A single market-data event as delivered by the upstream feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum MarketEvent {
    /// A trade execution.
    Trade(Trade),
    /// A full order-book snapshot.
    Orderbook(OrderbookSnapshot),
}

impl MarketEvent {
    /// Instrument the event belongs to.
    pub fn instrument(&self) -> &InstrumentId {
        match self {
            MarketEvent::Trade(trade) => &trade.instrument,
            MarketEvent::Orderbook(book) => &book.instrument,
        }
    }

    /// Event timestamp in Unix nanoseconds.
    pub fn timestamp(&self) -> i64 {
        match self {
            MarketEvent::Trade(trade) => trade.timestamp,
            MarketEvent::Orderbook(book) => book.timestamp,
        }
    }

    /// Event type as a string label for logging.
    pub fn event_type_label(&self) -> &'static str {
        match self {
            MarketEvent::Trade(_) => "Trade",
            MarketEvent::Orderbook(_) => "Orderbook",
        }
    }
}
