//! Unique identifier types for market-data entities
//!
//! Trade identifiers use UUID v7 for time-sortable ordering, enabling
//! efficient chronological queries. Instrument identifiers carry the
//! raw "BASE/QUOTE" symbol as delivered by the upstream feed; shape
//! validation is a data-quality concern owned by the validator, not a
//! construction invariant.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a trade execution
///
/// Uses UUID v7 for time-based sorting. Trades can be efficiently
/// queried in chronological order using the embedded timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TradeId(Uuid);

impl TradeId {
    /// Create a new TradeId with current timestamp
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Create from existing UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The nil (all-zero) identifier, standing in for a missing id.
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }

    /// Get inner UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Whether this is the nil (all-zero) identifier.
    ///
    /// A nil id indicates a record that arrived without a usable
    /// identifier; the validator treats it as a missing field.
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl Default for TradeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Instrument identifier (trading pair)
///
/// Format: "BASE/QUOTE" (e.g., "BTC/USDT", "ETH/USDC"). The constructor
/// accepts any string: inputs are untrusted wire records, and the
/// validator owns the shape check via [`InstrumentId::is_well_formed`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstrumentId(String);

impl InstrumentId {
    /// Create a new InstrumentId from a string
    pub fn new(symbol: impl Into<String>) -> Self {
        Self(symbol.into())
    }

    /// Get the symbol string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identifier is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check the "BASE/QUOTE" shape: exactly one '/', both tokens
    /// non-empty and alphanumeric.
    pub fn is_well_formed(&self) -> bool {
        match self.split() {
            Some((base, quote)) => {
                !base.is_empty()
                    && !quote.is_empty()
                    && base.chars().all(|c| c.is_ascii_alphanumeric())
                    && quote.chars().all(|c| c.is_ascii_alphanumeric())
            }
            None => false,
        }
    }

    /// Split into base and quote assets, if the separator is present
    pub fn split(&self) -> Option<(&str, &str)> {
        let mut parts = self.0.splitn(2, '/');
        match (parts.next(), parts.next()) {
            (Some(base), Some(quote)) if !quote.contains('/') => Some((base, quote)),
            _ => None,
        }
    }
}

impl fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for InstrumentId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trade_id_creation() {
        let id1 = TradeId::new();
        let id2 = TradeId::new();
        assert_ne!(id1, id2, "TradeIds should be unique");
        assert!(!id1.is_nil());
    }

    #[test]
    fn test_trade_id_nil() {
        let nil = TradeId::nil();
        assert!(nil.is_nil());
        assert_eq!(nil, TradeId::from_uuid(Uuid::nil()));
        assert!(!TradeId::new().is_nil());
    }

    #[test]
    fn test_trade_id_serialization() {
        let id = TradeId::new();
        let json = serde_json::to_string(&id).unwrap();
        let deserialized: TradeId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }

    #[test]
    fn test_instrument_id_creation() {
        let instrument = InstrumentId::new("BTC/USDT");
        assert_eq!(instrument.as_str(), "BTC/USDT");

        let (base, quote) = instrument.split().unwrap();
        assert_eq!(base, "BTC");
        assert_eq!(quote, "USDT");
    }

    #[test]
    fn test_instrument_id_shape_check() {
        assert!(InstrumentId::new("BTC/USDT").is_well_formed());
        assert!(InstrumentId::new("ETH/USDC").is_well_formed());
        assert!(!InstrumentId::new("INVALID").is_well_formed());
        assert!(!InstrumentId::new("").is_well_formed());
        assert!(!InstrumentId::new("/USDT").is_well_formed());
        assert!(!InstrumentId::new("BTC/").is_well_formed());
        assert!(!InstrumentId::new("BTC/US/DT").is_well_formed());
        assert!(!InstrumentId::new("BTC-USDT").is_well_formed());
    }

    #[test]
    fn test_instrument_id_accepts_malformed_input() {
        // Construction never rejects; the validator owns the shape check
        let raw = InstrumentId::new("garbage");
        assert!(!raw.is_empty());
        assert!(!raw.is_well_formed());
    }

    #[test]
    fn test_instrument_id_serialization() {
        let instrument = InstrumentId::new("ETH/USDC");
        let json = serde_json::to_string(&instrument).unwrap();
        assert_eq!(json, "\"ETH/USDC\"");

        let deserialized: InstrumentId = serde_json::from_str(&json).unwrap();
        assert_eq!(instrument, deserialized);
    }
}
