//! OHLCV candle primitives
//!
//! Timeframes and the candle record built from trade events. Candle
//! boundaries are aligned to epoch (e.g., 1m candles close on minute
//! boundaries, 4h candles on 4-hour multiples from UTC midnight). Uses
//! `Decimal` for all price/volume arithmetic.
//!
//! A candle is mutable while "current" (its period has not elapsed) and
//! immutable once sealed into history by the aggregator.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use types::ids::InstrumentId;

use crate::buffer::Timestamped;

/// Supported candle timeframes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timeframe {
    /// 1 minute
    M1,
    /// 5 minutes
    M5,
    /// 15 minutes
    M15,
    /// 1 hour
    H1,
    /// 4 hours
    H4,
    /// 1 day
    D1,
}

impl Timeframe {
    /// Duration of this timeframe in nanoseconds.
    pub fn duration_nanos(&self) -> i64 {
        match self {
            Timeframe::M1 => 60 * 1_000_000_000,
            Timeframe::M5 => 5 * 60 * 1_000_000_000,
            Timeframe::M15 => 15 * 60 * 1_000_000_000,
            Timeframe::H1 => 3600 * 1_000_000_000,
            Timeframe::H4 => 4 * 3600 * 1_000_000_000,
            Timeframe::D1 => 86400 * 1_000_000_000_i64,
        }
    }

    /// All standard timeframes.
    pub fn all() -> &'static [Timeframe] {
        &[
            Timeframe::M1,
            Timeframe::M5,
            Timeframe::M15,
            Timeframe::H1,
            Timeframe::H4,
            Timeframe::D1,
        ]
    }

    /// Short label used in reports and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Timeframe::M1 => "1m",
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::H1 => "1h",
            Timeframe::H4 => "4h",
            Timeframe::D1 => "1d",
        }
    }

    /// Align a timestamp to this timeframe's boundary (floor).
    pub fn align_to_boundary(&self, timestamp_nanos: i64) -> i64 {
        let duration = self.duration_nanos();
        (timestamp_nanos / duration) * duration
    }
}

/// A single OHLCV candle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    pub instrument: InstrumentId,
    pub timeframe: Timeframe,
    /// Period start (normalized to the timeframe boundary), Unix nanos.
    pub open_time: i64,
    /// Last nanosecond of the period.
    pub close_time: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    /// Cumulative traded volume within the period.
    pub volume: Decimal,
    /// Number of trades within the period.
    pub trade_count: u64,
}

impl Candle {
    /// Create a new candle from the first trade in this period.
    pub(crate) fn new(
        instrument: InstrumentId,
        timeframe: Timeframe,
        open_time: i64,
        price: Decimal,
        quantity: Decimal,
    ) -> Self {
        let close_time = open_time + timeframe.duration_nanos() - 1;
        Self {
            instrument,
            timeframe,
            open_time,
            close_time,
            open: price,
            high: price,
            low: price,
            close: price,
            volume: quantity,
            trade_count: 1,
        }
    }

    /// Update the candle with a new trade in the same period.
    pub(crate) fn update(&mut self, price: Decimal, quantity: Decimal) {
        if price > self.high {
            self.high = price;
        }
        if price < self.low {
            self.low = price;
        }
        self.close = price;
        self.volume += quantity;
        self.trade_count += 1;
    }

    /// Validate candle integrity (OHLCV invariants).
    pub fn is_valid(&self) -> bool {
        self.high >= self.open
            && self.high >= self.close
            && self.high >= self.low
            && self.low <= self.open
            && self.low <= self.close
            && self.volume >= Decimal::ZERO
            && self.close_time > self.open_time
    }
}

impl Timestamped for Candle {
    fn timestamp_nanos(&self) -> i64 {
        self.open_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn nanos(minutes: i64) -> i64 {
        minutes * 60 * 1_000_000_000
    }

    fn make_candle(price: u64, qty: u64) -> Candle {
        Candle::new(
            InstrumentId::new("BTC/USDT"),
            Timeframe::M1,
            nanos(0),
            Decimal::from(price),
            Decimal::from(qty),
        )
    }

    #[test]
    fn test_timeframe_duration() {
        assert_eq!(Timeframe::M1.duration_nanos(), 60_000_000_000);
        assert_eq!(Timeframe::H1.duration_nanos(), 3_600_000_000_000);
        assert_eq!(Timeframe::H4.duration_nanos(), 14_400_000_000_000);
        assert_eq!(Timeframe::D1.duration_nanos(), 86_400_000_000_000);
    }

    #[test]
    fn test_timeframe_alignment() {
        let ts = nanos(7) + 30_000_000_000; // 7m30s
        assert_eq!(Timeframe::M1.align_to_boundary(ts), nanos(7));
        assert_eq!(Timeframe::M5.align_to_boundary(ts), nanos(5));
        assert_eq!(Timeframe::M15.align_to_boundary(ts), nanos(0));

        // 4h alignment floors the hour to a multiple of 4
        let six_hours = nanos(6 * 60);
        assert_eq!(Timeframe::H4.align_to_boundary(six_hours), nanos(4 * 60));
    }

    #[test]
    fn test_timeframe_labels() {
        assert_eq!(Timeframe::M1.label(), "1m");
        assert_eq!(Timeframe::D1.label(), "1d");
        assert_eq!(Timeframe::all().len(), 6);
    }

    #[test]
    fn test_candle_creation() {
        let candle = make_candle(50000, 1);

        assert_eq!(candle.open, Decimal::from(50000));
        assert_eq!(candle.high, Decimal::from(50000));
        assert_eq!(candle.low, Decimal::from(50000));
        assert_eq!(candle.close, Decimal::from(50000));
        assert_eq!(candle.trade_count, 1);
        assert!(candle.is_valid());
    }

    #[test]
    fn test_candle_update() {
        let mut candle = make_candle(50000, 1);

        candle.update(Decimal::from(51000), Decimal::from(2)); // New high
        candle.update(Decimal::from(49000), Decimal::from(3)); // New low
        candle.update(Decimal::from(50500), Decimal::from(1)); // Close

        assert_eq!(candle.open, Decimal::from(50000));
        assert_eq!(candle.high, Decimal::from(51000));
        assert_eq!(candle.low, Decimal::from(49000));
        assert_eq!(candle.close, Decimal::from(50500));
        assert_eq!(candle.volume, Decimal::from(7));
        assert_eq!(candle.trade_count, 4);
        assert!(candle.is_valid());
    }

    #[test]
    fn test_candle_integrity_validation() {
        let valid = make_candle(50000, 1);
        assert!(valid.is_valid());

        let mut invalid = make_candle(50000, 1);
        invalid.high = Decimal::from(49000); // High < Open
        assert!(!invalid.is_valid());
    }

    #[test]
    fn test_candle_timestamped_by_open_time() {
        let candle = make_candle(50000, 1);
        assert_eq!(candle.timestamp_nanos(), nanos(0));
    }

    #[test]
    fn test_candle_serialization() {
        let candle = make_candle(50000, 1);
        let json = serde_json::to_string(&candle).unwrap();
        let deserialized: Candle = serde_json::from_str(&json).unwrap();
        assert_eq!(candle, deserialized);
    }

    proptest! {
        // high >= max(open, low, close) and low <= min(open, high, close)
        // after any sequence of updates
        #[test]
        fn prop_ohlcv_invariants_hold(
            prices in proptest::collection::vec(1u64..1_000_000, 1..64),
        ) {
            let mut candle = make_candle(prices[0], 1);
            for &p in &prices[1..] {
                candle.update(Decimal::from(p), Decimal::from(1u64));
            }
            prop_assert!(candle.is_valid());
            prop_assert_eq!(candle.trade_count, prices.len() as u64);
        }
    }
}
