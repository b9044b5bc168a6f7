//! Order-book analytics
//!
//! Computes spread, depth, imbalance, and volume-weighted price metrics
//! from a single validated snapshot. All computation is pure and
//! stateless per call, uses `Decimal` arithmetic throughout, and stays
//! well under the 5ms budget for books of ≤100 levels per side.
//!
//! Edge-case policy: an empty book yields all-zero analysis rather than
//! an error; a one-sided book yields the available best price and zero
//! spread/mid fields; a zero denominator yields the positive-infinity
//! sentinel (`Decimal::MAX`) instead of raising. Thin books are
//! expected conditions, not bugs.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use types::book::{OrderbookSnapshot, PriceLevel};
use types::errors::ConfigError;
use types::numeric::safe_ratio;

/// Spread metrics computed from the top of the book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpreadAnalysis {
    /// Best bid price, zero when the bid side is empty.
    pub bid: Decimal,
    /// Best ask price, zero when the ask side is empty.
    pub ask: Decimal,
    /// ask − bid; zero unless both sides are present.
    pub absolute_spread: Decimal,
    /// Spread as a percentage of the mid price.
    pub percentage_spread: Decimal,
    /// (bid + ask) / 2; zero unless both sides are present.
    pub mid_price: Decimal,
    /// Mid weighted by opposite-side top-of-book volume (microprice).
    pub volume_weighted_mid_price: Decimal,
}

impl SpreadAnalysis {
    fn zero() -> Self {
        Self {
            bid: Decimal::ZERO,
            ask: Decimal::ZERO,
            absolute_spread: Decimal::ZERO,
            percentage_spread: Decimal::ZERO,
            mid_price: Decimal::ZERO,
            volume_weighted_mid_price: Decimal::ZERO,
        }
    }
}

/// Aggregate liquidity metrics across the whole snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthAnalysis {
    pub total_bid_volume: Decimal,
    pub total_ask_volume: Decimal,
    /// bid volume / ask volume; positive-infinity sentinel on zero asks.
    pub bid_ask_ratio: Decimal,
    /// (bid − ask) / (bid + ask), in [-1, 1].
    pub volume_imbalance: Decimal,
    /// Notional resting within ±5% of the mid price.
    pub liquidity_within_5pct: Decimal,
    /// Notional resting within ±10% of the mid price.
    pub liquidity_within_10pct: Decimal,
}

impl DepthAnalysis {
    fn zero() -> Self {
        Self {
            total_bid_volume: Decimal::ZERO,
            total_ask_volume: Decimal::ZERO,
            bid_ask_ratio: Decimal::ZERO,
            volume_imbalance: Decimal::ZERO,
            liquidity_within_5pct: Decimal::ZERO,
            liquidity_within_10pct: Decimal::ZERO,
        }
    }
}

/// Spread regime relative to the configured thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpreadClass {
    Tight,
    Normal,
    Wide,
}

/// Analytics configuration; validated at construction.
#[derive(Debug, Clone)]
pub struct BookAnalyticsConfig {
    /// Spread at or below this many basis points classifies as tight.
    pub tight_spread_bps: Decimal,
    /// Spread at or above this many basis points classifies as wide.
    pub wide_spread_bps: Decimal,
}

impl Default for BookAnalyticsConfig {
    fn default() -> Self {
        Self {
            tight_spread_bps: Decimal::from(5),
            wide_spread_bps: Decimal::from(50),
        }
    }
}

impl BookAnalyticsConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tight_spread_bps <= Decimal::ZERO
            || self.wide_spread_bps <= self.tight_spread_bps
        {
            return Err(ConfigError::InvalidThreshold {
                name: "spread_bps".to_string(),
                value: format!(
                    "tight {} / wide {}",
                    self.tight_spread_bps, self.wide_spread_bps
                ),
            });
        }
        Ok(())
    }
}

/// Stateless order-book metrics engine.
pub struct OrderbookProcessor {
    config: BookAnalyticsConfig,
}

impl OrderbookProcessor {
    /// Create a processor with the given thresholds.
    pub fn new(config: BookAnalyticsConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Create a processor with default thresholds.
    pub fn with_defaults() -> Self {
        Self {
            config: BookAnalyticsConfig::default(),
        }
    }

    /// Spread metrics from the best bid and ask.
    pub fn calculate_spread(&self, book: &OrderbookSnapshot) -> SpreadAnalysis {
        match (book.best_bid(), book.best_ask()) {
            (None, None) => SpreadAnalysis::zero(),
            (Some(bid), None) => SpreadAnalysis {
                bid: bid.price,
                ..SpreadAnalysis::zero()
            },
            (None, Some(ask)) => SpreadAnalysis {
                ask: ask.price,
                ..SpreadAnalysis::zero()
            },
            (Some(bid), Some(ask)) => {
                let absolute_spread = ask.price - bid.price;
                let mid_price = (bid.price + ask.price) / Decimal::from(2);
                let percentage_spread =
                    safe_ratio(absolute_spread, mid_price) * Decimal::from(100);

                // Microprice: each side weighted by the opposite side's
                // top-of-book quantity.
                let top_volume = bid.quantity + ask.quantity;
                let volume_weighted_mid_price = if top_volume.is_zero() {
                    mid_price
                } else {
                    (bid.price * ask.quantity + ask.price * bid.quantity) / top_volume
                };

                SpreadAnalysis {
                    bid: bid.price,
                    ask: ask.price,
                    absolute_spread,
                    percentage_spread,
                    mid_price,
                    volume_weighted_mid_price,
                }
            }
        }
    }

    /// Aggregate depth and liquidity metrics across all levels.
    pub fn analyze_market_depth(&self, book: &OrderbookSnapshot) -> DepthAnalysis {
        if book.is_empty() {
            return DepthAnalysis::zero();
        }

        let total_bid_volume: Decimal = book.bids.iter().map(|l| l.quantity).sum();
        let total_ask_volume: Decimal = book.asks.iter().map(|l| l.quantity).sum();

        let bid_ask_ratio = safe_ratio(total_bid_volume, total_ask_volume);
        let volume_imbalance = Self::imbalance(total_bid_volume, total_ask_volume);

        let mid = self.calculate_spread(book).mid_price;
        let (liquidity_within_5pct, liquidity_within_10pct) = if mid.is_zero() {
            (Decimal::ZERO, Decimal::ZERO)
        } else {
            (
                Self::liquidity_within(book, mid, Decimal::new(5, 2)),
                Self::liquidity_within(book, mid, Decimal::new(10, 2)),
            )
        };

        DepthAnalysis {
            total_bid_volume,
            total_ask_volume,
            bid_ask_ratio,
            volume_imbalance,
            liquidity_within_5pct,
            liquidity_within_10pct,
        }
    }

    /// Volume-weighted average price over the first `depth` levels.
    ///
    /// The caller supplies levels already ordered best-first; zero total
    /// volume in the slice yields zero.
    pub fn calculate_vwap(&self, levels: &[PriceLevel], depth: usize) -> Decimal {
        let slice = &levels[..depth.min(levels.len())];

        let total_volume: Decimal = slice.iter().map(|l| l.quantity).sum();
        if total_volume.is_zero() {
            return Decimal::ZERO;
        }

        let total_notional: Decimal = slice.iter().map(|l| l.notional()).sum();
        total_notional / total_volume
    }

    /// Bucket levels into tick-size bins, preserving total volume and
    /// the input sort direction. A non-positive tick size returns the
    /// input unchanged.
    pub fn aggregate_price_levels(
        &self,
        levels: &[PriceLevel],
        tick_size: Decimal,
    ) -> Vec<PriceLevel> {
        if tick_size <= Decimal::ZERO || levels.len() < 2 {
            return levels.to_vec();
        }

        let mut bins: BTreeMap<Decimal, Decimal> = BTreeMap::new();
        for level in levels {
            let bucket = (level.price / tick_size).floor() * tick_size;
            *bins.entry(bucket).or_insert(Decimal::ZERO) += level.quantity;
        }

        let descending = levels[0].price > levels[levels.len() - 1].price;
        let collected: Vec<PriceLevel> = bins
            .into_iter()
            .map(|(price, quantity)| PriceLevel::new(price, quantity))
            .collect();

        if descending {
            collected.into_iter().rev().collect()
        } else {
            collected
        }
    }

    /// Volume imbalance across the whole book, in [-1, 1].
    pub fn calculate_imbalance(&self, book: &OrderbookSnapshot) -> Decimal {
        let bid_volume: Decimal = book.bids.iter().map(|l| l.quantity).sum();
        let ask_volume: Decimal = book.asks.iter().map(|l| l.quantity).sum();
        Self::imbalance(bid_volume, ask_volume)
    }

    /// Classify a spread against the configured thresholds.
    pub fn classify_spread(&self, analysis: &SpreadAnalysis) -> SpreadClass {
        // percentage_spread is in percent; thresholds are basis points
        let spread_bps = analysis.percentage_spread * Decimal::from(100);

        if spread_bps <= self.config.tight_spread_bps {
            SpreadClass::Tight
        } else if spread_bps >= self.config.wide_spread_bps {
            SpreadClass::Wide
        } else {
            SpreadClass::Normal
        }
    }

    fn imbalance(bid_volume: Decimal, ask_volume: Decimal) -> Decimal {
        let total = bid_volume + ask_volume;
        if total.is_zero() {
            Decimal::ZERO
        } else {
            (bid_volume - ask_volume) / total
        }
    }

    /// Total notional resting within ±`pct` of the mid price.
    fn liquidity_within(book: &OrderbookSnapshot, mid: Decimal, pct: Decimal) -> Decimal {
        let lower = mid * (Decimal::ONE - pct);
        let upper = mid * (Decimal::ONE + pct);

        let bid_liquidity: Decimal = book
            .bids
            .iter()
            .filter(|l| l.price >= lower)
            .map(|l| l.notional())
            .sum();
        let ask_liquidity: Decimal = book
            .asks
            .iter()
            .filter(|l| l.price <= upper)
            .map(|l| l.notional())
            .sum();

        bid_liquidity + ask_liquidity
    }
}
