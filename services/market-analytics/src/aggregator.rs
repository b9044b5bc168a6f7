//! Trade-to-candle aggregation
//!
//! Maintains one in-progress candle per (instrument, timeframe) series
//! and seals it into that series' history buffer the moment a trade
//! lands in a later period. Sealed candles are immutable.
//!
//! Out-of-order trades are rejected as an error rather than silently
//! rewriting a sealed period: per-series ordering is an upstream
//! delivery guarantee, and a violation means the feed is broken.
//!
//! All per-series state sits behind a single mutex; history buffers are
//! shared via `Arc` so historical queries run against the buffer's own
//! lock without holding the aggregator lock.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tracing::{debug, warn};
use types::errors::ConfigError;
use types::ids::InstrumentId;
use types::trade::Trade;

use crate::buffer::{BufferError, CircularBuffer};
use crate::candles::{Candle, Timeframe};

/// Aggregation failures. Validation failures never reach here; these
/// indicate contract violations by the caller or the upstream feed.
#[derive(Debug, Error)]
pub enum AggregationError {
    #[error("trade has an empty instrument identifier")]
    EmptyInstrument,
    #[error(
        "out-of-order trade for {instrument}: timestamp {timestamp} precedes last seen {last_timestamp}"
    )]
    OutOfOrderTrade {
        instrument: InstrumentId,
        timestamp: i64,
        last_timestamp: i64,
    },
    #[error("history buffer error: {0}")]
    History(#[from] BufferError),
}

/// One (instrument, timeframe) candle series.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SeriesKey {
    pub instrument: InstrumentId,
    pub timeframe: Timeframe,
}

/// Aggregator configuration; validated at construction.
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Timeframes to build per instrument.
    pub timeframes: Vec<Timeframe>,
    /// Sealed candles retained per series.
    pub history_capacity: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            timeframes: Timeframe::all().to_vec(),
            history_capacity: 1000,
        }
    }
}

impl AggregatorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeframes.is_empty() {
            return Err(ConfigError::InvalidTimeframes {
                reason: "at least one timeframe is required".to_string(),
            });
        }
        let mut seen = self.timeframes.clone();
        seen.sort();
        seen.dedup();
        if seen.len() != self.timeframes.len() {
            return Err(ConfigError::InvalidTimeframes {
                reason: "duplicate timeframe".to_string(),
            });
        }
        if self.history_capacity == 0 {
            return Err(ConfigError::InvalidCapacity {
                value: self.history_capacity,
            });
        }
        Ok(())
    }
}

struct SeriesState {
    current: Option<Candle>,
    history: Arc<CircularBuffer<Candle>>,
}

struct AggregatorState {
    series: BTreeMap<SeriesKey, SeriesState>,
    /// Last accepted trade timestamp per instrument, for ordering checks.
    last_seen: BTreeMap<InstrumentId, i64>,
}

/// Builds OHLCV candles from a validated trade stream across all
/// configured timeframes simultaneously.
pub struct MarketDataAggregator {
    config: AggregatorConfig,
    state: Mutex<AggregatorState>,
}

impl MarketDataAggregator {
    /// Create an aggregator with the given configuration.
    pub fn new(config: AggregatorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            state: Mutex::new(AggregatorState {
                series: BTreeMap::new(),
                last_seen: BTreeMap::new(),
            }),
        })
    }

    /// Create an aggregator tracking all standard timeframes.
    pub fn with_defaults() -> Self {
        Self {
            config: AggregatorConfig::default(),
            state: Mutex::new(AggregatorState {
                series: BTreeMap::new(),
                last_seen: BTreeMap::new(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, AggregatorState> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Process one validated trade.
    ///
    /// Returns, per configured timeframe, the candle sealed by this
    /// trade (`None` when the trade landed inside the in-progress
    /// period). The ordering check runs before any state mutation, so a
    /// rejected trade leaves every series untouched.
    pub fn process_trade(
        &self,
        trade: &Trade,
    ) -> Result<BTreeMap<Timeframe, Option<Candle>>, AggregationError> {
        if trade.instrument.is_empty() {
            return Err(AggregationError::EmptyInstrument);
        }

        let mut state = self.lock();

        if let Some(&last) = state.last_seen.get(&trade.instrument) {
            if trade.timestamp < last {
                warn!(
                    instrument = %trade.instrument,
                    timestamp = trade.timestamp,
                    last_timestamp = last,
                    "rejecting out-of-order trade"
                );
                return Err(AggregationError::OutOfOrderTrade {
                    instrument: trade.instrument.clone(),
                    timestamp: trade.timestamp,
                    last_timestamp: last,
                });
            }
        }
        state.last_seen.insert(trade.instrument.clone(), trade.timestamp);

        let mut completions = BTreeMap::new();
        for &timeframe in &self.config.timeframes {
            let key = SeriesKey {
                instrument: trade.instrument.clone(),
                timeframe,
            };
            let entry = state.series.entry(key).or_insert_with(|| SeriesState {
                current: None,
                history: Arc::new(CircularBuffer::new(self.config.history_capacity)),
            });

            let boundary = timeframe.align_to_boundary(trade.timestamp);
            let sealed = match &mut entry.current {
                Some(candle) if candle.open_time == boundary => {
                    candle.update(trade.price, trade.quantity);
                    None
                }
                current => {
                    let sealed = current.take();
                    *current = Some(Candle::new(
                        trade.instrument.clone(),
                        timeframe,
                        boundary,
                        trade.price,
                        trade.quantity,
                    ));
                    if let Some(candle) = &sealed {
                        debug!(
                            instrument = %candle.instrument,
                            timeframe = candle.timeframe.label(),
                            open_time = candle.open_time,
                            trades = candle.trade_count,
                            "candle sealed"
                        );
                        entry.history.append(candle.clone())?;
                    }
                    sealed
                }
            };
            completions.insert(timeframe, sealed);
        }

        Ok(completions)
    }

    /// Current (in-progress) candle for a series, if one exists.
    pub fn get_ohlcv_data(
        &self,
        timeframe: Timeframe,
        instrument: &InstrumentId,
    ) -> Option<Candle> {
        let state = self.lock();
        state
            .series
            .get(&SeriesKey {
                instrument: instrument.clone(),
                timeframe,
            })
            .and_then(|s| s.current.clone())
    }

    /// Up to `limit` sealed candles for a series, newest-first.
    pub fn get_historical_ohlcv(
        &self,
        timeframe: Timeframe,
        limit: usize,
        instrument: &InstrumentId,
    ) -> Vec<Candle> {
        let history = {
            let state = self.lock();
            state
                .series
                .get(&SeriesKey {
                    instrument: instrument.clone(),
                    timeframe,
                })
                .map(|s| Arc::clone(&s.history))
        };
        match history {
            Some(buffer) => buffer.get_latest(limit).unwrap_or_default(),
            None => Vec::new(),
        }
    }

    /// All sealed candles for a timeframe across every instrument,
    /// ordered by instrument then open time.
    pub fn get_completed_candles(&self, timeframe: Timeframe) -> Vec<Candle> {
        let histories: Vec<Arc<CircularBuffer<Candle>>> = {
            let state = self.lock();
            state
                .series
                .iter()
                .filter(|(key, _)| key.timeframe == timeframe)
                .map(|(_, s)| Arc::clone(&s.history))
                .collect()
        };
        histories.iter().flat_map(|h| h.to_list()).collect()
    }

    /// Drop all state for one instrument.
    pub fn clear_market_data(&self, instrument: &InstrumentId) {
        let mut state = self.lock();
        state.series.retain(|key, _| &key.instrument != instrument);
        state.last_seen.remove(instrument);
    }

    /// Drop all state for all instruments.
    pub fn clear_all_data(&self) {
        let mut state = self.lock();
        state.series.clear();
        state.last_seen.clear();
    }

    /// Number of (instrument, timeframe) series currently tracked.
    pub fn series_count(&self) -> usize {
        self.lock().series.len()
    }

    /// Timeframes this aggregator builds.
    pub fn timeframes(&self) -> &[Timeframe] {
        &self.config.timeframes
    }
}
