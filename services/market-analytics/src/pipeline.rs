//! Pipeline facade
//!
//! Wires the quality gate, aggregator, and book analytics together and
//! times every stage through the performance monitor. One pipeline
//! instance is constructed at startup and invoked synchronously, once
//! per inbound event, by the external ingestion loop.
//!
//! Validation failures are returned as data and never abort processing;
//! only contract violations (out-of-order feed) surface as `Err`.

use std::collections::BTreeMap;

use tracing::{debug, info};
use types::errors::ConfigError;

use crate::aggregator::{AggregationError, AggregatorConfig, MarketDataAggregator};
use crate::candles::{Candle, Timeframe};
use crate::events::MarketEvent;
use crate::monitor::{component, MonitorConfig, PerformanceMonitor, PerformanceReport};
use crate::orderbook::{
    BookAnalyticsConfig, DepthAnalysis, OrderbookProcessor, SpreadAnalysis, SpreadClass,
};
use crate::validator::{DataValidator, QualityReport, ValidationResult, ValidatorConfig};

/// Configuration for every pipeline stage.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub validator: ValidatorConfig,
    pub analytics: BookAnalyticsConfig,
    pub aggregator: AggregatorConfig,
    pub monitor: MonitorConfig,
}

/// Result of processing one event.
#[derive(Debug)]
pub enum PipelineOutcome {
    /// The event failed validation and was not processed further.
    Rejected(ValidationResult),
    /// A trade passed the gate and was aggregated.
    Trade {
        validation: ValidationResult,
        /// Candles sealed by this trade, per timeframe.
        completed: BTreeMap<Timeframe, Option<Candle>>,
    },
    /// An order-book snapshot passed the gate and was analyzed.
    Orderbook {
        validation: ValidationResult,
        spread: SpreadAnalysis,
        depth: DepthAnalysis,
        spread_class: SpreadClass,
    },
}

impl PipelineOutcome {
    /// Whether the event was rejected by the quality gate.
    pub fn is_rejected(&self) -> bool {
        matches!(self, PipelineOutcome::Rejected(_))
    }
}

/// The full analytics pipeline: validate, route, time, report.
pub struct MarketDataPipeline {
    validator: DataValidator,
    aggregator: MarketDataAggregator,
    processor: OrderbookProcessor,
    monitor: PerformanceMonitor,
}

impl MarketDataPipeline {
    /// Build a pipeline; every stage validates its configuration and
    /// fails fast on a bad value.
    pub fn new(config: PipelineConfig) -> Result<Self, ConfigError> {
        let pipeline = Self {
            validator: DataValidator::new(config.validator)?,
            aggregator: MarketDataAggregator::new(config.aggregator)?,
            processor: OrderbookProcessor::new(config.analytics)?,
            monitor: PerformanceMonitor::new(config.monitor)?,
        };
        info!("market-data pipeline initialized");
        Ok(pipeline)
    }

    /// Build a pipeline with default configuration throughout.
    pub fn with_defaults() -> Self {
        Self {
            validator: DataValidator::with_defaults(),
            aggregator: MarketDataAggregator::with_defaults(),
            processor: OrderbookProcessor::with_defaults(),
            monitor: PerformanceMonitor::with_defaults(),
        }
    }

    /// Process one inbound event through validation and the matching
    /// analytics stage.
    pub fn process_event(
        &self,
        event: &MarketEvent,
    ) -> Result<PipelineOutcome, AggregationError> {
        let timer = self.monitor.start_timer(component::VALIDATION);
        let validation = match event {
            MarketEvent::Trade(trade) => self.validator.validate_trade(trade),
            MarketEvent::Orderbook(book) => self.validator.validate_orderbook(book),
        };
        self.monitor.end_timer(component::VALIDATION, timer);
        self.monitor.record_throughput(component::VALIDATION, 1);

        if !validation.is_valid {
            debug!(
                instrument = %event.instrument(),
                event_type = event.event_type_label(),
                errors = validation.errors.len(),
                "event rejected by quality gate"
            );
            return Ok(PipelineOutcome::Rejected(validation));
        }

        match event {
            MarketEvent::Trade(trade) => {
                let timer = self.monitor.start_timer(component::AGGREGATION);
                let completed = self.aggregator.process_trade(trade)?;
                self.monitor.end_timer(component::AGGREGATION, timer);
                self.monitor.record_throughput(component::AGGREGATION, 1);

                Ok(PipelineOutcome::Trade {
                    validation,
                    completed,
                })
            }
            MarketEvent::Orderbook(book) => {
                let timer = self.monitor.start_timer(component::ORDERBOOK);
                let spread = self.processor.calculate_spread(book);
                let depth = self.processor.analyze_market_depth(book);
                let spread_class = self.processor.classify_spread(&spread);
                self.monitor.end_timer(component::ORDERBOOK, timer);
                self.monitor.record_throughput(component::ORDERBOOK, 1);

                Ok(PipelineOutcome::Orderbook {
                    validation,
                    spread,
                    depth,
                    spread_class,
                })
            }
        }
    }

    /// Data-quality summary accumulated by the gate.
    pub fn quality_report(&self) -> QualityReport {
        self.validator.generate_quality_report()
    }

    /// Latency/SLA summary across all pipeline stages.
    pub fn performance_report(&self) -> PerformanceReport {
        self.monitor.get_performance_report()
    }

    /// The aggregator, for historical candle queries.
    pub fn aggregator(&self) -> &MarketDataAggregator {
        &self.aggregator
    }

    /// The quality gate, for direct validation calls.
    pub fn validator(&self) -> &DataValidator {
        &self.validator
    }

    /// The book analytics engine, for ad-hoc calculations.
    pub fn processor(&self) -> &OrderbookProcessor {
        &self.processor
    }

    /// The performance monitor, for per-component queries.
    pub fn monitor(&self) -> &PerformanceMonitor {
        &self.monitor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use types::book::{OrderbookSnapshot, PriceLevel};
    use types::ids::InstrumentId;
    use types::trade::{Side, Trade};

    fn recent_nanos() -> i64 {
        chrono::Utc::now()
            .timestamp_nanos_opt()
            .expect("timestamp in range")
    }

    fn valid_trade(ts: i64) -> MarketEvent {
        MarketEvent::Trade(Trade::new(
            InstrumentId::new("BTC/USDT"),
            Side::BUY,
            Decimal::from(50000),
            Decimal::from(1),
            ts,
        ))
    }

    fn valid_book() -> MarketEvent {
        MarketEvent::Orderbook(OrderbookSnapshot::new(
            InstrumentId::new("BTC/USDT"),
            1,
            recent_nanos(),
            vec![PriceLevel::new(Decimal::from(49999), Decimal::from(2))],
            vec![PriceLevel::new(Decimal::from(50001), Decimal::from(1))],
        ))
    }

    #[test]
    fn test_valid_trade_flows_to_aggregator() {
        let pipeline = MarketDataPipeline::with_defaults();

        let outcome = pipeline.process_event(&valid_trade(recent_nanos())).unwrap();
        match outcome {
            PipelineOutcome::Trade { completed, .. } => {
                // First trade opens candles, seals nothing
                assert!(completed.values().all(|c| c.is_none()));
            }
            other => panic!("expected Trade outcome, got {:?}", other),
        }

        assert_eq!(pipeline.quality_report().valid_count, 1);
    }

    #[test]
    fn test_invalid_trade_is_rejected_not_aggregated() {
        let pipeline = MarketDataPipeline::with_defaults();

        let bad = MarketEvent::Trade(Trade::new(
            InstrumentId::new("BTC/USDT"),
            Side::BUY,
            Decimal::from(-1),
            Decimal::from(1),
            recent_nanos(),
        ));

        let outcome = pipeline.process_event(&bad).unwrap();
        assert!(outcome.is_rejected());

        // Nothing reached the aggregator
        let instrument = InstrumentId::new("BTC/USDT");
        assert!(pipeline
            .aggregator()
            .get_ohlcv_data(Timeframe::M1, &instrument)
            .is_none());
        assert_eq!(pipeline.quality_report().invalid_count, 1);
    }

    #[test]
    fn test_orderbook_event_yields_analytics() {
        let pipeline = MarketDataPipeline::with_defaults();

        let outcome = pipeline.process_event(&valid_book()).unwrap();
        match outcome {
            PipelineOutcome::Orderbook { spread, depth, .. } => {
                assert_eq!(spread.absolute_spread, Decimal::from(2));
                assert_eq!(depth.total_bid_volume, Decimal::from(2));
            }
            other => panic!("expected Orderbook outcome, got {:?}", other),
        }
    }

    #[test]
    fn test_stages_are_timed() {
        let pipeline = MarketDataPipeline::with_defaults();

        pipeline.process_event(&valid_trade(recent_nanos())).unwrap();
        pipeline.process_event(&valid_book()).unwrap();

        let monitor = pipeline.monitor();
        assert!(monitor.get_latency_stats(component::VALIDATION).is_some());
        assert!(monitor.get_latency_stats(component::AGGREGATION).is_some());
        assert!(monitor.get_latency_stats(component::ORDERBOOK).is_some());
    }

    #[test]
    fn test_out_of_order_feed_surfaces_error() {
        let pipeline = MarketDataPipeline::with_defaults();
        let now = recent_nanos();

        pipeline.process_event(&valid_trade(now)).unwrap();
        let result = pipeline.process_event(&valid_trade(now - 1_000_000_000));
        assert!(matches!(
            result,
            Err(AggregationError::OutOfOrderTrade { .. })
        ));
    }
}
