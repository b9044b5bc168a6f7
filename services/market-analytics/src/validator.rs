//! Data-quality gate for inbound market-data records
//!
//! Validates trades and order-book snapshots before they reach
//! aggregation or analytics. Validation failures are reported as data
//! (a [`ValidationResult`] the caller inspects), never as `Err`: the
//! caller decides whether to drop, log, or reroute a bad record, and
//! the pipeline never aborts on one.
//!
//! Built-in checks can be extended with custom per-type rules
//! registered at setup time. Running counters feed the quality report
//! and are updated atomically, so concurrent validation calls are safe;
//! validation itself is pure with respect to its inputs.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;
use types::book::OrderbookSnapshot;
use types::errors::ConfigError;
use types::numeric::{decimal_places, relative_change};
use types::trade::Trade;

/// Maximum decimal scale representable by `Decimal`.
const MAX_DECIMAL_SCALE: u32 = 28;

/// Kind of record a validation result refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Trade,
    Orderbook,
    TradeSequence,
}

impl DataType {
    /// Label used in logs and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Trade => "trade",
            DataType::Orderbook => "orderbook",
            DataType::TradeSequence => "trade_sequence",
        }
    }
}

/// A structured validation error attributable to a specific field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Offending field.
    pub field: String,
    /// Human-readable description of the violation.
    pub message: String,
    /// Offending value, rendered as a string.
    pub value: String,
}

impl ValidationError {
    pub fn new(
        field: impl Into<String>,
        message: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            value: value.into(),
        }
    }
}

/// Outcome of validating a single record or sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
    /// Non-fatal observations (e.g., one-sided book).
    pub warnings: Vec<String>,
    pub data_type: DataType,
}

impl ValidationResult {
    fn new(data_type: DataType) -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            data_type,
        }
    }

    fn add_error(
        &mut self,
        field: impl Into<String>,
        message: impl Into<String>,
        value: impl Into<String>,
    ) {
        self.errors.push(ValidationError::new(field, message, value));
    }

    fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }
}

/// Aggregate validation counters since construction or reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub total_validations: u64,
    pub valid_count: u64,
    pub invalid_count: u64,
    pub warning_count: u64,
    /// invalid / total, 0.0 when nothing was validated.
    pub error_rate: f64,
}

/// Validator configuration; validated at construction.
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// Maximum decimal places allowed on a trade price.
    pub max_price_precision: u32,
    /// Maximum decimal places allowed on a trade quantity.
    pub max_quantity_precision: u32,
    /// Tolerance window around "now" for trade timestamps, seconds.
    pub timestamp_tolerance_secs: i64,
    /// Maximum relative price move between consecutive trades before
    /// a sequence is flagged (0.10 = 10%).
    pub max_price_deviation: Decimal,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_price_precision: 8,
            max_quantity_precision: 8,
            timestamp_tolerance_secs: 60,
            max_price_deviation: Decimal::new(10, 2), // 0.10
        }
    }
}

impl ValidatorConfig {
    /// Fail fast on incoherent limits.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_price_precision > MAX_DECIMAL_SCALE {
            return Err(ConfigError::InvalidPrecision {
                field: "max_price_precision".to_string(),
                value: self.max_price_precision,
                max: MAX_DECIMAL_SCALE,
            });
        }
        if self.max_quantity_precision > MAX_DECIMAL_SCALE {
            return Err(ConfigError::InvalidPrecision {
                field: "max_quantity_precision".to_string(),
                value: self.max_quantity_precision,
                max: MAX_DECIMAL_SCALE,
            });
        }
        if self.timestamp_tolerance_secs < 1 {
            return Err(ConfigError::InvalidThreshold {
                name: "timestamp_tolerance_secs".to_string(),
                value: self.timestamp_tolerance_secs.to_string(),
            });
        }
        if self.max_price_deviation <= Decimal::ZERO || self.max_price_deviation > Decimal::ONE {
            return Err(ConfigError::InvalidThreshold {
                name: "max_price_deviation".to_string(),
                value: self.max_price_deviation.to_string(),
            });
        }
        Ok(())
    }
}

type TradeRule = Box<dyn Fn(&Trade) -> Option<ValidationError> + Send + Sync>;
type BookRule = Box<dyn Fn(&OrderbookSnapshot) -> Option<ValidationError> + Send + Sync>;

/// Quality gate for trades and order-book snapshots.
pub struct DataValidator {
    config: ValidatorConfig,
    trade_rules: Vec<TradeRule>,
    book_rules: Vec<BookRule>,
    validations: AtomicU64,
    invalid: AtomicU64,
    warnings: AtomicU64,
}

impl DataValidator {
    /// Create a validator with the given configuration.
    pub fn new(config: ValidatorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            trade_rules: Vec::new(),
            book_rules: Vec::new(),
            validations: AtomicU64::new(0),
            invalid: AtomicU64::new(0),
            warnings: AtomicU64::new(0),
        })
    }

    /// Create a validator with default limits.
    pub fn with_defaults() -> Self {
        Self {
            config: ValidatorConfig::default(),
            trade_rules: Vec::new(),
            book_rules: Vec::new(),
            validations: AtomicU64::new(0),
            invalid: AtomicU64::new(0),
            warnings: AtomicU64::new(0),
        }
    }

    /// Register a custom trade rule, run after the built-in checks.
    pub fn register_trade_rule<F>(&mut self, rule: F)
    where
        F: Fn(&Trade) -> Option<ValidationError> + Send + Sync + 'static,
    {
        self.trade_rules.push(Box::new(rule));
    }

    /// Register a custom order-book rule, run after the built-in checks.
    pub fn register_orderbook_rule<F>(&mut self, rule: F)
    where
        F: Fn(&OrderbookSnapshot) -> Option<ValidationError> + Send + Sync + 'static,
    {
        self.book_rules.push(Box::new(rule));
    }

    /// Validate a single trade record.
    pub fn validate_trade(&self, trade: &Trade) -> ValidationResult {
        let mut result = ValidationResult::new(DataType::Trade);

        if trade.trade_id.is_nil() {
            result.add_error("trade_id", "missing trade identifier", "nil");
        }

        if trade.instrument.is_empty() {
            result.add_error("instrument", "empty instrument identifier", "");
        } else if !trade.instrument.is_well_formed() {
            result.add_error(
                "instrument",
                "instrument must match BASE/QUOTE",
                trade.instrument.as_str(),
            );
        }

        if trade.price <= Decimal::ZERO {
            result.add_error("price", "price must be positive", trade.price.to_string());
        } else if decimal_places(trade.price) > self.config.max_price_precision {
            result.add_error(
                "price",
                format!(
                    "price exceeds max precision of {} decimal places",
                    self.config.max_price_precision
                ),
                trade.price.to_string(),
            );
        }

        if trade.quantity <= Decimal::ZERO {
            result.add_error(
                "quantity",
                "quantity must be positive",
                trade.quantity.to_string(),
            );
        } else if decimal_places(trade.quantity) > self.config.max_quantity_precision {
            result.add_error(
                "quantity",
                format!(
                    "quantity exceeds max precision of {} decimal places",
                    self.config.max_quantity_precision
                ),
                trade.quantity.to_string(),
            );
        }

        let now = Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX);
        let tolerance = self.config.timestamp_tolerance_secs.saturating_mul(1_000_000_000);
        let drift = trade.timestamp.saturating_sub(now);
        if drift.abs() > tolerance {
            let direction = if drift > 0 { "future" } else { "past" };
            result.add_error(
                "timestamp",
                format!(
                    "timestamp too far in the {} (tolerance {}s)",
                    direction, self.config.timestamp_tolerance_secs
                ),
                trade.timestamp.to_string(),
            );
        }

        for rule in &self.trade_rules {
            if let Some(error) = rule(trade) {
                result.errors.push(error);
            }
        }

        self.finish(result)
    }

    /// Validate a single order-book snapshot.
    pub fn validate_orderbook(&self, book: &OrderbookSnapshot) -> ValidationResult {
        let mut result = ValidationResult::new(DataType::Orderbook);

        if book.is_empty() {
            result.add_error("book", "both sides of the book are empty", "");
            return self.finish(result);
        }

        if book.bids.is_empty() {
            result.add_warning("one-sided book: no bid levels");
        }
        if book.asks.is_empty() {
            result.add_warning("one-sided book: no ask levels");
        }

        Self::check_levels(&book.bids, "bids", &mut result);
        Self::check_levels(&book.asks, "asks", &mut result);

        // Bids strictly descending, asks strictly ascending
        for pair in book.bids.windows(2) {
            if pair[0].price <= pair[1].price {
                result.add_error(
                    "bids",
                    "bid levels must be strictly descending by price",
                    format!("{} then {}", pair[0].price, pair[1].price),
                );
                break;
            }
        }
        for pair in book.asks.windows(2) {
            if pair[0].price >= pair[1].price {
                result.add_error(
                    "asks",
                    "ask levels must be strictly ascending by price",
                    format!("{} then {}", pair[0].price, pair[1].price),
                );
                break;
            }
        }

        if let (Some(bid), Some(ask)) = (book.best_bid(), book.best_ask()) {
            if bid.price >= ask.price {
                result.add_error(
                    "book",
                    "crossed market: best bid at or above best ask",
                    format!("bid {} / ask {}", bid.price, ask.price),
                );
            }
        }

        for rule in &self.book_rules {
            if let Some(error) = rule(book) {
                result.errors.push(error);
            }
        }

        self.finish(result)
    }

    /// Flag outlier price moves in an ordered trade sequence.
    ///
    /// Advisory: outliers are reported, never auto-corrected.
    pub fn validate_trade_sequence(&self, trades: &[Trade]) -> ValidationResult {
        let mut result = ValidationResult::new(DataType::TradeSequence);

        for (i, pair) in trades.windows(2).enumerate() {
            if let Some(change) = relative_change(pair[0].price, pair[1].price) {
                if change > self.config.max_price_deviation {
                    result.add_error(
                        "price",
                        format!(
                            "outlier price move of {} between trades {} and {} exceeds max deviation {}",
                            change,
                            i,
                            i + 1,
                            self.config.max_price_deviation
                        ),
                        pair[1].price.to_string(),
                    );
                }
            }
        }

        self.finish(result)
    }

    /// Summary of all validations performed so far.
    pub fn generate_quality_report(&self) -> QualityReport {
        let total = self.validations.load(Ordering::Relaxed);
        let invalid = self.invalid.load(Ordering::Relaxed);
        let warning_count = self.warnings.load(Ordering::Relaxed);

        QualityReport {
            total_validations: total,
            valid_count: total - invalid,
            invalid_count: invalid,
            warning_count,
            error_rate: if total == 0 {
                0.0
            } else {
                invalid as f64 / total as f64
            },
        }
    }

    /// Reset the running counters.
    pub fn reset_counters(&self) {
        self.validations.store(0, Ordering::Relaxed);
        self.invalid.store(0, Ordering::Relaxed);
        self.warnings.store(0, Ordering::Relaxed);
    }

    fn check_levels(
        levels: &[types::book::PriceLevel],
        side: &str,
        result: &mut ValidationResult,
    ) {
        for (i, level) in levels.iter().enumerate() {
            if level.price <= Decimal::ZERO {
                result.add_error(
                    side,
                    format!("level {} price must be positive", i),
                    level.price.to_string(),
                );
            }
            if level.quantity < Decimal::ZERO {
                result.add_error(
                    side,
                    format!("level {} quantity must not be negative", i),
                    level.quantity.to_string(),
                );
            } else if level.quantity.is_zero() {
                result.add_warning(format!("{} level {} has zero quantity", side, i));
            }
        }
    }

    /// Settle the verdict and bump counters.
    fn finish(&self, mut result: ValidationResult) -> ValidationResult {
        result.is_valid = result.errors.is_empty();

        self.validations.fetch_add(1, Ordering::Relaxed);
        if !result.is_valid {
            self.invalid.fetch_add(1, Ordering::Relaxed);
            warn!(
                data_type = result.data_type.as_str(),
                errors = result.errors.len(),
                first_field = result.errors.first().map(|e| e.field.as_str()),
                "Record failed validation"
            );
        }
        self.warnings
            .fetch_add(result.warnings.len() as u64, Ordering::Relaxed);

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use types::book::PriceLevel;
    use types::ids::{InstrumentId, TradeId};
    use types::trade::Side;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn now_nanos() -> i64 {
        Utc::now().timestamp_nanos_opt().unwrap()
    }

    fn valid_trade() -> Trade {
        Trade::new(
            InstrumentId::new("BTC/USDT"),
            Side::BUY,
            dec("50000.5"),
            dec("0.25"),
            now_nanos(),
        )
    }

    fn valid_book() -> OrderbookSnapshot {
        OrderbookSnapshot::new(
            InstrumentId::new("BTC/USDT"),
            1,
            now_nanos(),
            vec![
                PriceLevel::new(dec("50000"), dec("1.0")),
                PriceLevel::new(dec("49900"), dec("2.0")),
            ],
            vec![
                PriceLevel::new(dec("50100"), dec("1.5")),
                PriceLevel::new(dec("50200"), dec("0.5")),
            ],
        )
    }

    fn field_names(result: &ValidationResult) -> Vec<&str> {
        result.errors.iter().map(|e| e.field.as_str()).collect()
    }

    #[test]
    fn test_valid_trade_passes() {
        let validator = DataValidator::with_defaults();
        let result = validator.validate_trade(&valid_trade());
        assert!(result.is_valid, "errors: {:?}", result.errors);
        assert_eq!(result.data_type, DataType::Trade);
    }

    #[test]
    fn test_negative_price_rejected() {
        let validator = DataValidator::with_defaults();
        let mut trade = valid_trade();
        trade.price = dec("-1");

        let result = validator.validate_trade(&trade);
        assert!(!result.is_valid);
        assert!(field_names(&result).contains(&"price"));
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let validator = DataValidator::with_defaults();
        let mut trade = valid_trade();
        trade.quantity = Decimal::ZERO;

        let result = validator.validate_trade(&trade);
        assert!(!result.is_valid);
        assert!(field_names(&result).contains(&"quantity"));
    }

    #[test]
    fn test_malformed_instrument_rejected() {
        let validator = DataValidator::with_defaults();
        let mut trade = valid_trade();
        trade.instrument = InstrumentId::new("BTCUSDT");

        let result = validator.validate_trade(&trade);
        assert!(!result.is_valid);
        assert!(field_names(&result).contains(&"instrument"));
    }

    #[test]
    fn test_empty_instrument_rejected() {
        let validator = DataValidator::with_defaults();
        let mut trade = valid_trade();
        trade.instrument = InstrumentId::new("");

        let result = validator.validate_trade(&trade);
        assert!(!result.is_valid);
        assert!(field_names(&result).contains(&"instrument"));
    }

    #[test]
    fn test_nil_trade_id_rejected() {
        let validator = DataValidator::with_defaults();
        let mut trade = valid_trade();
        trade.trade_id = TradeId::nil();

        let result = validator.validate_trade(&trade);
        assert!(!result.is_valid);
        assert!(field_names(&result).contains(&"trade_id"));
    }

    #[test]
    fn test_excess_precision_rejected() {
        let validator = DataValidator::with_defaults();
        let mut trade = valid_trade();
        trade.price = dec("50000.123456789"); // 9 dp > default 8

        let result = validator.validate_trade(&trade);
        assert!(!result.is_valid);
        assert!(field_names(&result).contains(&"price"));
    }

    #[test]
    fn test_timestamp_out_of_tolerance_rejected() {
        let validator = DataValidator::with_defaults();

        let mut future = valid_trade();
        future.timestamp = now_nanos() + 120 * 1_000_000_000;
        let result = validator.validate_trade(&future);
        assert!(!result.is_valid);
        assert!(field_names(&result).contains(&"timestamp"));
        assert!(result.errors[0].message.contains("future"));

        let mut past = valid_trade();
        past.timestamp = now_nanos() - 120 * 1_000_000_000;
        let result = validator.validate_trade(&past);
        assert!(!result.is_valid);
        assert!(result.errors[0].message.contains("past"));
    }

    #[test]
    fn test_valid_orderbook_passes() {
        let validator = DataValidator::with_defaults();
        let result = validator.validate_orderbook(&valid_book());
        assert!(result.is_valid, "errors: {:?}", result.errors);
        assert_eq!(result.data_type, DataType::Orderbook);
    }

    #[test]
    fn test_reversed_bid_order_rejected() {
        let validator = DataValidator::with_defaults();
        let mut book = valid_book();
        book.bids.reverse();

        let result = validator.validate_orderbook(&book);
        assert!(!result.is_valid);
        assert!(field_names(&result).contains(&"bids"));
    }

    #[test]
    fn test_reversed_ask_order_rejected() {
        let validator = DataValidator::with_defaults();
        let mut book = valid_book();
        book.asks.reverse();

        let result = validator.validate_orderbook(&book);
        assert!(!result.is_valid);
        assert!(field_names(&result).contains(&"asks"));
    }

    #[test]
    fn test_crossed_market_rejected() {
        let validator = DataValidator::with_defaults();
        let mut book = valid_book();
        book.bids[0].price = dec("50150"); // above best ask 50100

        let result = validator.validate_orderbook(&book);
        assert!(!result.is_valid);
        assert!(result
            .errors
            .iter()
            .any(|e| e.message.contains("crossed market")));
    }

    #[test]
    fn test_empty_book_rejected() {
        let validator = DataValidator::with_defaults();
        let book = OrderbookSnapshot::new(InstrumentId::new("BTC/USDT"), 1, 0, vec![], vec![]);

        let result = validator.validate_orderbook(&book);
        assert!(!result.is_valid);
    }

    #[test]
    fn test_one_sided_book_warns_but_passes() {
        let validator = DataValidator::with_defaults();
        let book = OrderbookSnapshot::new(
            InstrumentId::new("BTC/USDT"),
            1,
            now_nanos(),
            vec![PriceLevel::new(dec("50000"), dec("1.0"))],
            vec![],
        );

        let result = validator.validate_orderbook(&book);
        assert!(result.is_valid);
        assert!(!result.warnings.is_empty());
    }

    #[test]
    fn test_non_positive_level_price_rejected() {
        let validator = DataValidator::with_defaults();
        let mut book = valid_book();
        book.asks[1].price = Decimal::ZERO;

        let result = validator.validate_orderbook(&book);
        assert!(!result.is_valid);
    }

    #[test]
    fn test_trade_sequence_outlier_flagged() {
        let validator = DataValidator::with_defaults();
        let base = now_nanos();

        let mut t1 = valid_trade();
        t1.price = dec("100");
        t1.timestamp = base;
        let mut t2 = valid_trade();
        t2.price = dec("102");
        t2.timestamp = base + 1_000_000_000;
        let mut t3 = valid_trade();
        t3.price = dec("150"); // +47% jump
        t3.timestamp = base + 2_000_000_000;

        let result = validator.validate_trade_sequence(&[t1, t2, t3]);
        assert!(!result.is_valid);
        assert_eq!(result.data_type, DataType::TradeSequence);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].message.contains("outlier"));
    }

    #[test]
    fn test_smooth_trade_sequence_passes() {
        let validator = DataValidator::with_defaults();
        let base = now_nanos();

        let trades: Vec<Trade> = (0..5)
            .map(|i| {
                let mut t = valid_trade();
                t.price = dec("100") + Decimal::from(i);
                t.timestamp = base + i * 1_000_000_000;
                t
            })
            .collect();

        let result = validator.validate_trade_sequence(&trades);
        assert!(result.is_valid);
    }

    #[test]
    fn test_custom_trade_rule() {
        let mut validator = DataValidator::with_defaults();
        validator.register_trade_rule(|trade| {
            (trade.quantity > dec("100")).then(|| {
                ValidationError::new(
                    "quantity",
                    "quantity above venue lot limit",
                    trade.quantity.to_string(),
                )
            })
        });

        let mut trade = valid_trade();
        trade.quantity = dec("500");
        let result = validator.validate_trade(&trade);
        assert!(!result.is_valid);
        assert!(result.errors[0].message.contains("lot limit"));

        assert!(validator.validate_trade(&valid_trade()).is_valid);
    }

    #[test]
    fn test_custom_orderbook_rule() {
        let mut validator = DataValidator::with_defaults();
        validator.register_orderbook_rule(|book| {
            (book.sequence == 0)
                .then(|| ValidationError::new("sequence", "sequence must be assigned", "0"))
        });

        let mut book = valid_book();
        book.sequence = 0;
        assert!(!validator.validate_orderbook(&book).is_valid);
    }

    #[test]
    fn test_quality_report_counters() {
        let validator = DataValidator::with_defaults();

        validator.validate_trade(&valid_trade());
        validator.validate_trade(&valid_trade());
        let mut bad = valid_trade();
        bad.price = dec("-1");
        validator.validate_trade(&bad);

        let report = validator.generate_quality_report();
        assert_eq!(report.total_validations, 3);
        assert_eq!(report.valid_count, 2);
        assert_eq!(report.invalid_count, 1);
        assert!((report.error_rate - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_quality_report_empty() {
        let validator = DataValidator::with_defaults();
        let report = validator.generate_quality_report();
        assert_eq!(report.total_validations, 0);
        assert_eq!(report.error_rate, 0.0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ValidatorConfig {
            max_price_precision: 40,
            ..ValidatorConfig::default()
        };
        assert!(DataValidator::new(config).is_err());

        let config = ValidatorConfig {
            max_price_deviation: Decimal::ZERO,
            ..ValidatorConfig::default()
        };
        assert!(DataValidator::new(config).is_err());

        let config = ValidatorConfig {
            timestamp_tolerance_secs: 0,
            ..ValidatorConfig::default()
        };
        assert!(DataValidator::new(config).is_err());
    }

    #[test]
    fn test_concurrent_validation_counters() {
        use std::sync::Arc;

        let validator = Arc::new(DataValidator::with_defaults());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let validator = Arc::clone(&validator);
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        validator.validate_trade(&valid_trade());
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let report = validator.generate_quality_report();
        assert_eq!(report.total_validations, 200);
        assert_eq!(report.invalid_count, 0);
    }
}
