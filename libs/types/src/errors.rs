//! Configuration error taxonomy
//!
//! Invalid thresholds, capacities, or precision limits supplied at
//! construction fail fast with a [`ConfigError`] rather than surfacing
//! later as bad analytics.

use thiserror::Error;

/// Errors raised by component constructors for invalid configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid capacity: {value} (must be at least 1)")]
    InvalidCapacity { value: usize },

    #[error("invalid precision limit for {field}: {value} (max {max})")]
    InvalidPrecision { field: String, value: u32, max: u32 },

    #[error("invalid threshold for {name}: {value}")]
    InvalidThreshold { name: String, value: String },

    #[error("invalid timeframe set: {reason}")]
    InvalidTimeframes { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::InvalidCapacity { value: 0 };
        assert_eq!(err.to_string(), "invalid capacity: 0 (must be at least 1)");

        let err = ConfigError::InvalidThreshold {
            name: "max_price_deviation".to_string(),
            value: "0".to_string(),
        };
        assert!(err.to_string().contains("max_price_deviation"));
    }
}
