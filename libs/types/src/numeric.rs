//! Fixed-precision decimal helpers for prices and quantities
//!
//! Uses rust_decimal for deterministic arithmetic (no floating-point
//! errors). Money-like fields throughout the pipeline are plain
//! `Decimal` values on untrusted input records; these helpers carry the
//! numerically sensitive primitives the validator and analytics share:
//! effective precision, safe ratios, and relative price moves.
//!
//! `Decimal` has no infinity, so ratio calculations with a zero
//! denominator yield the [`POSITIVE_INFINITY`] sentinel instead of
//! raising. Thin markets hit this path routinely; it is an expected
//! edge condition, not a bug.

use rust_decimal::Decimal;

/// Sentinel standing in for +∞ in ratio calculations.
pub const POSITIVE_INFINITY: Decimal = Decimal::MAX;

/// Effective number of decimal places of a value.
///
/// Trailing zeros do not count: `1.500` has 1 effective decimal place.
pub fn decimal_places(value: Decimal) -> u32 {
    value.normalize().scale()
}

/// Divide `numerator` by `denominator`, yielding defined sentinels
/// instead of raising on a zero denominator: 0/0 = 0, n/0 = +∞.
pub fn safe_ratio(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator.is_zero() {
        if numerator.is_zero() {
            Decimal::ZERO
        } else {
            POSITIVE_INFINITY
        }
    } else {
        numerator / denominator
    }
}

/// Absolute relative change from `from` to `to`: |to - from| / from.
///
/// Returns `None` when the base is zero or negative (such records fail
/// individual field validation and cannot anchor a comparison).
pub fn relative_change(from: Decimal, to: Decimal) -> Option<Decimal> {
    if from <= Decimal::ZERO {
        return None;
    }
    Some(((to - from) / from).abs())
}
