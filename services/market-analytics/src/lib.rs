//! Market Analytics Service
//!
//! Synchronous, CPU-bound analytics core for exchange market data.
//! Consumes pre-parsed trade executions and order-book snapshots and
//! produces:
//! - Validated records via a structured data-quality gate
//! - OHLCV candle aggregation (multi-timeframe, per instrument)
//! - Spread/depth/imbalance order-book analytics
//! - Bounded circular-buffer candle history with snapshotting
//! - Per-stage latency/throughput statistics with SLA grading
//!
//! The transport that feeds events in and the consumers that act on the
//! results are external collaborators; this crate performs no I/O.
//!
//! # Architecture
//!
//! ```text
//! Upstream feed (pre-parsed events)
//!        │
//!   ┌────▼──────┐
//!   │ Validator │  ← quality gate; rejects are data, not errors
//!   └────┬──────┘
//!        │
//!   ┌────┴─────────────┐
//!   │                  │
//! ┌─▼──────────┐  ┌────▼──────┐
//! │ Aggregator │  │ Orderbook │
//! │ (candles)  │  │ analytics │
//! └─┬──────────┘  └────┬──────┘
//!   │                  │
//! ┌─▼──────────┐       │
//! │ Ring-buffer│       │
//! │ history    │       │
//! └─┬──────────┘       │
//!   │                  │
//! ┌─▼──────────────────▼──┐
//! │  Performance monitor  │  ← every stage timed against its SLA
//! └───────────────────────┘
//! ```

pub mod aggregator;
pub mod buffer;
pub mod candles;
pub mod events;
pub mod monitor;
pub mod orderbook;
pub mod pipeline;
pub mod validator;

// Library version
pub const SERVICE_VERSION: &str = "0.1.0";
