//! Types library for the market-data analytics pipeline
//!
//! This library provides all core type definitions shared across the
//! pipeline, ensuring type safety and deterministic behavior.
//!
//! # Modules
//! - `ids`: Unique identifiers (TradeId, InstrumentId)
//! - `numeric`: Fixed-precision decimal helpers (precision, safe ratios)
//! - `trade`: Trade execution input records
//! - `book`: Order book snapshot input records
//! - `errors`: Configuration error taxonomy

// Public modules
pub mod book;
pub mod errors;
pub mod ids;
pub mod numeric;
pub mod trade;

// Library version constant
pub const LIB_VERSION: &str = "1.0.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::book::*;
    pub use crate::errors::*;
    pub use crate::ids::*;
    pub use crate::numeric::*;
    pub use crate::trade::*;
}
