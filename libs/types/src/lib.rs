//! Types library for the matched-principal execution engine
//!
//! This library provides the core type definitions shared by the inventory
//! manager, matching engine, hedge engine and the gateway, keeping decimal
//! arithmetic deterministic and identifiers time-sortable.
//!
//! # Modules
//! - `ids`: Unique identifiers (OrderId, HedgeId, ClientId)
//! - `numeric`: Fixed-point decimal types (Grams, Price)
//! - `metal`: Supported precious metals
//! - `order`: Order side, ephemeral order, price quotes
//! - `ledger`: Per-metal stock ledger and pending flow counters
//! - `matching`: Match results
//! - `hedge`: Hedge position lifecycle
//! - `errors`: Error taxonomy
//! - `clock`: Wall-clock helper

// Public modules
pub mod ids;
pub mod numeric;
pub mod metal;
pub mod order;
pub mod ledger;
pub mod matching;
pub mod hedge;
pub mod errors;
pub mod clock;

// Library version constant
pub const LIB_VERSION: &str = "1.0.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::ids::*;
    pub use crate::numeric::*;
    pub use crate::metal::*;
    pub use crate::order::*;
    pub use crate::ledger::*;
    pub use crate::matching::*;
    pub use crate::hedge::*;
    pub use crate::errors::*;
}
