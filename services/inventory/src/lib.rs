//! Inventory Manager
//!
//! Owns the per-metal stock ledgers:
//! - pre-trade capacity checks (available stock, exposure band, vault capacity)
//! - client allocation and deallocation
//! - vault intake/outflow and reservations
//! - stock level classification against the warning threshold
//!
//! Every ledger mutation is a single compare-and-swap on the metal's key
//! followed by a journal append.

pub mod checks;
pub mod stock;
pub mod engine;

pub use checks::OrderCheck;
pub use engine::{InventoryConfig, InventoryManager, MetalBootstrap, MetalLimits};
pub use stock::StockLevel;
