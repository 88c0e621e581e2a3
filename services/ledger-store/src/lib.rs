//! Ledger Store
//!
//! Keyed, versioned storage for the execution core:
//! - per-metal `MetalLedger` and `PendingFlow` records
//! - hedge positions keyed by hedge id (with a linked-order index)
//! - order-id claims and write-once match results keyed by order id
//! - a per-metal append-only journal of ledger deltas
//!
//! All mutation goes through compare-and-swap on a single key, so writers
//! on different metals never contend. The journal feeds the reconciliation
//! sweep, which recomputes each ledger from history and flags drift.

pub mod store;
pub mod cas;
pub mod journal;
pub mod reconciliation;

pub use store::{CasOutcome, HedgeInsert, InMemoryLedgerStore, LedgerStore, Versioned};
