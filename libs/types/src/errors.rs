//! Error types for the execution core
//!
//! Three-way taxonomy using thiserror:
//! - `ValidationError`: bad input, rejected synchronously
//! - `CapacityError`: a stock, exposure band or vault limit would be breached
//! - `StoreError`: the ledger store failed or could not commit in time
//!
//! Double-closing a hedge is not an error; it returns the stored result.

use thiserror::Error;

use crate::ids::HedgeId;
use crate::metal::Metal;
use crate::numeric::Grams;
use rust_decimal::Decimal;

/// Top-level core error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Capacity error: {0}")]
    Capacity(#[from] CapacityError),

    #[error("Ledger store error: {0}")]
    TransientStore(#[from] StoreError),
}

impl ValidationError {
    pub fn overflow(operation: impl Into<String>) -> Self {
        ValidationError::Overflow {
            operation: operation.into(),
        }
    }
}

impl CoreError {
    /// True when a retry of the same call may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, CoreError::TransientStore(_))
    }
}

/// Input validation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Grams must be positive, got {grams}")]
    NonPositiveGrams { grams: Decimal },

    #[error("Unknown metal: {symbol}")]
    UnknownMetal { symbol: String },

    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    #[error("Invalid conversion: {0}")]
    InvalidConversion(String),

    #[error("Quantity out of range in {operation}")]
    Overflow { operation: String },

    #[error("Hedge not found: {hedge_id}")]
    HedgeNotFound { hedge_id: HedgeId },

    #[error("Deallocation of {requested}g exceeds allocated {allocated}g for {metal}")]
    ExceedsAllocated {
        metal: Metal,
        requested: Grams,
        allocated: Grams,
    },

    #[error("Release of {requested}g exceeds reserved {reserved}g for {metal}")]
    ExceedsReserved {
        metal: Metal,
        requested: Grams,
        reserved: Grams,
    },
}

/// Capacity and risk-limit violations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CapacityError {
    #[error("Insufficient available stock for {metal}: requested {requested}g, available {available}g")]
    InsufficientAvailable {
        metal: Metal,
        requested: Grams,
        available: Grams,
    },

    #[error("Exposure band exceeded for {metal}: resulting {resulting}g, band ±{band}g")]
    ExposureBandExceeded {
        metal: Metal,
        resulting: Decimal,
        band: Grams,
    },

    #[error("Vault capacity exceeded for {metal}: resulting total {resulting_total}g, capacity {capacity}g")]
    VaultCapacityExceeded {
        metal: Metal,
        resulting_total: Grams,
        capacity: Grams,
    },
}

/// Ledger store failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Ledger store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Contention on {key}: compare-and-swap failed after {attempts} attempts")]
    Contention { key: String, attempts: u32 },

    #[error("Corrupted record {key}: {reason}")]
    Corrupted { key: String, reason: String },

    #[error("Operation on {key} is still in flight")]
    InFlight { key: String },
}
