//! Per-metal stock ledger and pending flow counters
//!
//! Invariant for every `MetalLedger`:
//! `available = total - reserved - allocated >= 0`
//!
//! Every mutation either applies completely and preserves the invariant or
//! returns an error and leaves the ledger untouched.

use crate::errors::{CapacityError, CoreError, ValidationError};
use crate::metal::Metal;
use crate::numeric::Grams;
use crate::order::Side;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Stock ledger for a single metal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetalLedger {
    pub metal: Metal,
    pub total_grams: Grams,
    pub available_grams: Grams,
    pub reserved_grams: Grams,
    pub allocated_grams: Grams,
    /// Signed grams: positive = firm net long, negative = firm net short
    pub net_directional_exposure: Decimal,
    pub warning_threshold: Grams,
    pub updated_at: i64, // Unix nanos
}

impl MetalLedger {
    /// Create a ledger holding `initial_stock`, all of it available
    pub fn new(metal: Metal, initial_stock: Grams, warning_threshold: Grams, timestamp: i64) -> Self {
        Self {
            metal,
            total_grams: initial_stock,
            available_grams: initial_stock,
            reserved_grams: Grams::zero(),
            allocated_grams: Grams::zero(),
            net_directional_exposure: Decimal::ZERO,
            warning_threshold,
            updated_at: timestamp,
        }
    }

    /// Check: available + reserved + allocated == total
    pub fn check_invariant(&self) -> bool {
        self.available_grams + self.reserved_grams + self.allocated_grams == self.total_grams
    }

    /// Vault intake: total and available grow together
    pub fn deposit(&mut self, grams: Grams, timestamp: i64) -> Result<(), CoreError> {
        require_positive(grams)?;
        let total = self
            .total_grams
            .checked_add(grams)
            .ok_or_else(|| ValidationError::overflow("deposit"))?;
        self.available_grams = self.available_grams + grams;
        self.total_grams = total;
        self.touch(timestamp);
        Ok(())
    }

    /// Vault outflow: only available stock can leave
    pub fn withdraw(&mut self, grams: Grams, timestamp: i64) -> Result<(), CoreError> {
        require_positive(grams)?;
        let available = self.take_available(grams)?;
        let total = self.total_grams.checked_sub(grams).ok_or_else(|| self.insufficient(grams))?;
        self.available_grams = available;
        self.total_grams = total;
        self.touch(timestamp);
        Ok(())
    }

    /// Move grams from available to reserved
    pub fn reserve(&mut self, grams: Grams, timestamp: i64) -> Result<(), CoreError> {
        require_positive(grams)?;
        self.available_grams = self.take_available(grams)?;
        self.reserved_grams = self.reserved_grams + grams;
        self.touch(timestamp);
        Ok(())
    }

    /// Move grams from reserved back to available
    pub fn release_reservation(&mut self, grams: Grams, timestamp: i64) -> Result<(), CoreError> {
        require_positive(grams)?;
        let reserved = self.reserved_grams.checked_sub(grams).ok_or(
            ValidationError::ExceedsReserved {
                metal: self.metal,
                requested: grams,
                reserved: self.reserved_grams,
            },
        )?;
        self.reserved_grams = reserved;
        self.available_grams = self.available_grams + grams;
        self.touch(timestamp);
        Ok(())
    }

    /// Client takes beneficial ownership: available -> allocated
    pub fn allocate(&mut self, grams: Grams, timestamp: i64) -> Result<(), CoreError> {
        require_positive(grams)?;
        self.available_grams = self.take_available(grams)?;
        self.allocated_grams = self.allocated_grams + grams;
        self.touch(timestamp);
        Ok(())
    }

    /// Exact inverse of `allocate`
    pub fn deallocate(&mut self, grams: Grams, timestamp: i64) -> Result<(), CoreError> {
        require_positive(grams)?;
        let allocated = self.allocated_grams.checked_sub(grams).ok_or(
            ValidationError::ExceedsAllocated {
                metal: self.metal,
                requested: grams,
                allocated: self.allocated_grams,
            },
        )?;
        self.allocated_grams = allocated;
        self.available_grams = self.available_grams + grams;
        self.touch(timestamp);
        Ok(())
    }

    /// Adjust the signed net directional exposure
    pub fn shift_exposure(&mut self, delta: Decimal, timestamp: i64) -> Result<(), CoreError> {
        self.net_directional_exposure = self
            .net_directional_exposure
            .checked_add(delta)
            .ok_or_else(|| ValidationError::overflow("exposure shift"))?;
        self.touch(timestamp);
        Ok(())
    }

    fn take_available(&self, grams: Grams) -> Result<Grams, CapacityError> {
        self.available_grams
            .checked_sub(grams)
            .ok_or_else(|| self.insufficient(grams))
    }

    fn insufficient(&self, grams: Grams) -> CapacityError {
        CapacityError::InsufficientAvailable {
            metal: self.metal,
            requested: grams,
            available: self.available_grams,
        }
    }

    fn touch(&mut self, timestamp: i64) {
        self.updated_at = timestamp;
        debug_assert!(self.check_invariant(), "Ledger invariant violated");
    }
}

/// Reject zero quantities for ledger mutations
pub fn require_positive(grams: Grams) -> Result<(), ValidationError> {
    if grams.is_zero() {
        Err(ValidationError::NonPositiveGrams {
            grams: grams.as_decimal(),
        })
    } else {
        Ok(())
    }
}

/// Parse an externally supplied quantity, rejecting `grams <= 0`
pub fn positive_grams(value: Decimal) -> Result<Grams, ValidationError> {
    Grams::try_new(value)
        .filter(|g| !g.is_zero())
        .ok_or(ValidationError::NonPositiveGrams { grams: value })
}

/// Aggregate unmatched client flow for one metal
///
/// Fungible pooled counters, not an order book: individual order identity
/// is not kept once an order's remainder is added here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingFlow {
    pub metal: Metal,
    pub pending_buy_grams: Grams,
    pub pending_sell_grams: Grams,
}

impl PendingFlow {
    pub fn new(metal: Metal) -> Self {
        Self {
            metal,
            pending_buy_grams: Grams::zero(),
            pending_sell_grams: Grams::zero(),
        }
    }

    pub fn pending(&self, side: Side) -> Grams {
        match side {
            Side::BUY => self.pending_buy_grams,
            Side::SELL => self.pending_sell_grams,
        }
    }

    pub fn pending_mut(&mut self, side: Side) -> &mut Grams {
        match side {
            Side::BUY => &mut self.pending_buy_grams,
            Side::SELL => &mut self.pending_sell_grams,
        }
    }
}
