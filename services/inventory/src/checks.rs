//! Pre-trade capacity checks
//!
//! Pure functions over a ledger snapshot. Sides are from the client's
//! point of view:
//! - BUY: the firm releases stock. Requires `available >= grams` and the
//!   resulting net exposure inside the band.
//! - SELL: the firm takes stock in. Requires the resulting total to fit in
//!   the vault. A violation is reported as advisory.
//!
//! A client buy moves the firm's net exposure by `-grams`, a client sell
//! by `+grams`.

use rust_decimal::Decimal;
use types::errors::{CapacityError, CoreError, ValidationError};
use types::ledger::MetalLedger;
use types::numeric::Grams;
use types::order::Side;

use crate::engine::MetalLimits;

/// Outcome of `check_order_allowed`
#[derive(Debug, Clone, PartialEq)]
pub struct OrderCheck {
    pub allowed: bool,
    /// True when the violation is informational and the caller may proceed
    pub advisory: bool,
    pub reason: Option<CapacityError>,
}

impl OrderCheck {
    pub fn pass() -> Self {
        Self {
            allowed: true,
            advisory: false,
            reason: None,
        }
    }

    pub fn reject(reason: CapacityError, advisory: bool) -> Self {
        Self {
            allowed: false,
            advisory,
            reason: Some(reason),
        }
    }
}

/// Net exposure after the firm takes the other side of a client order
pub fn exposure_after(ledger: &MetalLedger, side: Side, grams: Grams) -> Result<Decimal, ValidationError> {
    grams
        .checked_mul(side.direction_sign())
        .and_then(|signed| ledger.net_directional_exposure.checked_sub(signed))
        .ok_or_else(|| ValidationError::overflow("exposure check"))
}

/// Firm must hold enough unencumbered stock
pub fn check_available(ledger: &MetalLedger, grams: Grams) -> Result<(), CoreError> {
    if ledger.available_grams >= grams {
        Ok(())
    } else {
        Err(CapacityError::InsufficientAvailable {
            metal: ledger.metal,
            requested: grams,
            available: ledger.available_grams,
        }
        .into())
    }
}

/// Resulting `|net exposure|` must stay within the band
pub fn check_exposure_band(
    ledger: &MetalLedger,
    side: Side,
    grams: Grams,
    band: Grams,
) -> Result<(), CoreError> {
    let resulting = exposure_after(ledger, side, grams)?;
    if resulting.abs() <= band.as_decimal() {
        Ok(())
    } else {
        Err(CapacityError::ExposureBandExceeded {
            metal: ledger.metal,
            resulting,
            band,
        }
        .into())
    }
}

/// Resulting total stock must fit in the vault
pub fn check_vault_capacity(
    ledger: &MetalLedger,
    grams: Grams,
    capacity: Grams,
) -> Result<(), CoreError> {
    let resulting_total = ledger
        .total_grams
        .checked_add(grams)
        .ok_or_else(|| ValidationError::overflow("vault capacity check"))?;
    if resulting_total <= capacity {
        Ok(())
    } else {
        Err(CapacityError::VaultCapacityExceeded {
            metal: ledger.metal,
            resulting_total,
            capacity,
        }
        .into())
    }
}

/// Run the checks for one side, returning the first failure
///
/// Checks performed (in order):
/// 1. BUY: available stock, then exposure band
/// 2. SELL: vault capacity (advisory)
///
/// Capacity failures become a refused `OrderCheck`; a quantity too large
/// to evaluate is a validation error.
pub fn evaluate(
    ledger: &MetalLedger,
    side: Side,
    grams: Grams,
    limits: &MetalLimits,
) -> Result<OrderCheck, CoreError> {
    let (result, advisory) = match side {
        Side::BUY => (
            check_available(ledger, grams)
                .and_then(|_| check_exposure_band(ledger, side, grams, limits.exposure_band)),
            false,
        ),
        Side::SELL => (check_vault_capacity(ledger, grams, limits.vault_capacity), true),
    };
    match result {
        Ok(()) => Ok(OrderCheck::pass()),
        Err(CoreError::Capacity(reason)) => Ok(OrderCheck::reject(reason, advisory)),
        Err(other) => Err(other),
    }
}
