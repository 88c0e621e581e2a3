//! Inventory manager: ledger orchestration
//!
//! Ties together the pure checks, the CAS helpers of the ledger store and
//! the journal. Every mutation is atomic per metal.

use std::collections::HashMap;
use std::sync::Arc;

use ledger_store::cas::{self, Mutation};
use ledger_store::journal::LedgerEvent;
use ledger_store::LedgerStore;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use types::clock::now_nanos;
use types::errors::{CoreError, ValidationError};
use types::ledger::{require_positive, MetalLedger, PendingFlow};
use types::metal::Metal;
use types::numeric::Grams;
use types::order::Side;

use crate::checks::{self, OrderCheck};
use crate::stock::{self, StockLevel};

/// Risk limits for one metal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetalLimits {
    /// Maximum total grams the vault can hold
    pub vault_capacity: Grams,
    /// Largest allowed `|net directional exposure|` after a client buy
    pub exposure_band: Grams,
}

/// Starting state for a metal's ledger
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetalBootstrap {
    pub initial_stock: Grams,
    pub warning_threshold: Grams,
}

/// Inventory manager configuration
#[derive(Debug, Clone)]
pub struct InventoryConfig {
    pub limits: HashMap<Metal, MetalLimits>,
    /// Compare-and-swap attempts before surfacing contention
    pub max_cas_attempts: u32,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        let limits = |capacity: u64, band: u64| MetalLimits {
            vault_capacity: Grams::from_u64(capacity),
            exposure_band: Grams::from_u64(band),
        };
        Self {
            limits: HashMap::from([
                (Metal::XAU, limits(1_000_000, 50_000)),
                (Metal::XAG, limits(50_000_000, 2_000_000)),
                (Metal::XPT, limits(500_000, 25_000)),
                (Metal::XPD, limits(500_000, 25_000)),
            ]),
            max_cas_attempts: 16,
        }
    }
}

/// Inventory manager service
#[derive(Clone)]
pub struct InventoryManager {
    store: Arc<dyn LedgerStore>,
    config: InventoryConfig,
}

impl InventoryManager {
    /// Create an inventory manager with default configuration
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self::with_config(store, InventoryConfig::default())
    }

    /// Create an inventory manager with custom configuration
    pub fn with_config(store: Arc<dyn LedgerStore>, config: InventoryConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &InventoryConfig {
        &self.config
    }

    /// Create the ledger and pending flow pair for a metal if absent.
    ///
    /// Idempotent: an existing ledger is returned unchanged. The bootstrap
    /// journal entry is written whenever the metal's journal is still
    /// empty, so a run that created the ledger but lost the entry is
    /// repaired by the next bootstrap.
    pub fn bootstrap(&self, metal: Metal, bootstrap: MetalBootstrap) -> Result<MetalLedger, CoreError> {
        let timestamp = now_nanos();
        let ledger = MetalLedger::new(
            metal,
            bootstrap.initial_stock,
            bootstrap.warning_threshold,
            timestamp,
        );
        let (stored, created) = self.store.create_ledger(ledger)?;
        if created || self.store.journal(metal)?.is_empty() {
            self.journal_bootstrap(metal, stored.value.total_grams, timestamp)?;
            info!(
                metal = %metal,
                initial_stock = %stored.value.total_grams,
                created,
                "Ledger bootstrapped"
            );
        }
        self.store.create_flow(PendingFlow::new(metal))?;
        Ok(stored.value)
    }

    fn journal_bootstrap(&self, metal: Metal, initial_stock: Grams, timestamp: i64) -> Result<(), CoreError> {
        let event = LedgerEvent::Bootstrapped { initial_stock };
        let attempts = self.config.max_cas_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.store.append_event(metal, &event, timestamp) {
                Ok(_) => return Ok(()),
                Err(e) if attempt < attempts => {
                    warn!(metal = %metal, attempt, error = %e, "Bootstrap journal append failed; retrying");
                    attempt += 1;
                }
                Err(e) => {
                    error!(metal = %metal, attempts, error = %e, "Bootstrap journal entry not written");
                    return Err(e.into());
                }
            }
        }
    }

    /// Pre-trade capacity check.
    ///
    /// Capacity violations come back as `allowed = false` with a reason;
    /// only bad input and store failures are errors.
    pub fn check_order_allowed(
        &self,
        metal: Metal,
        grams: Grams,
        side: Side,
    ) -> Result<OrderCheck, CoreError> {
        require_positive(grams)?;
        let ledger = self.ledger(metal)?;
        let limits = self.limits(metal)?;
        let check = checks::evaluate(&ledger, side, grams, &limits)?;

        match &check.reason {
            None => debug!(metal = %metal, side = side.as_str(), grams = %grams, "Order check passed"),
            Some(reason) if check.advisory => warn!(
                metal = %metal,
                side = side.as_str(),
                grams = %grams,
                reason = %reason,
                "Advisory capacity violation"
            ),
            Some(reason) => warn!(
                metal = %metal,
                side = side.as_str(),
                grams = %grams,
                reason = %reason,
                "Order refused by capacity check"
            ),
        }

        Ok(check)
    }

    /// Client takes ownership of `grams`: available -> allocated
    pub fn record_client_allocation(&self, metal: Metal, grams: Grams) -> Result<MetalLedger, CoreError> {
        require_positive(grams)?;
        self.mutate(metal, LedgerEvent::Allocated { grams }, |ledger, ts| {
            ledger.allocate(grams, ts)
        })
    }

    /// Exact inverse of `record_client_allocation`
    pub fn record_client_deallocation(&self, metal: Metal, grams: Grams) -> Result<MetalLedger, CoreError> {
        require_positive(grams)?;
        self.mutate(metal, LedgerEvent::Deallocated { grams }, |ledger, ts| {
            ledger.deallocate(grams, ts)
        })
    }

    /// Vault intake, refused if the vault would overflow
    pub fn deposit_stock(&self, metal: Metal, grams: Grams) -> Result<MetalLedger, CoreError> {
        require_positive(grams)?;
        let capacity = self.limits(metal)?.vault_capacity;
        self.mutate(metal, LedgerEvent::Deposited { grams }, |ledger, ts| {
            checks::check_vault_capacity(ledger, grams, capacity)?;
            ledger.deposit(grams, ts)
        })
    }

    /// Vault outflow of unencumbered stock
    pub fn withdraw_stock(&self, metal: Metal, grams: Grams) -> Result<MetalLedger, CoreError> {
        require_positive(grams)?;
        self.mutate(metal, LedgerEvent::Withdrawn { grams }, |ledger, ts| {
            ledger.withdraw(grams, ts)
        })
    }

    pub fn reserve(&self, metal: Metal, grams: Grams) -> Result<MetalLedger, CoreError> {
        require_positive(grams)?;
        self.mutate(metal, LedgerEvent::Reserved { grams }, |ledger, ts| {
            ledger.reserve(grams, ts)
        })
    }

    pub fn release_reservation(&self, metal: Metal, grams: Grams) -> Result<MetalLedger, CoreError> {
        require_positive(grams)?;
        self.mutate(metal, LedgerEvent::ReservationReleased { grams }, |ledger, ts| {
            ledger.release_reservation(grams, ts)
        })
    }

    /// Adjust the firm's signed net exposure. A zero delta writes nothing.
    pub fn shift_exposure(&self, metal: Metal, delta: Decimal) -> Result<MetalLedger, CoreError> {
        if delta.is_zero() {
            return self.ledger(metal);
        }
        self.mutate(metal, LedgerEvent::ExposureShifted { delta }, |ledger, ts| {
            ledger.shift_exposure(delta, ts)
        })
    }

    /// Current ledger snapshot
    pub fn ledger(&self, metal: Metal) -> Result<MetalLedger, CoreError> {
        self.store
            .get_ledger(metal)?
            .map(|v| v.value)
            .ok_or_else(|| unknown_metal(metal))
    }

    pub fn stock_level(&self, metal: Metal) -> Result<StockLevel, CoreError> {
        Ok(stock::classify(&self.ledger(metal)?))
    }

    pub fn limits(&self, metal: Metal) -> Result<MetalLimits, CoreError> {
        self.config
            .limits
            .get(&metal)
            .copied()
            .ok_or_else(|| unknown_metal(metal))
    }

    /// CAS the ledger, then journal the delta.
    ///
    /// A journal failure after a committed write is logged, not returned:
    /// the ledger change stands and the reconciliation sweep reports the gap.
    fn mutate(
        &self,
        metal: Metal,
        event: LedgerEvent,
        mut apply: impl FnMut(&mut MetalLedger, i64) -> Result<(), CoreError>,
    ) -> Result<MetalLedger, CoreError> {
        let timestamp = now_nanos();
        let updated = cas::update_ledger(
            self.store.as_ref(),
            metal,
            self.config.max_cas_attempts,
            |ledger| {
                apply(ledger, timestamp)?;
                Ok(Mutation::Commit(()))
            },
        )?;

        if let Err(e) = self.store.append_event(metal, &event, timestamp) {
            error!(
                metal = %metal,
                event = event.event_type(),
                error = %e,
                "Ledger committed but journal append failed"
            );
        }

        let ledger = updated.record.value;
        debug!(
            metal = %metal,
            event = event.event_type(),
            version = updated.record.version,
            available = %ledger.available_grams,
            "Ledger updated"
        );

        match stock::classify(&ledger) {
            StockLevel::Healthy => {}
            level => warn!(
                metal = %metal,
                available = %ledger.available_grams,
                threshold = %ledger.warning_threshold,
                level = ?level,
                "Stock below warning threshold"
            ),
        }

        Ok(ledger)
    }
}

fn unknown_metal(metal: Metal) -> CoreError {
    ValidationError::UnknownMetal {
        symbol: metal.symbol().to_string(),
    }
    .into()
}
