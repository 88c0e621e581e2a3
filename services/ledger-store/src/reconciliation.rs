//! Reconciliation sweep: recompute ledgers from the journal
//!
//! Callers of the core swallow its errors and carry on, so a ledger can
//! drift from the history that produced it. The sweep replays each metal's
//! journal from the bootstrap entry, compares the recomputed totals with
//! the stored ledger, and reports any field that differs by more than the
//! tolerance.
//!
//! Entries failing checksum or decoding are skipped and counted; a
//! non-zero `corrupted_entries` always makes the report fail.
//!
//! A single drifted report is logged as a warning, since a mutation can land
//! between the journal and ledger reads. `ReconciliationSweep` remembers the
//! previous sweep and raises an error when a metal drifts twice in a row.

use dashmap::DashSet;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use types::errors::{CoreError, ValidationError};
use types::ledger::MetalLedger;
use types::metal::Metal;

use crate::journal::LedgerTotals;
use crate::store::LedgerStore;

/// Reconciliation configuration
#[derive(Debug, Clone)]
pub struct ReconciliationConfig {
    /// Largest absolute per-field difference (grams) treated as agreement
    pub tolerance_grams: Decimal,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            tolerance_grams: Decimal::ZERO,
        }
    }
}

/// Outcome of reconciling one metal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub metal: Metal,
    /// Totals recomputed from the journal
    pub expected: LedgerTotals,
    /// Totals read from the stored ledger
    pub actual: LedgerTotals,
    /// Largest absolute per-field difference
    pub drift: Decimal,
    pub within_tolerance: bool,
    pub replayed: u64,
    pub corrupted_entries: u64,
    pub ledger_version: u64,
    /// Also drifted on the previous sweep
    #[serde(default)]
    pub persistent_drift: bool,
}

impl ReconciliationReport {
    pub fn is_clean(&self) -> bool {
        self.within_tolerance && self.corrupted_entries == 0
    }
}

fn totals_of(ledger: &MetalLedger) -> LedgerTotals {
    LedgerTotals {
        total: ledger.total_grams.as_decimal(),
        available: ledger.available_grams.as_decimal(),
        reserved: ledger.reserved_grams.as_decimal(),
        allocated: ledger.allocated_grams.as_decimal(),
        net_exposure: ledger.net_directional_exposure,
    }
}

/// Largest absolute difference across all fields
pub fn max_drift(expected: &LedgerTotals, actual: &LedgerTotals) -> Decimal {
    [
        expected.total - actual.total,
        expected.available - actual.available,
        expected.reserved - actual.reserved,
        expected.allocated - actual.allocated,
        expected.net_exposure - actual.net_exposure,
    ]
    .into_iter()
    .map(|d| d.abs())
    .max()
    .unwrap_or(Decimal::ZERO)
}

/// Reconcile a single metal's ledger against its journal
///
/// The journal is read before the ledger. A mutation landing between the
/// two reads shows up as transient drift and clears on the next sweep.
pub fn reconcile(
    store: &dyn LedgerStore,
    metal: Metal,
    config: &ReconciliationConfig,
) -> Result<ReconciliationReport, CoreError> {
    let entries = store.journal(metal)?;
    let ledger = store
        .get_ledger(metal)?
        .ok_or_else(|| ValidationError::UnknownMetal {
            symbol: metal.symbol().to_string(),
        })?;

    let mut expected = LedgerTotals::default();
    let mut replayed = 0u64;
    let mut corrupted = 0u64;

    for entry in &entries {
        match entry.decode() {
            Ok(event) => {
                event.apply(&mut expected);
                replayed += 1;
            }
            Err(e) => {
                corrupted += 1;
                warn!(
                    metal = %metal,
                    sequence = entry.sequence,
                    error = %e,
                    "Skipping unreadable journal entry"
                );
            }
        }
    }

    let actual = totals_of(&ledger.value);
    let drift = max_drift(&expected, &actual);
    let within_tolerance = drift <= config.tolerance_grams;

    let report = ReconciliationReport {
        metal,
        expected,
        actual,
        drift,
        within_tolerance,
        replayed,
        corrupted_entries: corrupted,
        ledger_version: ledger.version,
        persistent_drift: false,
    };

    if report.is_clean() {
        info!(metal = %metal, replayed, "Ledger reconciled");
    } else {
        warn!(
            metal = %metal,
            drift = %drift,
            tolerance = %config.tolerance_grams,
            corrupted_entries = corrupted,
            "Ledger drift detected"
        );
    }

    Ok(report)
}

/// Reconcile every bootstrapped metal
pub fn reconcile_all(
    store: &dyn LedgerStore,
    config: &ReconciliationConfig,
) -> Result<Vec<ReconciliationReport>, CoreError> {
    store
        .metals()?
        .into_iter()
        .map(|metal| reconcile(store, metal, config))
        .collect()
}

/// Repeated sweeps that escalate drift seen on consecutive runs
#[derive(Debug)]
pub struct ReconciliationSweep {
    config: ReconciliationConfig,
    drifted: DashSet<Metal>,
}

impl ReconciliationSweep {
    pub fn new(config: ReconciliationConfig) -> Self {
        Self {
            config,
            drifted: DashSet::new(),
        }
    }

    /// Reconcile every metal, flagging drift that survived the last sweep
    pub fn run(&self, store: &dyn LedgerStore) -> Result<Vec<ReconciliationReport>, CoreError> {
        let mut reports = reconcile_all(store, &self.config)?;
        for report in &mut reports {
            if report.is_clean() {
                self.drifted.remove(&report.metal);
            } else if !self.drifted.insert(report.metal) {
                report.persistent_drift = true;
                error!(
                    metal = %report.metal,
                    drift = %report.drift,
                    corrupted_entries = report.corrupted_entries,
                    ledger_version = report.ledger_version,
                    "Ledger drift persists across sweeps"
                );
            }
        }
        Ok(reports)
    }
}
