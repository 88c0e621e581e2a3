//! Bounded compare-and-swap retry loops
//!
//! Each helper loads the current versioned record, lets the caller mutate a
//! copy, and commits it with a compare-and-swap on that one key. A stale
//! version reloads and retries; after `max_attempts` stale rounds the call
//! fails with `StoreError::Contention`. Mutation closures may run more than
//! once and must not have side effects outside the record.

use tracing::warn;
use types::errors::{CoreError, StoreError, ValidationError};
use types::hedge::HedgePosition;
use types::ids::HedgeId;
use types::ledger::{MetalLedger, PendingFlow};
use types::metal::Metal;

use crate::store::{CasOutcome, LedgerStore, Versioned};

/// What the mutation closure decided
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation<R> {
    /// Write the mutated record
    Commit(R),
    /// Leave the stored record untouched
    Skip(R),
}

/// Final state after a successful update
#[derive(Debug, Clone, PartialEq)]
pub struct Updated<T, R> {
    pub record: Versioned<T>,
    pub output: R,
    /// False when the closure chose `Mutation::Skip`
    pub written: bool,
}

fn cas_loop<T, R>(
    key: String,
    max_attempts: u32,
    mut load: impl FnMut() -> Result<Versioned<T>, CoreError>,
    mut commit: impl FnMut(u64, T) -> Result<CasOutcome, StoreError>,
    mut apply: impl FnMut(&mut T) -> Result<Mutation<R>, CoreError>,
) -> Result<Updated<T, R>, CoreError>
where
    T: Clone,
{
    let attempts = max_attempts.max(1);
    for _ in 0..attempts {
        let current = load()?;
        let mut next = current.value.clone();
        match apply(&mut next)? {
            Mutation::Skip(output) => {
                return Ok(Updated {
                    record: current,
                    output,
                    written: false,
                });
            }
            Mutation::Commit(output) => match commit(current.version, next.clone())? {
                CasOutcome::Committed { version } => {
                    return Ok(Updated {
                        record: Versioned {
                            version,
                            value: next,
                        },
                        output,
                        written: true,
                    });
                }
                CasOutcome::Stale { .. } => continue,
            },
        }
    }

    warn!(key = %key, attempts, "Compare-and-swap retries exhausted");
    Err(StoreError::Contention { key, attempts }.into())
}

fn unknown_metal(metal: Metal) -> CoreError {
    ValidationError::UnknownMetal {
        symbol: metal.symbol().to_string(),
    }
    .into()
}

/// Atomically update one metal's ledger
pub fn update_ledger<R>(
    store: &dyn LedgerStore,
    metal: Metal,
    max_attempts: u32,
    apply: impl FnMut(&mut MetalLedger) -> Result<Mutation<R>, CoreError>,
) -> Result<Updated<MetalLedger, R>, CoreError> {
    cas_loop(
        format!("ledger:{metal}"),
        max_attempts,
        || store.get_ledger(metal)?.ok_or_else(|| unknown_metal(metal)),
        |version, next| store.cas_ledger(metal, version, next),
        apply,
    )
}

/// Atomically update one metal's pending flow pair
pub fn update_flow<R>(
    store: &dyn LedgerStore,
    metal: Metal,
    max_attempts: u32,
    apply: impl FnMut(&mut PendingFlow) -> Result<Mutation<R>, CoreError>,
) -> Result<Updated<PendingFlow, R>, CoreError> {
    cas_loop(
        format!("flow:{metal}"),
        max_attempts,
        || store.get_flow(metal)?.ok_or_else(|| unknown_metal(metal)),
        |version, next| store.cas_flow(metal, version, next),
        apply,
    )
}

/// Atomically update one hedge position
pub fn update_hedge<R>(
    store: &dyn LedgerStore,
    hedge_id: HedgeId,
    max_attempts: u32,
    apply: impl FnMut(&mut HedgePosition) -> Result<Mutation<R>, CoreError>,
) -> Result<Updated<HedgePosition, R>, CoreError> {
    cas_loop(
        format!("hedge:{hedge_id}"),
        max_attempts,
        || {
            store
                .get_hedge(hedge_id)?
                .ok_or_else(|| CoreError::from(ValidationError::HedgeNotFound { hedge_id }))
        },
        |version, next| store.cas_hedge(hedge_id, version, next),
        apply,
    )
}
