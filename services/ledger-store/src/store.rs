//! Ledger store abstraction and the in-memory implementation
//!
//! The trait exposes the primitives the core needs from a key-value ledger
//! store: versioned reads, compare-and-swap writes keyed by metal or hedge
//! id, insert-if-absent, and journal append.

use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;
use types::errors::StoreError;
use types::hedge::HedgePosition;
use types::ids::{HedgeId, OrderId};
use types::ledger::{MetalLedger, PendingFlow};
use types::matching::MatchResult;
use types::metal::Metal;

use crate::journal::{JournalEntry, LedgerEvent};

/// A stored value with its optimistic-locking version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Versioned<T> {
    pub version: u64,
    pub value: T,
}

impl<T> Versioned<T> {
    pub fn initial(value: T) -> Self {
        Self { version: 1, value }
    }
}

/// Result of a compare-and-swap attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome {
    /// Write applied; the record now has this version
    Committed { version: u64 },
    /// Expected version did not match; nothing written
    Stale { current_version: u64 },
}

/// Result of inserting a hedge position
#[derive(Debug, Clone, PartialEq)]
pub struct HedgeInsert {
    pub position: Versioned<HedgePosition>,
    /// False when a position linked to the same order already existed
    pub created: bool,
}

/// Progress of one order id through matching
#[derive(Debug, Clone)]
enum MatchSlot {
    /// Reserved by a submission that has not recorded its result yet
    Claimed,
    Recorded(MatchResult),
}

/// Key-value ledger store used by the execution core
pub trait LedgerStore: Send + Sync {
    fn get_ledger(&self, metal: Metal) -> Result<Option<Versioned<MetalLedger>>, StoreError>;

    /// Insert the ledger if absent; returns whatever is stored afterwards
    fn create_ledger(&self, ledger: MetalLedger) -> Result<(Versioned<MetalLedger>, bool), StoreError>;

    fn cas_ledger(
        &self,
        metal: Metal,
        expected_version: u64,
        next: MetalLedger,
    ) -> Result<CasOutcome, StoreError>;

    fn get_flow(&self, metal: Metal) -> Result<Option<Versioned<PendingFlow>>, StoreError>;

    fn create_flow(&self, flow: PendingFlow) -> Result<(Versioned<PendingFlow>, bool), StoreError>;

    fn cas_flow(
        &self,
        metal: Metal,
        expected_version: u64,
        next: PendingFlow,
    ) -> Result<CasOutcome, StoreError>;

    /// Insert a hedge; if it links to an order that already has a hedge,
    /// the existing one is returned instead
    fn insert_hedge(&self, position: HedgePosition) -> Result<HedgeInsert, StoreError>;

    fn get_hedge(&self, hedge_id: HedgeId) -> Result<Option<Versioned<HedgePosition>>, StoreError>;

    fn cas_hedge(
        &self,
        hedge_id: HedgeId,
        expected_version: u64,
        next: HedgePosition,
    ) -> Result<CasOutcome, StoreError>;

    fn list_hedges(&self) -> Result<Vec<HedgePosition>, StoreError>;

    /// Reserve an order id for netting. Only the caller that gets `true`
    /// may touch the pending flow for this order.
    fn claim_order(&self, order_id: OrderId) -> Result<bool, StoreError>;

    /// Drop a claim whose netting never committed; recorded results stay
    fn release_order(&self, order_id: OrderId) -> Result<(), StoreError>;

    /// Write-once: returns false and keeps the original if one exists
    fn record_match(&self, result: MatchResult) -> Result<bool, StoreError>;

    fn get_match(&self, order_id: OrderId) -> Result<Option<MatchResult>, StoreError>;

    /// Append to the metal's journal, returning the entry's sequence
    fn append_event(&self, metal: Metal, event: &LedgerEvent, timestamp: i64) -> Result<u64, StoreError>;

    fn journal(&self, metal: Metal) -> Result<Vec<JournalEntry>, StoreError>;

    /// Metals with a bootstrapped ledger, sorted
    fn metals(&self) -> Result<Vec<Metal>, StoreError>;
}

/// In-process store backed by sharded concurrent maps
///
/// Each operation takes only the shard lock of the key it touches.
#[derive(Debug)]
pub struct InMemoryLedgerStore {
    ledgers: DashMap<Metal, Versioned<MetalLedger>>,
    flows: DashMap<Metal, Versioned<PendingFlow>>,
    hedges: DashMap<HedgeId, Versioned<HedgePosition>>,
    hedges_by_order: DashMap<OrderId, HedgeId>,
    matches: DashMap<OrderId, MatchSlot>,
    journals: DashMap<Metal, Vec<JournalEntry>>,
    available: AtomicBool,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self {
            ledgers: DashMap::new(),
            flows: DashMap::new(),
            hedges: DashMap::new(),
            hedges_by_order: DashMap::new(),
            matches: DashMap::new(),
            journals: DashMap::new(),
            available: AtomicBool::new(true),
        }
    }

    /// Simulate the store becoming unreachable (or reachable again)
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable {
                reason: "ledger store marked unavailable".to_string(),
            })
        }
    }

    #[cfg(test)]
    pub(crate) fn corrupt_journal_entry(&self, metal: Metal, sequence: u64) {
        if let Some(mut entries) = self.journals.get_mut(&metal) {
            if let Some(entry) = entries.iter_mut().find(|e| e.sequence == sequence) {
                entry.checksum ^= 0xDEAD_BEEF;
            }
        }
    }
}

impl Default for InMemoryLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

fn compare_and_swap<K, T>(
    map: &DashMap<K, Versioned<T>>,
    key: K,
    key_label: String,
    expected_version: u64,
    next: T,
) -> Result<CasOutcome, StoreError>
where
    K: Eq + std::hash::Hash,
{
    match map.get_mut(&key) {
        Some(mut current) if current.version == expected_version => {
            current.version += 1;
            current.value = next;
            Ok(CasOutcome::Committed {
                version: current.version,
            })
        }
        Some(current) => {
            debug!(
                key = %key_label,
                expected_version,
                current_version = current.version,
                "Stale compare-and-swap"
            );
            Ok(CasOutcome::Stale {
                current_version: current.version,
            })
        }
        None => Err(StoreError::Corrupted {
            key: key_label,
            reason: "record missing".to_string(),
        }),
    }
}

fn insert_if_absent<K, T: Clone>(map: &DashMap<K, Versioned<T>>, key: K, value: T) -> (Versioned<T>, bool)
where
    K: Eq + std::hash::Hash,
{
    match map.entry(key) {
        Entry::Occupied(existing) => (existing.get().clone(), false),
        Entry::Vacant(slot) => (slot.insert(Versioned::initial(value)).value().clone(), true),
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn get_ledger(&self, metal: Metal) -> Result<Option<Versioned<MetalLedger>>, StoreError> {
        self.ensure_available()?;
        Ok(self.ledgers.get(&metal).map(|l| l.value().clone()))
    }

    fn create_ledger(&self, ledger: MetalLedger) -> Result<(Versioned<MetalLedger>, bool), StoreError> {
        self.ensure_available()?;
        Ok(insert_if_absent(&self.ledgers, ledger.metal, ledger))
    }

    fn cas_ledger(
        &self,
        metal: Metal,
        expected_version: u64,
        next: MetalLedger,
    ) -> Result<CasOutcome, StoreError> {
        self.ensure_available()?;
        compare_and_swap(&self.ledgers, metal, format!("ledger:{metal}"), expected_version, next)
    }

    fn get_flow(&self, metal: Metal) -> Result<Option<Versioned<PendingFlow>>, StoreError> {
        self.ensure_available()?;
        Ok(self.flows.get(&metal).map(|f| f.value().clone()))
    }

    fn create_flow(&self, flow: PendingFlow) -> Result<(Versioned<PendingFlow>, bool), StoreError> {
        self.ensure_available()?;
        Ok(insert_if_absent(&self.flows, flow.metal, flow))
    }

    fn cas_flow(
        &self,
        metal: Metal,
        expected_version: u64,
        next: PendingFlow,
    ) -> Result<CasOutcome, StoreError> {
        self.ensure_available()?;
        compare_and_swap(&self.flows, metal, format!("flow:{metal}"), expected_version, next)
    }

    fn insert_hedge(&self, position: HedgePosition) -> Result<HedgeInsert, StoreError> {
        self.ensure_available()?;

        let Some(order_id) = position.linked_order_id else {
            let (stored, created) = insert_if_absent(&self.hedges, position.hedge_id, position);
            return Ok(HedgeInsert {
                position: stored,
                created,
            });
        };

        // Lock order: linked index first, then the hedge shard
        match self.hedges_by_order.entry(order_id) {
            Entry::Occupied(linked) => {
                let hedge_id = *linked.get();
                let existing = self.hedges.get(&hedge_id).map(|h| h.value().clone()).ok_or_else(|| {
                    StoreError::Corrupted {
                        key: format!("hedge:{hedge_id}"),
                        reason: format!("indexed by order {order_id} but missing"),
                    }
                })?;
                Ok(HedgeInsert {
                    position: existing,
                    created: false,
                })
            }
            Entry::Vacant(slot) => {
                let (stored, created) = insert_if_absent(&self.hedges, position.hedge_id, position);
                slot.insert(stored.value.hedge_id);
                Ok(HedgeInsert {
                    position: stored,
                    created,
                })
            }
        }
    }

    fn get_hedge(&self, hedge_id: HedgeId) -> Result<Option<Versioned<HedgePosition>>, StoreError> {
        self.ensure_available()?;
        Ok(self.hedges.get(&hedge_id).map(|h| h.value().clone()))
    }

    fn cas_hedge(
        &self,
        hedge_id: HedgeId,
        expected_version: u64,
        next: HedgePosition,
    ) -> Result<CasOutcome, StoreError> {
        self.ensure_available()?;
        compare_and_swap(&self.hedges, hedge_id, format!("hedge:{hedge_id}"), expected_version, next)
    }

    fn list_hedges(&self) -> Result<Vec<HedgePosition>, StoreError> {
        self.ensure_available()?;
        let mut hedges: Vec<HedgePosition> = self.hedges.iter().map(|h| h.value.clone()).collect();
        // UUID v7 ids sort chronologically
        hedges.sort_by_key(|h| h.hedge_id);
        Ok(hedges)
    }

    fn claim_order(&self, order_id: OrderId) -> Result<bool, StoreError> {
        self.ensure_available()?;
        match self.matches.entry(order_id) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(MatchSlot::Claimed);
                Ok(true)
            }
        }
    }

    fn release_order(&self, order_id: OrderId) -> Result<(), StoreError> {
        self.ensure_available()?;
        self.matches
            .remove_if(&order_id, |_, slot| matches!(slot, MatchSlot::Claimed));
        Ok(())
    }

    fn record_match(&self, result: MatchResult) -> Result<bool, StoreError> {
        self.ensure_available()?;
        match self.matches.entry(result.order_id) {
            Entry::Occupied(mut slot) => {
                if matches!(slot.get(), MatchSlot::Recorded(_)) {
                    return Ok(false);
                }
                slot.insert(MatchSlot::Recorded(result));
                Ok(true)
            }
            Entry::Vacant(slot) => {
                slot.insert(MatchSlot::Recorded(result));
                Ok(true)
            }
        }
    }

    fn get_match(&self, order_id: OrderId) -> Result<Option<MatchResult>, StoreError> {
        self.ensure_available()?;
        Ok(self.matches.get(&order_id).and_then(|slot| match slot.value() {
            MatchSlot::Recorded(result) => Some(result.clone()),
            MatchSlot::Claimed => None,
        }))
    }

    fn append_event(&self, metal: Metal, event: &LedgerEvent, timestamp: i64) -> Result<u64, StoreError> {
        self.ensure_available()?;
        let mut entries = self.journals.entry(metal).or_default();
        let sequence = entries.len() as u64 + 1;
        let entry = JournalEntry::from_event(sequence, timestamp, event).map_err(|e| {
            StoreError::Corrupted {
                key: format!("journal:{metal}"),
                reason: e.to_string(),
            }
        })?;
        entries.push(entry);
        Ok(sequence)
    }

    fn journal(&self, metal: Metal) -> Result<Vec<JournalEntry>, StoreError> {
        self.ensure_available()?;
        Ok(self.journals.get(&metal).map(|j| j.value().clone()).unwrap_or_default())
    }

    fn metals(&self) -> Result<Vec<Metal>, StoreError> {
        self.ensure_available()?;
        let mut metals: Vec<Metal> = self.ledgers.iter().map(|l| *l.key()).collect();
        metals.sort();
        Ok(metals)
    }
}
