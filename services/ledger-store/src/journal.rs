//! Ledger journal: append-only history of ledger deltas with checksums
//!
//! Every successful inventory mutation appends one `LedgerEvent` to the
//! metal's journal. Events are deltas, so replaying them in any order
//! yields the same totals.
//!
//! # Entry layout
//! ```text
//! sequence:   u64   per-metal, gapless, starting at 1
//! timestamp:  i64   Unix nanos
//! event_type: str
//! payload:    bincode(LedgerEvent)
//! checksum:   u32   CRC32C over sequence+timestamp+event_type+payload
//! ```

use crc32c::crc32c;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use types::numeric::Grams;

// ── Errors ──────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum JournalError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Checksum mismatch at sequence {sequence}")]
    ChecksumMismatch { sequence: u64 },

    #[error("Event type mismatch at sequence {sequence}: header {header}, payload {payload}")]
    EventTypeMismatch {
        sequence: u64,
        header: String,
        payload: String,
    },
}

// ── Ledger Events ───────────────────────────────────────────────────

/// A single ledger delta
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LedgerEvent {
    Bootstrapped { initial_stock: Grams },
    Deposited { grams: Grams },
    Withdrawn { grams: Grams },
    Reserved { grams: Grams },
    ReservationReleased { grams: Grams },
    Allocated { grams: Grams },
    Deallocated { grams: Grams },
    ExposureShifted { delta: Decimal },
}

impl LedgerEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            LedgerEvent::Bootstrapped { .. } => "LedgerBootstrapped",
            LedgerEvent::Deposited { .. } => "StockDeposited",
            LedgerEvent::Withdrawn { .. } => "StockWithdrawn",
            LedgerEvent::Reserved { .. } => "StockReserved",
            LedgerEvent::ReservationReleased { .. } => "ReservationReleased",
            LedgerEvent::Allocated { .. } => "ClientAllocated",
            LedgerEvent::Deallocated { .. } => "ClientDeallocated",
            LedgerEvent::ExposureShifted { .. } => "ExposureShifted",
        }
    }

    /// Fold this delta into running totals
    pub fn apply(&self, totals: &mut LedgerTotals) {
        match self {
            LedgerEvent::Bootstrapped { initial_stock } => {
                totals.total += initial_stock.as_decimal();
                totals.available += initial_stock.as_decimal();
            }
            LedgerEvent::Deposited { grams } => {
                totals.total += grams.as_decimal();
                totals.available += grams.as_decimal();
            }
            LedgerEvent::Withdrawn { grams } => {
                totals.total -= grams.as_decimal();
                totals.available -= grams.as_decimal();
            }
            LedgerEvent::Reserved { grams } => {
                totals.available -= grams.as_decimal();
                totals.reserved += grams.as_decimal();
            }
            LedgerEvent::ReservationReleased { grams } => {
                totals.reserved -= grams.as_decimal();
                totals.available += grams.as_decimal();
            }
            LedgerEvent::Allocated { grams } => {
                totals.available -= grams.as_decimal();
                totals.allocated += grams.as_decimal();
            }
            LedgerEvent::Deallocated { grams } => {
                totals.allocated -= grams.as_decimal();
                totals.available += grams.as_decimal();
            }
            LedgerEvent::ExposureShifted { delta } => {
                totals.net_exposure += *delta;
            }
        }
    }
}

/// Signed running totals, allowed to go negative while replaying a
/// damaged history so the drift is visible instead of clamped
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTotals {
    pub total: Decimal,
    pub available: Decimal,
    pub reserved: Decimal,
    pub allocated: Decimal,
    pub net_exposure: Decimal,
}

// ── Journal Entry ───────────────────────────────────────────────────

/// A single journal entry representing one persisted ledger delta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Per-metal monotonic sequence number
    pub sequence: u64,
    /// Unix nanosecond timestamp
    pub timestamp: i64,
    pub event_type: String,
    /// Bincode-serialized `LedgerEvent`
    pub payload: Vec<u8>,
    /// CRC32C checksum over (sequence ++ timestamp ++ event_type ++ payload)
    pub checksum: u32,
}

impl JournalEntry {
    /// Create a new entry, computing the CRC32C checksum automatically.
    pub fn new(sequence: u64, timestamp: i64, event_type: String, payload: Vec<u8>) -> Self {
        let checksum = Self::compute_checksum(sequence, timestamp, &event_type, &payload);
        Self {
            sequence,
            timestamp,
            event_type,
            payload,
            checksum,
        }
    }

    /// Serialize a ledger event into a new entry.
    pub fn from_event(sequence: u64, timestamp: i64, event: &LedgerEvent) -> Result<Self, JournalError> {
        let payload = bincode::serialize(event)?;
        Ok(Self::new(sequence, timestamp, event.event_type().to_string(), payload))
    }

    /// Compute CRC32C over the concatenation of (sequence, timestamp, event_type, payload).
    pub fn compute_checksum(sequence: u64, timestamp: i64, event_type: &str, payload: &[u8]) -> u32 {
        let mut buf = Vec::with_capacity(8 + 8 + event_type.len() + payload.len());
        buf.extend_from_slice(&sequence.to_le_bytes());
        buf.extend_from_slice(&timestamp.to_le_bytes());
        buf.extend_from_slice(event_type.as_bytes());
        buf.extend_from_slice(payload);
        crc32c(&buf)
    }

    /// Validate the stored checksum against recomputed value.
    pub fn verify_checksum(&self) -> bool {
        let expected =
            Self::compute_checksum(self.sequence, self.timestamp, &self.event_type, &self.payload);
        self.checksum == expected
    }

    /// Verify and decode the payload.
    pub fn decode(&self) -> Result<LedgerEvent, JournalError> {
        if !self.verify_checksum() {
            return Err(JournalError::ChecksumMismatch {
                sequence: self.sequence,
            });
        }
        let event: LedgerEvent = bincode::deserialize(&self.payload)?;
        if event.event_type() != self.event_type {
            return Err(JournalError::EventTypeMismatch {
                sequence: self.sequence,
                header: self.event_type.clone(),
                payload: event.event_type().to_string(),
            });
        }
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TS: i64 = 1708123456789000000;

    #[test]
    fn test_entry_checksum_valid() {
        let entry = JournalEntry::new(1, TS, "StockDeposited".into(), vec![1, 2, 3]);
        assert!(entry.verify_checksum());
    }

    #[test]
    fn test_tampered_payload_detected() {
        let mut entry = JournalEntry::from_event(
            4,
            TS,
            &LedgerEvent::Allocated {
                grams: Grams::from_u64(2),
            },
        )
        .unwrap();
        entry.payload[0] ^= 0xFF;
        assert!(!entry.verify_checksum());
        assert!(matches!(
            entry.decode(),
            Err(JournalError::ChecksumMismatch { sequence: 4 })
        ));
    }

    #[test]
    fn test_decode_event() {
        let event = LedgerEvent::ExposureShifted {
            delta: Decimal::from(-12),
        };
        let entry = JournalEntry::from_event(1, TS, &event).unwrap();
        assert_eq!(entry.event_type, "ExposureShifted");
        assert_eq!(entry.decode().unwrap(), event);
    }

    #[test]
    fn test_mismatched_header_rejected() {
        let event = LedgerEvent::Deposited {
            grams: Grams::from_u64(1),
        };
        let payload = bincode::serialize(&event).unwrap();
        let entry = JournalEntry::new(9, TS, "StockWithdrawn".into(), payload);
        assert!(matches!(
            entry.decode(),
            Err(JournalError::EventTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_allocation_roundtrip_nets_to_zero() {
        let mut totals = LedgerTotals::default();
        LedgerEvent::Bootstrapped {
            initial_stock: Grams::from_u64(50),
        }
        .apply(&mut totals);
        let before = totals;
        LedgerEvent::Allocated {
            grams: Grams::from_u64(20),
        }
        .apply(&mut totals);
        LedgerEvent::Deallocated {
            grams: Grams::from_u64(20),
        }
        .apply(&mut totals);
        assert_eq!(totals, before);
    }
}

// ── Property-Based Tests ────────────────────────────────────────────
