//! Stock level classification

use serde::{Deserialize, Serialize};
use types::ledger::MetalLedger;

/// How much unencumbered stock a ledger has left
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockLevel {
    /// available >= warning threshold
    Healthy,
    /// 0 < available < warning threshold
    Low,
    /// available == 0
    Depleted,
}

/// Classify a ledger against its warning threshold
pub fn classify(ledger: &MetalLedger) -> StockLevel {
    if ledger.available_grams.is_zero() {
        StockLevel::Depleted
    } else if ledger.available_grams < ledger.warning_threshold {
        StockLevel::Low
    } else {
        StockLevel::Healthy
    }
}
