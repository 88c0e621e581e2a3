//! Matching Engine Service
//!
//! Nets opposing client order flow internally before any market exposure
//! is created. The firm is the principal on every trade: flow is pooled
//! into two aggregate counters per metal, not an order book.
//!
//! **Key Invariants:**
//! - `matched_grams + lp_grams == requested grams`
//! - Σ matched ≤ min(Σ buy, Σ sell) per metal
//! - A `MatchResult` is fixed at submission and never revised
//! - An order id nets against the pending flow at most once

pub mod netting;
pub mod engine;

pub use engine::{MatchingConfig, MatchingEngine};
