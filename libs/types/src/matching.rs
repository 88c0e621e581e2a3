//! Match result types
//!
//! A `MatchResult` is computed once at submission and never revised, even
//! when later opposite-side flow could in principle have matched it.

use crate::ids::{ClientId, OrderId};
use crate::metal::Metal;
use crate::numeric::{Grams, Price};
use crate::order::Side;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How much of an order was netted internally
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    /// Entire order netted against opposite flow
    FULL,
    /// Part netted, remainder needs a liquidity provider
    PARTIAL,
    /// Nothing netted
    NONE,
}

/// Outcome of submitting an order for internal matching
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub order_id: OrderId,
    pub client_id: ClientId,
    pub metal: Metal,
    pub side: Side,
    pub requested_grams: Grams,
    pub price: Price,
    pub counter_asset: String,
    pub matched: bool,
    pub matched_grams: Grams,
    pub match_type: MatchType,
    /// Counter-currency captured by netting instead of paying an LP
    pub spread_captured: Decimal,
    pub requires_lp: bool,
    pub lp_grams: Grams,
    /// Always `None` under the pooled-principal model
    pub counterparty_order_id: Option<OrderId>,
    pub submitted_at: i64, // Unix nanos
}

impl MatchResult {
    /// Check quantity conservation: matched + lp = requested
    pub fn check_invariant(&self) -> bool {
        self.matched_grams + self.lp_grams == self.requested_grams
            && self.matched == !self.matched_grams.is_zero()
            && self.requires_lp == !self.lp_grams.is_zero()
    }
}
