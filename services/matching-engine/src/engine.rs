//! Matching engine core
//!
//! Main coordinator: one compare-and-swap on the metal's pending flow pair
//! per submission, then a write-once record of the result.

use std::collections::HashMap;
use std::sync::Arc;

use ledger_store::cas::{self, Mutation};
use ledger_store::LedgerStore;
use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};
use types::clock::now_nanos;
use types::errors::{CoreError, StoreError, ValidationError};
use types::ids::{ClientId, OrderId};
use types::ledger::{require_positive, PendingFlow};
use types::matching::MatchResult;
use types::metal::Metal;
use types::numeric::{Grams, Price};
use types::order::{Order, Side};

use crate::netting;

/// Matching engine configuration
#[derive(Debug, Clone)]
pub struct MatchingConfig {
    /// Structural spread per metal, counter currency per gram
    pub spreads: HashMap<Metal, Decimal>,
    /// Compare-and-swap attempts before surfacing contention
    pub max_cas_attempts: u32,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            spreads: HashMap::from([
                (Metal::XAU, Decimal::new(50, 2)),
                (Metal::XAG, Decimal::new(2, 2)),
                (Metal::XPT, Decimal::new(40, 2)),
                (Metal::XPD, Decimal::new(60, 2)),
            ]),
            max_cas_attempts: 16,
        }
    }
}

/// Main matching engine
#[derive(Clone)]
pub struct MatchingEngine {
    store: Arc<dyn LedgerStore>,
    config: MatchingConfig,
}

impl MatchingEngine {
    /// Create a matching engine with default configuration
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self::with_config(store, MatchingConfig::default())
    }

    /// Create a matching engine with custom configuration
    pub fn with_config(store: Arc<dyn LedgerStore>, config: MatchingConfig) -> Self {
        Self { store, config }
    }

    /// Create the metal's pending flow pair if absent
    pub fn bootstrap(&self, metal: Metal) -> Result<PendingFlow, CoreError> {
        let (flow, _) = self.store.create_flow(PendingFlow::new(metal))?;
        Ok(flow.value)
    }

    /// Submit an order for internal matching
    ///
    /// Builds an order with a fresh id; see `submit_order`.
    pub fn submit_for_matching(
        &self,
        side: Side,
        metal: Metal,
        grams: Grams,
        price: Price,
        client_id: ClientId,
        counter_asset: impl Into<String>,
    ) -> Result<MatchResult, CoreError> {
        let order = Order::new(client_id, metal, side, grams, price, counter_asset, now_nanos());
        self.submit_order(&order)
    }

    /// Net an order against opposite pending flow.
    ///
    /// The order id is claimed in the store before the flow is touched, so
    /// each id nets at most once. Resubmitting an id that already has a
    /// result returns that result; one whose first submission is still in
    /// flight gets `StoreError::InFlight`.
    pub fn submit_order(&self, order: &Order) -> Result<MatchResult, CoreError> {
        require_positive(order.grams)?;
        let spread = self.structural_spread(order.metal)?;

        if let Some(existing) = self.store.get_match(order.order_id)? {
            debug!(order_id = %order.order_id, "Order already matched");
            return Ok(existing);
        }

        if !self.store.claim_order(order.order_id)? {
            return match self.store.get_match(order.order_id)? {
                Some(existing) => Ok(existing),
                None => {
                    warn!(order_id = %order.order_id, "Order id claimed by another submission");
                    Err(StoreError::InFlight {
                        key: format!("order:{}", order.order_id),
                    }
                    .into())
                }
            };
        }

        let side = order.side;
        let updated = cas::update_flow(
            self.store.as_ref(),
            order.metal,
            self.config.max_cas_attempts,
            |flow| {
                let netting = netting::net(flow, side, order.grams);
                let captured = netting::spread_captured(netting.matched_grams, spread)?;
                netting::apply(flow, side, &netting)?;
                Ok(Mutation::Commit((netting, captured)))
            },
        );
        let (netting, spread_captured) = match updated {
            Ok(updated) => updated.output,
            Err(e) => {
                // Nothing netted; let a retry claim the id again
                if let Err(release) = self.store.release_order(order.order_id) {
                    error!(
                        order_id = %order.order_id,
                        error = %release,
                        "Failed to release order claim"
                    );
                }
                return Err(e);
            }
        };

        let result = MatchResult {
            order_id: order.order_id,
            client_id: order.client_id.clone(),
            metal: order.metal,
            side,
            requested_grams: order.grams,
            price: order.price,
            counter_asset: order.counter_asset.clone(),
            matched: !netting.matched_grams.is_zero(),
            matched_grams: netting.matched_grams,
            match_type: netting.match_type,
            spread_captured,
            requires_lp: !netting.lp_grams.is_zero(),
            lp_grams: netting.lp_grams,
            counterparty_order_id: None,
            submitted_at: order.created_at,
        };
        debug_assert!(result.check_invariant(), "Match result does not conserve grams");

        match self.store.record_match(result.clone()) {
            Ok(true) => {}
            Ok(false) => {
                warn!(order_id = %order.order_id, "Match result already recorded; keeping original");
                if let Some(original) = self.store.get_match(order.order_id)? {
                    return Ok(original);
                }
            }
            // The flow change is committed and the claim stays held, so a
            // resubmission reports in-flight rather than netting again
            Err(e) => error!(
                order_id = %order.order_id,
                error = %e,
                "Failed to record match result"
            ),
        }

        if result.matched {
            info!(
                order_id = %order.order_id,
                metal = %order.metal,
                side = side.as_str(),
                matched = %result.matched_grams,
                lp = %result.lp_grams,
                spread_captured = %result.spread_captured,
                "Order netted internally"
            );
        } else {
            debug!(
                order_id = %order.order_id,
                metal = %order.metal,
                side = side.as_str(),
                lp = %result.lp_grams,
                "No opposite flow; order needs LP"
            );
        }

        Ok(result)
    }

    /// Stored result for an order
    pub fn match_result(&self, order_id: OrderId) -> Result<Option<MatchResult>, CoreError> {
        Ok(self.store.get_match(order_id)?)
    }

    /// Current pending flow snapshot
    pub fn pending_flow(&self, metal: Metal) -> Result<PendingFlow, CoreError> {
        self.store
            .get_flow(metal)?
            .map(|f| f.value)
            .ok_or_else(|| {
                ValidationError::UnknownMetal {
                    symbol: metal.symbol().to_string(),
                }
                .into()
            })
    }

    pub fn structural_spread(&self, metal: Metal) -> Result<Decimal, CoreError> {
        self.config.spreads.get(&metal).copied().ok_or_else(|| {
            ValidationError::UnknownMetal {
                symbol: metal.symbol().to_string(),
            }
            .into()
        })
    }
}
