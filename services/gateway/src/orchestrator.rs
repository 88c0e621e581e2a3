//! Trade orchestration
//!
//! Runs the check -> match -> hedge sequence for client trades and owns the
//! fail-open policy: the core engines surface every failure, and this layer
//! decides which ones block a trade.

use hedge_engine::{ExposureBooking, HedgeClose, HedgeEngine};
use inventory::{InventoryManager, OrderCheck};
use matching_engine::MatchingEngine;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use types::clock::now_nanos;
use types::errors::{CoreError, ValidationError};
use types::hedge::ReasonCode;
use types::ids::{ClientId, HedgeId, OrderId};
use types::ledger::{positive_grams, require_positive};
use types::matching::MatchResult;
use types::metal::Metal;
use types::numeric::{Grams, Price};
use types::order::{Order, Quote, Side};

/// Which capacity refusals block a trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradePolicy {
    pub enforce_buy_capacity: bool,
    pub enforce_sell_capacity: bool,
}

impl Default for TradePolicy {
    fn default() -> Self {
        Self {
            enforce_buy_capacity: true,
            enforce_sell_capacity: false,
        }
    }
}

impl TradePolicy {
    fn enforces(&self, side: Side) -> bool {
        match side {
            Side::BUY => self.enforce_buy_capacity,
            Side::SELL => self.enforce_sell_capacity,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TradeRequest {
    pub side: Side,
    pub metal: Metal,
    pub grams: Grams,
    pub quote: Quote,
    pub client_id: ClientId,
    pub counter_asset: String,
    pub reason: ReasonCode,
}

#[derive(Debug, Clone)]
pub struct TradeOutcome {
    pub order_id: OrderId,
    pub side: Side,
    pub metal: Metal,
    pub grams: Grams,
    pub price: Price,
    /// None when the check itself could not run
    pub check: Option<OrderCheck>,
    /// None when matching failed and the order went to the LP in full
    pub match_result: Option<MatchResult>,
    pub degraded_match: bool,
    pub lp_grams: Grams,
    pub hedge_id: Option<HedgeId>,
    /// The LP remainder could not be booked as a hedge
    pub exposure_unbooked: bool,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ConversionOutcome {
    pub from_grams: Grams,
    pub to_grams: Grams,
    pub sell_leg: TradeOutcome,
    pub buy_leg: TradeOutcome,
}

/// Hedge booking plus the ledger exposure shift that mirrors it
#[derive(Debug, Clone)]
pub struct BookedExposure {
    pub booking: ExposureBooking,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ClosedHedge {
    pub close: HedgeClose,
    pub warnings: Vec<String>,
}

#[derive(Clone)]
pub struct Orchestrator {
    inventory: InventoryManager,
    matching: MatchingEngine,
    hedges: HedgeEngine,
    policy: TradePolicy,
}

impl Orchestrator {
    pub fn new(
        inventory: InventoryManager,
        matching: MatchingEngine,
        hedges: HedgeEngine,
        policy: TradePolicy,
    ) -> Self {
        Self {
            inventory,
            matching,
            hedges,
            policy,
        }
    }

    /// Execute one client buy or sell.
    ///
    /// Bad input and enforced capacity refusals are errors. Store failures
    /// degrade the trade instead of failing it; each degradation is
    /// recorded in `warnings`.
    pub fn execute_trade(&self, request: TradeRequest) -> Result<TradeOutcome, CoreError> {
        require_positive(request.grams)?;
        let TradeRequest {
            side,
            metal,
            grams,
            quote,
            client_id,
            counter_asset,
            reason,
        } = request;
        let mut warnings = Vec::new();

        let check = match self.inventory.check_order_allowed(metal, grams, side) {
            Ok(check) => Some(check),
            Err(e @ CoreError::TransientStore(_)) => {
                warn!(metal = %metal, side = side.as_str(), error = %e, "Capacity check unavailable; proceeding");
                warnings.push(format!("capacity check skipped: {e}"));
                None
            }
            Err(e) => return Err(e),
        };

        if let Some(refusal) = check.as_ref().and_then(|c| c.reason.clone()) {
            if self.policy.enforces(side) {
                return Err(CoreError::Capacity(refusal));
            }
            warn!(metal = %metal, side = side.as_str(), reason = %refusal, "Capacity refusal not enforced; proceeding");
            warnings.push(format!("capacity advisory: {refusal}"));
        }

        let price = quote.price_for(side);
        let order = Order::new(client_id, metal, side, grams, price, counter_asset, now_nanos());

        let (match_result, lp_grams, degraded_match) = match self.matching.submit_order(&order) {
            Ok(result) => {
                let lp = result.lp_grams;
                (Some(result), lp, false)
            }
            Err(e @ CoreError::Validation(_)) => return Err(e),
            Err(e) => {
                warn!(order_id = %order.order_id, metal = %metal, error = %e, "Matching unavailable; routing full order to LP");
                warnings.push(format!("matching skipped: {e}"));
                (None, grams, true)
            }
        };

        let mut hedge_id = None;
        let mut exposure_unbooked = false;
        if !lp_grams.is_zero() {
            match self.book_exposure(metal, lp_grams, side, price, reason, Some(order.order_id)) {
                Ok(booked) => {
                    hedge_id = booked.booking.hedge_id;
                    warnings.extend(booked.warnings);
                }
                Err(e) => {
                    error!(
                        order_id = %order.order_id,
                        metal = %metal,
                        lp_grams = %lp_grams,
                        error = %e,
                        "Exposure not booked"
                    );
                    warnings.push(format!("exposure unbooked: {e}"));
                    exposure_unbooked = true;
                }
            }
        }

        info!(
            order_id = %order.order_id,
            metal = %metal,
            side = side.as_str(),
            grams = %grams,
            lp_grams = %lp_grams,
            degraded = degraded_match || exposure_unbooked,
            "Trade executed"
        );

        Ok(TradeOutcome {
            order_id: order.order_id,
            side,
            metal,
            grams,
            price,
            check,
            match_result,
            degraded_match,
            lp_grams,
            hedge_id,
            exposure_unbooked,
            warnings,
        })
    }

    /// Convert `grams` of one metal into another at the quoted prices.
    ///
    /// The buy leg is sized `grams × from.bid / to.ask`, rounded to 4 dp,
    /// and pre-checked before the sell leg runs. The legs are not atomic: if
    /// the buy leg fails anyway, the executed sell leg stands and is logged.
    pub fn execute_conversion(
        &self,
        from_metal: Metal,
        to_metal: Metal,
        grams: Grams,
        from_quote: Quote,
        to_quote: Quote,
        client_id: ClientId,
    ) -> Result<ConversionOutcome, CoreError> {
        if from_metal == to_metal {
            return Err(ValidationError::InvalidConversion(format!(
                "cannot convert {from_metal} into itself"
            ))
            .into());
        }
        require_positive(grams)?;

        let to_grams = grams
            .checked_mul(from_quote.bid.as_decimal())
            .and_then(|value| value.checked_div(to_quote.ask.as_decimal()))
            .ok_or_else(|| ValidationError::overflow("conversion sizing"))?;
        let to_grams = positive_grams(to_grams.round_dp(4))?;

        // Refuse before selling anything if the buy leg would be refused
        match self.inventory.check_order_allowed(to_metal, to_grams, Side::BUY) {
            Ok(check) => {
                if let Some(refusal) = check.reason {
                    if self.policy.enforces(Side::BUY) {
                        return Err(CoreError::Capacity(refusal));
                    }
                }
            }
            Err(CoreError::TransientStore(_)) => {}
            Err(e) => return Err(e),
        }

        let sell_leg = self.execute_trade(TradeRequest {
            side: Side::SELL,
            metal: from_metal,
            grams,
            quote: from_quote,
            client_id: client_id.clone(),
            counter_asset: to_metal.symbol().to_string(),
            reason: ReasonCode::Conversion,
        })?;

        let buy_leg = match self.execute_trade(TradeRequest {
            side: Side::BUY,
            metal: to_metal,
            grams: to_grams,
            quote: to_quote,
            client_id,
            counter_asset: from_metal.symbol().to_string(),
            reason: ReasonCode::Conversion,
        }) {
            Ok(leg) => leg,
            Err(e) => {
                error!(
                    sell_order_id = %sell_leg.order_id,
                    sell_hedge_id = ?sell_leg.hedge_id,
                    from = %from_metal,
                    to = %to_metal,
                    sold_grams = %grams,
                    to_grams = %to_grams,
                    error = %e,
                    "Conversion buy leg failed after sell leg executed"
                );
                return Err(e);
            }
        };

        info!(
            from = %from_metal,
            to = %to_metal,
            from_grams = %grams,
            to_grams = %to_grams,
            "Conversion executed"
        );

        Ok(ConversionOutcome {
            from_grams: grams,
            to_grams,
            sell_leg,
            buy_leg,
        })
    }

    /// Book a hedge and move the ledger's net exposure by the same grams.
    ///
    /// A client buy leaves the firm short (exposure falls), a client sell
    /// leaves it long. A retry that finds the hedge already booked does not
    /// shift again.
    pub fn book_exposure(
        &self,
        metal: Metal,
        grams: Grams,
        side: Side,
        price: Price,
        reason: ReasonCode,
        linked_order_id: Option<OrderId>,
    ) -> Result<BookedExposure, CoreError> {
        let booking = self
            .hedges
            .record_exposure(metal, grams, side, price, reason, linked_order_id)?;
        let mut warnings = Vec::new();

        if booking.newly_booked {
            let delta = -grams.as_decimal() * side.direction_sign();
            if let Err(e) = self.inventory.shift_exposure(metal, delta) {
                error!(
                    hedge_id = ?booking.hedge_id,
                    metal = %metal,
                    delta = %delta,
                    error = %e,
                    "Ledger exposure not shifted for booked hedge"
                );
                warnings.push(format!("ledger exposure not shifted: {e}"));
            }
        }

        Ok(BookedExposure { booking, warnings })
    }

    /// Close a hedge and unwind the exposure it carried on the ledger.
    pub fn close_hedge(&self, hedge_id: HedgeId, close_price: Price) -> Result<ClosedHedge, CoreError> {
        let position = self.hedges.position(hedge_id)?;
        let close = self.hedges.close_hedge(hedge_id, close_price)?;
        let mut warnings = Vec::new();

        if !close.already_closed {
            let delta = position.grams.as_decimal() * position.side.direction_sign();
            if let Err(e) = self.inventory.shift_exposure(position.metal, delta) {
                error!(
                    hedge_id = %hedge_id,
                    metal = %position.metal,
                    delta = %delta,
                    error = %e,
                    "Ledger exposure not unwound for closed hedge"
                );
                warnings.push(format!("ledger exposure not unwound: {e}"));
            }
        }

        Ok(ClosedHedge { close, warnings })
    }
}
