//! Hedge engine: position lifecycle over the ledger store

use std::sync::Arc;

use ledger_store::cas::{self, Mutation};
use ledger_store::LedgerStore;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use types::clock::now_nanos;
use types::errors::{CoreError, ValidationError};
use types::hedge::{HedgePosition, ReasonCode};
use types::ids::{HedgeId, OrderId};
use types::metal::Metal;
use types::numeric::{Grams, Price};
use types::order::Side;

use crate::pnl;

/// Hedge engine configuration
#[derive(Debug, Clone)]
pub struct HedgeConfig {
    /// Compare-and-swap attempts before surfacing contention
    pub max_cas_attempts: u32,
}

impl Default for HedgeConfig {
    fn default() -> Self {
        Self {
            max_cas_attempts: 16,
        }
    }
}

/// Outcome of `record_exposure`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExposureBooking {
    pub hedge_id: Option<HedgeId>,
    pub needs_hedge: bool,
    /// False when a retry found the hedge already booked for its order
    pub newly_booked: bool,
}

/// Outcome of `close_hedge`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HedgeClose {
    pub hedge_id: HedgeId,
    pub pnl: Decimal,
    /// True when the position was already closed and nothing was written
    pub already_closed: bool,
}

/// Hedge engine service
#[derive(Clone)]
pub struct HedgeEngine {
    store: Arc<dyn LedgerStore>,
    config: HedgeConfig,
}

impl HedgeEngine {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self::with_config(store, HedgeConfig::default())
    }

    pub fn with_config(store: Arc<dyn LedgerStore>, config: HedgeConfig) -> Self {
        Self { store, config }
    }

    /// Book residual exposure as an open hedge position.
    ///
    /// The metal must have a bootstrapped ledger. Zero grams books nothing.
    /// With a `linked_order_id`, a retry for the same order returns the
    /// hedge booked the first time.
    pub fn record_exposure(
        &self,
        metal: Metal,
        grams: Grams,
        side: Side,
        price: Price,
        reason_code: ReasonCode,
        linked_order_id: Option<OrderId>,
    ) -> Result<ExposureBooking, CoreError> {
        if self.store.get_ledger(metal)?.is_none() {
            return Err(ValidationError::UnknownMetal {
                symbol: metal.symbol().to_string(),
            }
            .into());
        }

        if grams.is_zero() {
            debug!(metal = %metal, "No residual exposure to book");
            return Ok(ExposureBooking {
                hedge_id: None,
                needs_hedge: false,
                newly_booked: false,
            });
        }

        let position = HedgePosition::open(
            metal,
            side,
            grams,
            price,
            reason_code,
            linked_order_id,
            now_nanos(),
        );
        let inserted = self.store.insert_hedge(position)?;
        let hedge_id = inserted.position.value.hedge_id;

        if inserted.created {
            info!(
                hedge_id = %hedge_id,
                metal = %metal,
                side = side.as_str(),
                grams = %grams,
                entry_price = %price,
                reason = ?reason_code,
                "Hedge booked"
            );
        } else {
            debug!(
                hedge_id = %hedge_id,
                linked_order_id = ?linked_order_id,
                "Exposure already booked for order"
            );
        }

        Ok(ExposureBooking {
            hedge_id: Some(hedge_id),
            needs_hedge: true,
            newly_booked: inserted.created,
        })
    }

    /// Close a hedge and realize its P&L.
    ///
    /// Closing an already-closed position returns the stored P&L without
    /// writing. When two closes race, the loser re-reads and returns the
    /// winner's P&L.
    pub fn close_hedge(&self, hedge_id: HedgeId, close_price: Price) -> Result<HedgeClose, CoreError> {
        let timestamp = now_nanos();
        let updated = cas::update_hedge(
            self.store.as_ref(),
            hedge_id,
            self.config.max_cas_attempts,
            |position| {
                let was_open = position.is_open();
                let pnl = position.close(close_price, timestamp)?;
                Ok(if was_open {
                    Mutation::Commit(pnl)
                } else {
                    Mutation::Skip(pnl)
                })
            },
        )?;

        if updated.written {
            info!(
                hedge_id = %hedge_id,
                close_price = %close_price,
                pnl = %updated.output,
                "Hedge closed"
            );
        } else {
            debug!(hedge_id = %hedge_id, "Hedge already closed");
        }

        Ok(HedgeClose {
            hedge_id,
            pnl: updated.output,
            already_closed: !updated.written,
        })
    }

    pub fn position(&self, hedge_id: HedgeId) -> Result<HedgePosition, CoreError> {
        self.store
            .get_hedge(hedge_id)?
            .map(|v| v.value)
            .ok_or_else(|| ValidationError::HedgeNotFound { hedge_id }.into())
    }

    /// Positions in booking order, optionally for one metal
    pub fn positions(&self, metal: Option<Metal>) -> Result<Vec<HedgePosition>, CoreError> {
        let mut positions = self.store.list_hedges()?;
        if let Some(metal) = metal {
            positions.retain(|p| p.metal == metal);
        }
        Ok(positions)
    }

    pub fn open_positions(&self, metal: Option<Metal>) -> Result<Vec<HedgePosition>, CoreError> {
        let mut positions = self.positions(metal)?;
        positions.retain(HedgePosition::is_open);
        Ok(positions)
    }

    /// Signed open grams for a metal, buy positive
    pub fn net_open_exposure(&self, metal: Metal) -> Result<Decimal, CoreError> {
        Ok(pnl::net_open_exposure(&self.open_positions(Some(metal))?)?)
    }

    /// Unrealized P&L of open positions at `price`
    pub fn mark_to_market(&self, metal: Metal, price: Price) -> Result<Decimal, CoreError> {
        Ok(pnl::unrealized_pnl(&self.open_positions(Some(metal))?, price)?)
    }

    pub fn realized_pnl(&self, metal: Metal) -> Result<Decimal, CoreError> {
        Ok(pnl::total_realized_pnl(&self.positions(Some(metal))?)?)
    }
}
