//! Hedge position lifecycle types
//!
//! State machine: `open -> closed` (terminal). There is no cancelled state;
//! a booked hedge always represents real recorded exposure.

use crate::errors::ValidationError;
use crate::ids::{HedgeId, OrderId};
use crate::metal::Metal;
use crate::numeric::{Grams, Price};
use crate::order::Side;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Hedge position status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HedgeStatus {
    OPEN,
    CLOSED,
}

/// Why an exposure was booked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    /// Unmatched remainder of a client purchase
    ClientBuy,
    /// Unmatched remainder of a client sale
    ClientSell,
    /// One leg of a metal-to-metal conversion
    Conversion,
    InventoryRebalance,
    Manual,
}

impl ReasonCode {
    /// Default reason for the unmatched remainder of a client order
    pub fn for_client_side(side: Side) -> Self {
        match side {
            Side::BUY => ReasonCode::ClientBuy,
            Side::SELL => ReasonCode::ClientSell,
        }
    }
}

/// A booked record of residual market exposure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HedgePosition {
    pub hedge_id: HedgeId,
    pub metal: Metal,
    pub side: Side,
    pub grams: Grams,
    pub entry_price: Price,
    pub reason_code: ReasonCode,
    pub linked_order_id: Option<OrderId>,
    pub status: HedgeStatus,
    pub close_price: Option<Price>,
    pub realized_pnl: Option<Decimal>,
    pub opened_at: i64,
    pub closed_at: Option<i64>,
}

impl HedgePosition {
    /// Open a new position
    pub fn open(
        metal: Metal,
        side: Side,
        grams: Grams,
        entry_price: Price,
        reason_code: ReasonCode,
        linked_order_id: Option<OrderId>,
        timestamp: i64,
    ) -> Self {
        Self {
            hedge_id: HedgeId::new(),
            metal,
            side,
            grams,
            entry_price,
            reason_code,
            linked_order_id,
            status: HedgeStatus::OPEN,
            close_price: None,
            realized_pnl: None,
            opened_at: timestamp,
            closed_at: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == HedgeStatus::OPEN
    }

    /// P&L if the position were closed at `price`
    ///
    /// `grams × (price - entry_price) × direction_sign(side)`
    pub fn pnl_at(&self, price: Price) -> Result<Decimal, ValidationError> {
        price
            .as_decimal()
            .checked_sub(self.entry_price.as_decimal())
            .and_then(|move_per_gram| self.grams.checked_mul(move_per_gram))
            .map(|pnl| pnl * self.side.direction_sign())
            .ok_or_else(|| ValidationError::overflow("hedge P&L"))
    }

    /// Close the position and return realized P&L
    ///
    /// Closing an already-closed position returns the stored P&L and leaves
    /// every field untouched. A P&L out of decimal range is an error and
    /// leaves the position open.
    pub fn close(&mut self, close_price: Price, timestamp: i64) -> Result<Decimal, ValidationError> {
        if let (HedgeStatus::CLOSED, Some(pnl)) = (self.status, self.realized_pnl) {
            return Ok(pnl);
        }

        let pnl = self.pnl_at(close_price)?;
        self.status = HedgeStatus::CLOSED;
        self.close_price = Some(close_price);
        self.realized_pnl = Some(pnl);
        self.closed_at = Some(timestamp);
        Ok(pnl)
    }

    /// Signed grams of open exposure: buy positive, sell negative, zero once closed
    pub fn signed_open_grams(&self) -> Decimal {
        if self.is_open() {
            self.grams.as_decimal() * self.side.direction_sign()
        } else {
            Decimal::ZERO
        }
    }
}
