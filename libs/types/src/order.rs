//! Order types
//!
//! Orders are ephemeral: they exist for the duration of one submission and
//! are never persisted beyond the resulting `MatchResult`.

use crate::ids::{ClientId, OrderId};
use crate::metal::Metal;
use crate::numeric::{Grams, Price};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order side, from the client's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Client buys metal (firm releases stock)
    BUY,
    /// Client sells metal (firm receives stock)
    SELL,
}

impl Side {
    /// Get the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Side::BUY => Side::SELL,
            Side::SELL => Side::BUY,
        }
    }

    /// +1 for buy, -1 for sell
    pub fn direction_sign(&self) -> Decimal {
        match self {
            Side::BUY => Decimal::ONE,
            Side::SELL => Decimal::NEGATIVE_ONE,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::BUY => "buy",
            Side::SELL => "sell",
        }
    }
}

/// Two-sided quote from the external price feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub ask: Price,
    pub bid: Price,
}

impl Quote {
    /// Execution price for a client order: buys pay the ask, sells receive the bid
    pub fn price_for(&self, side: Side) -> Price {
        match side {
            Side::BUY => self.ask,
            Side::SELL => self.bid,
        }
    }
}

/// A client order as seen by the matching engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub client_id: ClientId,
    pub metal: Metal,
    pub side: Side,
    pub grams: Grams,
    pub price: Price,
    /// Asset paid or received in exchange (fiat code or another metal symbol)
    pub counter_asset: String,
    pub created_at: i64, // Unix nanos
}

impl Order {
    /// Create a new order with a fresh id
    pub fn new(
        client_id: ClientId,
        metal: Metal,
        side: Side,
        grams: Grams,
        price: Price,
        counter_asset: impl Into<String>,
        timestamp: i64,
    ) -> Self {
        Self {
            order_id: OrderId::new(),
            client_id,
            metal,
            side,
            grams,
            price,
            counter_asset: counter_asset.into(),
            created_at: timestamp,
        }
    }

    /// Notional value in the counter asset, None when out of decimal range
    pub fn notional(&self) -> Option<Decimal> {
        self.grams.checked_mul(self.price.as_decimal())
    }
}
