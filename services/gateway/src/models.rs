use std::str::FromStr;

use hedge_engine::{ExposureBooking, HedgeClose};
use inventory::{OrderCheck, StockLevel};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use types::errors::ValidationError;
use types::hedge::ReasonCode;
use types::ids::{HedgeId, OrderId};
use types::ledger::{positive_grams, MetalLedger};
use types::matching::MatchResult;
use types::metal::Metal;
use types::numeric::{Grams, Price};
use types::order::{Quote, Side};

use crate::error::AppError;
use crate::orchestrator::{ConversionOutcome, TradeOutcome};

// Metals and quantities arrive as raw strings/decimals so that bad values
// come back as 400 with the core's validation message.

pub fn parse_metal(raw: &str) -> Result<Metal, AppError> {
    Ok(Metal::from_str(raw).map_err(types::errors::CoreError::from)?)
}

pub fn parse_grams(raw: Decimal) -> Result<Grams, AppError> {
    Ok(positive_grams(raw).map_err(types::errors::CoreError::from)?)
}

/// Zero allowed
pub fn parse_exposure_grams(raw: Decimal) -> Result<Grams, AppError> {
    Grams::try_new(raw).ok_or_else(|| {
        AppError::Core(ValidationError::NonPositiveGrams { grams: raw }.into())
    })
}

pub fn parse_price(raw: Decimal) -> Result<Price, AppError> {
    Price::try_new(raw).ok_or_else(|| {
        AppError::Core(ValidationError::InvalidPrice(format!("price must be positive, got {raw}")).into())
    })
}

pub fn parse_hedge_id(raw: &str) -> Result<HedgeId, AppError> {
    HedgeId::from_str(raw).map_err(|e| AppError::BadRequest(format!("Invalid hedge id {raw}: {e}")))
}

pub fn parse_order_id(raw: &str) -> Result<OrderId, AppError> {
    OrderId::from_str(raw).map_err(|e| AppError::BadRequest(format!("Invalid order id {raw}: {e}")))
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct QuoteDto {
    pub ask: Decimal,
    pub bid: Decimal,
}

impl QuoteDto {
    pub fn parse(&self) -> Result<Quote, AppError> {
        let quote = Quote {
            ask: parse_price(self.ask)?,
            bid: parse_price(self.bid)?,
        };
        if quote.bid > quote.ask {
            return Err(AppError::Core(
                ValidationError::InvalidPrice(format!("bid {} above ask {}", quote.bid, quote.ask)).into(),
            ));
        }
        Ok(quote)
    }
}

// ── Inventory ──

#[derive(Debug, Clone, Deserialize)]
pub struct CheckOrderRequest {
    pub metal: String,
    pub grams: Decimal,
    pub side: Side,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GramsRequest {
    pub grams: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckResponse {
    pub allowed: bool,
    pub advisory: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<&OrderCheck> for CheckResponse {
    fn from(check: &OrderCheck) -> Self {
        Self {
            allowed: check.allowed,
            advisory: check.advisory,
            reason: check.reason.as_ref().map(ToString::to_string),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LedgerResponse {
    pub ledger: MetalLedger,
    pub stock_level: StockLevel,
}

// ── Matching ──

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitOrderRequest {
    pub side: Side,
    pub metal: String,
    pub grams: Decimal,
    pub price: Decimal,
    pub client_id: String,
    pub counter_asset: String,
}

// ── Hedges ──

#[derive(Debug, Clone, Deserialize)]
pub struct RecordExposureRequest {
    pub metal: String,
    pub grams: Decimal,
    pub side: Side,
    pub price: Decimal,
    #[serde(default = "default_reason")]
    pub reason_code: ReasonCode,
    #[serde(default)]
    pub linked_order_id: Option<OrderId>,
}

fn default_reason() -> ReasonCode {
    ReasonCode::Manual
}

#[derive(Debug, Clone, Serialize)]
pub struct ExposureResponse {
    pub hedge_id: Option<HedgeId>,
    pub needs_hedge: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ExposureResponse {
    pub fn new(booking: ExposureBooking, warnings: Vec<String>) -> Self {
        Self {
            hedge_id: booking.hedge_id,
            needs_hedge: booking.needs_hedge,
            warnings,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CloseHedgeRequest {
    pub close_price: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct CloseHedgeResponse {
    pub hedge_id: HedgeId,
    pub pnl: Decimal,
    pub already_closed: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl CloseHedgeResponse {
    pub fn new(close: HedgeClose, warnings: Vec<String>) -> Self {
        Self {
            hedge_id: close.hedge_id,
            pnl: close.pnl,
            already_closed: close.already_closed,
            warnings,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HedgeQuery {
    pub metal: Option<String>,
    #[serde(default)]
    pub open_only: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarkQuery {
    pub price: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HedgeSummary {
    pub metal: Metal,
    pub net_open_exposure: Decimal,
    pub realized_pnl: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unrealized_pnl: Option<Decimal>,
}

// ── Trades ──

#[derive(Debug, Clone, Deserialize)]
pub struct TradeRequestDto {
    pub side: Side,
    pub metal: String,
    pub grams: Decimal,
    pub quote: QuoteDto,
    pub client_id: String,
    pub counter_asset: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TradeResponse {
    pub order_id: OrderId,
    pub side: Side,
    pub metal: Metal,
    pub grams: Grams,
    pub price: Price,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check: Option<CheckResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_result: Option<MatchResult>,
    pub degraded_match: bool,
    pub lp_grams: Grams,
    pub hedge_id: Option<HedgeId>,
    pub exposure_unbooked: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl From<TradeOutcome> for TradeResponse {
    fn from(outcome: TradeOutcome) -> Self {
        Self {
            order_id: outcome.order_id,
            side: outcome.side,
            metal: outcome.metal,
            grams: outcome.grams,
            price: outcome.price,
            check: outcome.check.as_ref().map(CheckResponse::from),
            match_result: outcome.match_result,
            degraded_match: outcome.degraded_match,
            lp_grams: outcome.lp_grams,
            hedge_id: outcome.hedge_id,
            exposure_unbooked: outcome.exposure_unbooked,
            warnings: outcome.warnings,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConversionRequest {
    pub from_metal: String,
    pub to_metal: String,
    pub grams: Decimal,
    pub from_quote: QuoteDto,
    pub to_quote: QuoteDto,
    pub client_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversionResponse {
    pub from_grams: Grams,
    pub to_grams: Grams,
    pub sell_leg: TradeResponse,
    pub buy_leg: TradeResponse,
}

impl From<ConversionOutcome> for ConversionResponse {
    fn from(outcome: ConversionOutcome) -> Self {
        Self {
            from_grams: outcome.from_grams,
            to_grams: outcome.to_grams,
            sell_leg: outcome.sell_leg.into(),
            buy_leg: outcome.buy_leg.into(),
        }
    }
}
