use axum::{extract::State, Json};
use types::hedge::ReasonCode;
use types::ids::ClientId;

use crate::error::AppError;
use crate::models::{
    parse_grams, parse_metal, ConversionRequest, ConversionResponse, TradeRequestDto,
    TradeResponse,
};
use crate::orchestrator::TradeRequest;
use crate::state::AppState;

pub async fn execute_trade(
    State(state): State<AppState>,
    Json(payload): Json<TradeRequestDto>,
) -> Result<Json<TradeResponse>, AppError> {
    let request = TradeRequest {
        side: payload.side,
        metal: parse_metal(&payload.metal)?,
        grams: parse_grams(payload.grams)?,
        quote: payload.quote.parse()?,
        client_id: ClientId::new(payload.client_id),
        counter_asset: payload.counter_asset,
        reason: ReasonCode::for_client_side(payload.side),
    };
    let outcome = state.orchestrator.execute_trade(request)?;
    Ok(Json(outcome.into()))
}

pub async fn execute_conversion(
    State(state): State<AppState>,
    Json(payload): Json<ConversionRequest>,
) -> Result<Json<ConversionResponse>, AppError> {
    let outcome = state.orchestrator.execute_conversion(
        parse_metal(&payload.from_metal)?,
        parse_metal(&payload.to_metal)?,
        parse_grams(payload.grams)?,
        payload.from_quote.parse()?,
        payload.to_quote.parse()?,
        ClientId::new(payload.client_id),
    )?;
    Ok(Json(outcome.into()))
}
