use axum::{
    extract::{Path, State},
    Json,
};
use types::ids::ClientId;
use types::ledger::PendingFlow;
use types::matching::MatchResult;

use crate::error::AppError;
use crate::models::{parse_grams, parse_metal, parse_order_id, parse_price, SubmitOrderRequest};
use crate::state::AppState;

pub async fn submit_order(
    State(state): State<AppState>,
    Json(payload): Json<SubmitOrderRequest>,
) -> Result<Json<MatchResult>, AppError> {
    let metal = parse_metal(&payload.metal)?;
    let grams = parse_grams(payload.grams)?;
    let price = parse_price(payload.price)?;

    let result = state.matching.submit_for_matching(
        payload.side,
        metal,
        grams,
        price,
        ClientId::new(payload.client_id),
        payload.counter_asset,
    )?;
    Ok(Json(result))
}

pub async fn get_match(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Json<MatchResult>, AppError> {
    let order_id = parse_order_id(&order_id)?;
    state
        .matching
        .match_result(order_id)?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("No match result for order {order_id}")))
}

pub async fn pending_flow(
    State(state): State<AppState>,
    Path(metal): Path<String>,
) -> Result<Json<PendingFlow>, AppError> {
    let metal = parse_metal(&metal)?;
    Ok(Json(state.matching.pending_flow(metal)?))
}
