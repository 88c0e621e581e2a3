use axum::{
    extract::{Path, State},
    Json,
};
use types::ledger::MetalLedger;

use crate::error::AppError;
use crate::models::{
    parse_grams, parse_metal, CheckOrderRequest, CheckResponse, GramsRequest, LedgerResponse,
};
use crate::state::AppState;

fn snapshot(ledger: MetalLedger) -> Json<LedgerResponse> {
    let stock_level = ::inventory::stock::classify(&ledger);
    Json(LedgerResponse { ledger, stock_level })
}

pub async fn check_order(
    State(state): State<AppState>,
    Json(payload): Json<CheckOrderRequest>,
) -> Result<Json<CheckResponse>, AppError> {
    let metal = parse_metal(&payload.metal)?;
    let grams = parse_grams(payload.grams)?;
    let check = state.inventory.check_order_allowed(metal, grams, payload.side)?;
    Ok(Json(CheckResponse::from(&check)))
}

pub async fn get_ledger(
    State(state): State<AppState>,
    Path(metal): Path<String>,
) -> Result<Json<LedgerResponse>, AppError> {
    let metal = parse_metal(&metal)?;
    let ledger = state.inventory.ledger(metal)?;
    Ok(snapshot(ledger))
}

pub async fn allocate(
    State(state): State<AppState>,
    Path(metal): Path<String>,
    Json(payload): Json<GramsRequest>,
) -> Result<Json<LedgerResponse>, AppError> {
    let metal = parse_metal(&metal)?;
    let grams = parse_grams(payload.grams)?;
    let ledger = state.inventory.record_client_allocation(metal, grams)?;
    Ok(snapshot(ledger))
}

pub async fn deallocate(
    State(state): State<AppState>,
    Path(metal): Path<String>,
    Json(payload): Json<GramsRequest>,
) -> Result<Json<LedgerResponse>, AppError> {
    let metal = parse_metal(&metal)?;
    let grams = parse_grams(payload.grams)?;
    let ledger = state.inventory.record_client_deallocation(metal, grams)?;
    Ok(snapshot(ledger))
}

pub async fn deposit(
    State(state): State<AppState>,
    Path(metal): Path<String>,
    Json(payload): Json<GramsRequest>,
) -> Result<Json<LedgerResponse>, AppError> {
    let metal = parse_metal(&metal)?;
    let grams = parse_grams(payload.grams)?;
    let ledger = state.inventory.deposit_stock(metal, grams)?;
    Ok(snapshot(ledger))
}

pub async fn withdraw(
    State(state): State<AppState>,
    Path(metal): Path<String>,
    Json(payload): Json<GramsRequest>,
) -> Result<Json<LedgerResponse>, AppError> {
    let metal = parse_metal(&metal)?;
    let grams = parse_grams(payload.grams)?;
    let ledger = state.inventory.withdraw_stock(metal, grams)?;
    Ok(snapshot(ledger))
}

pub async fn reserve(
    State(state): State<AppState>,
    Path(metal): Path<String>,
    Json(payload): Json<GramsRequest>,
) -> Result<Json<LedgerResponse>, AppError> {
    let metal = parse_metal(&metal)?;
    let grams = parse_grams(payload.grams)?;
    let ledger = state.inventory.reserve(metal, grams)?;
    Ok(snapshot(ledger))
}

pub async fn release_reservation(
    State(state): State<AppState>,
    Path(metal): Path<String>,
    Json(payload): Json<GramsRequest>,
) -> Result<Json<LedgerResponse>, AppError> {
    let metal = parse_metal(&metal)?;
    let grams = parse_grams(payload.grams)?;
    let ledger = state.inventory.release_reservation(metal, grams)?;
    Ok(snapshot(ledger))
}
