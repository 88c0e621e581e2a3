use axum::{
    extract::{Path, Query, State},
    Json,
};
use types::errors::{CoreError, ValidationError};
use types::hedge::HedgePosition;

use crate::error::AppError;
use crate::models::{
    parse_exposure_grams, parse_hedge_id, parse_metal, parse_price, CloseHedgeRequest,
    CloseHedgeResponse, ExposureResponse, HedgeQuery, HedgeSummary, MarkQuery,
    RecordExposureRequest,
};
use crate::state::AppState;

pub async fn record_exposure(
    State(state): State<AppState>,
    Json(payload): Json<RecordExposureRequest>,
) -> Result<Json<ExposureResponse>, AppError> {
    let metal = parse_metal(&payload.metal)?;
    let grams = parse_exposure_grams(payload.grams)?;
    let price = parse_price(payload.price)?;

    let booked = state.orchestrator.book_exposure(
        metal,
        grams,
        payload.side,
        price,
        payload.reason_code,
        payload.linked_order_id,
    )?;
    Ok(Json(ExposureResponse::new(booked.booking, booked.warnings)))
}

pub async fn close_hedge(
    State(state): State<AppState>,
    Path(hedge_id): Path<String>,
    Json(payload): Json<CloseHedgeRequest>,
) -> Result<Json<CloseHedgeResponse>, AppError> {
    let hedge_id = parse_hedge_id(&hedge_id)?;
    let price = parse_price(payload.close_price)?;
    let closed = state.orchestrator.close_hedge(hedge_id, price)?;
    Ok(Json(CloseHedgeResponse::new(closed.close, closed.warnings)))
}

pub async fn get_hedge(
    State(state): State<AppState>,
    Path(hedge_id): Path<String>,
) -> Result<Json<HedgePosition>, AppError> {
    let hedge_id = parse_hedge_id(&hedge_id)?;
    match state.hedges.position(hedge_id) {
        Ok(position) => Ok(Json(position)),
        Err(CoreError::Validation(ValidationError::HedgeNotFound { hedge_id })) => {
            Err(AppError::NotFound(format!("Hedge {hedge_id} not found")))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn list_hedges(
    State(state): State<AppState>,
    Query(query): Query<HedgeQuery>,
) -> Result<Json<Vec<HedgePosition>>, AppError> {
    let metal = query.metal.as_deref().map(parse_metal).transpose()?;
    let positions = if query.open_only {
        state.hedges.open_positions(metal)?
    } else {
        state.hedges.positions(metal)?
    };
    Ok(Json(positions))
}

/// Net open exposure and P&L for one metal; `?price=` adds a mark
pub async fn summary(
    State(state): State<AppState>,
    Path(metal): Path<String>,
    Query(mark): Query<MarkQuery>,
) -> Result<Json<HedgeSummary>, AppError> {
    let metal = parse_metal(&metal)?;
    let unrealized_pnl = match mark.price {
        Some(price) => {
            let price = parse_price(price)?;
            Some(state.hedges.mark_to_market(metal, price)?)
        }
        None => None,
    };

    Ok(Json(HedgeSummary {
        metal,
        net_open_exposure: state.hedges.net_open_exposure(metal)?,
        realized_pnl: state.hedges.realized_pnl(metal)?,
        unrealized_pnl,
    }))
}
