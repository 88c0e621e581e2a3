//! Hedge P&L and exposure aggregation
//!
//! Deterministic decimal arithmetic over position sets.
//! `directionSign(buy) = +1`, `directionSign(sell) = -1`.

use rust_decimal::Decimal;
use types::errors::ValidationError;
use types::hedge::HedgePosition;
use types::numeric::Price;

/// Signed open grams: buy positive, sell negative.
///
/// `net_open_exposure = Σ open.grams × direction_sign(open.side)`
pub fn net_open_exposure(positions: &[HedgePosition]) -> Result<Decimal, ValidationError> {
    checked_sum(positions.iter().map(|pos| Ok(pos.signed_open_grams())), "net open exposure")
}

/// Unrealized P&L of open positions marked at `price`
pub fn unrealized_pnl(positions: &[HedgePosition], price: Price) -> Result<Decimal, ValidationError> {
    checked_sum(
        positions
            .iter()
            .filter(|pos| pos.is_open())
            .map(|pos| pos.pnl_at(price)),
        "unrealized P&L",
    )
}

/// Realized P&L of closed positions
pub fn total_realized_pnl(positions: &[HedgePosition]) -> Result<Decimal, ValidationError> {
    checked_sum(
        positions.iter().filter_map(|pos| pos.realized_pnl).map(Ok),
        "realized P&L",
    )
}

fn checked_sum(
    terms: impl Iterator<Item = Result<Decimal, ValidationError>>,
    operation: &str,
) -> Result<Decimal, ValidationError> {
    terms.fold(Ok(Decimal::ZERO), |acc, term| {
        acc?.checked_add(term?).ok_or_else(|| ValidationError::overflow(operation))
    })
}
