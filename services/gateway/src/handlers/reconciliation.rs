use axum::{extract::State, Json};
use ledger_store::reconciliation::ReconciliationReport;

use crate::error::AppError;
use crate::state::AppState;

/// Run a reconciliation sweep over every metal now
pub async fn run_sweep(
    State(state): State<AppState>,
) -> Result<Json<Vec<ReconciliationReport>>, AppError> {
    let reports = state.reconciliation.run(state.store.as_ref())?;
    Ok(Json(reports))
}
