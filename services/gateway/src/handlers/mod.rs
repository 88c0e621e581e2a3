pub mod hedge;
pub mod inventory;
pub mod matching;
pub mod reconciliation;
pub mod trade;

use axum::Json;
use serde_json::{json, Value};

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
