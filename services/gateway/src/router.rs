use crate::handlers::{self, hedge, inventory, matching, reconciliation, trade};
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/inventory/check", post(inventory::check_order))
        .route("/inventory/{metal}", get(inventory::get_ledger))
        .route("/inventory/{metal}/allocations", post(inventory::allocate))
        .route("/inventory/{metal}/deallocations", post(inventory::deallocate))
        .route("/inventory/{metal}/deposits", post(inventory::deposit))
        .route("/inventory/{metal}/withdrawals", post(inventory::withdraw))
        .route("/inventory/{metal}/reservations", post(inventory::reserve))
        .route(
            "/inventory/{metal}/reservations/release",
            post(inventory::release_reservation),
        )
        .route("/matching/orders", post(matching::submit_order))
        .route("/matching/orders/{order_id}", get(matching::get_match))
        .route("/matching/{metal}/pending", get(matching::pending_flow))
        .route("/hedges", post(hedge::record_exposure).get(hedge::list_hedges))
        .route("/hedges/{hedge_id}", get(hedge::get_hedge))
        .route("/hedges/{hedge_id}/close", post(hedge::close_hedge))
        .route("/exposure/{metal}", get(hedge::summary))
        .route("/trades", post(trade::execute_trade))
        .route("/conversions", post(trade::execute_conversion))
        .route("/reconciliation", get(reconciliation::run_sweep));

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/v1", api_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request, StatusCode};
    use ledger_store::InMemoryLedgerStore;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app_with_store() -> (Router, Arc<InMemoryLedgerStore>) {
        let config = GatewayConfig::default_config().unwrap();
        let store = Arc::new(InMemoryLedgerStore::new());
        let state = AppState::new(&config, store.clone()).unwrap();
        (create_router(state), store)
    }

    fn app() -> Router {
        app_with_store().0
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn trade_body(side: &str, metal: &str, grams: &str) -> Value {
        json!({
            "side": side,
            "metal": metal,
            "grams": grams,
            "quote": { "ask": "101", "bid": "99" },
            "client_id": "client-1",
            "counter_asset": "EUR"
        })
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(&app(), Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_check_order_boundary() {
        let app = app();
        let (status, body) = send(
            &app,
            Method::POST,
            "/v1/inventory/check",
            Some(json!({ "metal": "XAU", "grams": "10001", "side": "buy" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["allowed"], false);
        assert!(body["reason"].as_str().unwrap().contains("Insufficient"));

        let (_, body) = send(
            &app,
            Method::POST,
            "/v1/inventory/check",
            Some(json!({ "metal": "gold", "grams": "10000", "side": "buy" })),
        )
        .await;
        assert_eq!(body["allowed"], true);
    }

    #[tokio::test]
    async fn test_allocation_round_trip() {
        let app = app();
        let (status, body) = send(
            &app,
            Method::POST,
            "/v1/inventory/XAG/allocations",
            Some(json!({ "grams": "250" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ledger"]["allocated_grams"], "250");

        let (status, body) = send(
            &app,
            Method::POST,
            "/v1/inventory/XAG/deallocations",
            Some(json!({ "grams": "250" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ledger"]["available_grams"], "500000");
        assert_eq!(body["stock_level"], "healthy");
    }

    #[tokio::test]
    async fn test_validation_maps_to_400() {
        let app = app();
        let (status, body) = send(
            &app,
            Method::POST,
            "/v1/inventory/XAU/allocations",
            Some(json!({ "grams": "0" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "VALIDATION_ERROR");

        let (status, _) = send(&app, Method::GET, "/v1/inventory/copper", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_out_of_range_grams_map_to_400() {
        let app = app();
        let max = rust_decimal::Decimal::MAX.to_string();
        let (status, body) = send(
            &app,
            Method::POST,
            "/v1/inventory/check",
            Some(json!({ "metal": "XAU", "grams": max, "side": "sell" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "VALIDATION_ERROR");

        let (status, _) = send(
            &app,
            Method::POST,
            "/v1/inventory/XAU/deposits",
            Some(json!({ "grams": max })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, Method::POST, "/v1/trades", Some(trade_body("sell", "XAU", &max))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, ledger) = send(&app, Method::GET, "/v1/inventory/XAU", None).await;
        assert_eq!(ledger["ledger"]["total_grams"], "10000");
    }

    #[tokio::test]
    async fn test_capacity_maps_to_409() {
        let (status, body) = send(
            &app(),
            Method::POST,
            "/v1/inventory/XPT/withdrawals",
            Some(json!({ "grams": "5001" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "CAPACITY_EXCEEDED");
    }

    #[tokio::test]
    async fn test_store_outage_maps_to_503() {
        let (app, store) = app_with_store();
        store.set_available(false);
        let (status, body) = send(&app, Method::GET, "/v1/inventory/XAU", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "STORE_UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_matching_scenario_over_http() {
        let app = app();
        let order = |side: &str, grams: &str| {
            json!({
                "side": side,
                "metal": "XAU",
                "grams": grams,
                "price": "75",
                "client_id": "client-1",
                "counter_asset": "USD"
            })
        };

        let (status, a) = send(&app, Method::POST, "/v1/matching/orders", Some(order("buy", "10"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(a["match_type"], "none");
        assert_eq!(a["lp_grams"], "10");

        let (_, b) = send(&app, Method::POST, "/v1/matching/orders", Some(order("sell", "6"))).await;
        assert_eq!(b["match_type"], "full");
        assert_eq!(b["matched_grams"], "6");

        let (_, flow) = send(&app, Method::GET, "/v1/matching/XAU/pending", None).await;
        assert_eq!(flow["pending_buy_grams"], "4");

        let uri = format!("/v1/matching/orders/{}", a["order_id"].as_str().unwrap());
        let (status, stored) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stored["lp_grams"], "10");
    }

    #[tokio::test]
    async fn test_unknown_match_is_404() {
        let uri = format!("/v1/matching/orders/{}", types::ids::OrderId::new());
        let (status, _) = send(&app(), Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_hedge_lifecycle() {
        let app = app();
        let (status, booked) = send(
            &app,
            Method::POST,
            "/v1/hedges",
            Some(json!({ "metal": "XAU", "grams": "5", "side": "buy", "price": "100" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(booked["needs_hedge"], true);
        let hedge_id = booked["hedge_id"].as_str().unwrap().to_string();

        let close_uri = format!("/v1/hedges/{hedge_id}/close");
        let (_, first) = send(&app, Method::POST, &close_uri, Some(json!({ "close_price": "110" }))).await;
        let (_, second) = send(&app, Method::POST, &close_uri, Some(json!({ "close_price": "120" }))).await;
        assert_eq!(first["pnl"], "50");
        assert_eq!(second["pnl"], "50");
        assert_eq!(second["already_closed"], true);

        let (_, position) = send(&app, Method::GET, &format!("/v1/hedges/{hedge_id}"), None).await;
        assert_eq!(position["status"], "closed");

        let (_, summary) = send(&app, Method::GET, "/v1/exposure/XAU", None).await;
        assert_eq!(summary["realized_pnl"], "50");
        assert_eq!(summary["net_open_exposure"], "0");
    }

    #[tokio::test]
    async fn test_zero_exposure_books_nothing() {
        let (status, body) = send(
            &app(),
            Method::POST,
            "/v1/hedges",
            Some(json!({ "metal": "XAG", "grams": "0", "side": "sell", "price": "1" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["needs_hedge"], false);
        assert!(body["hedge_id"].is_null());
    }

    #[tokio::test]
    async fn test_unknown_hedge_is_404() {
        let uri = format!("/v1/hedges/{}", types::ids::HedgeId::new());
        let (status, _) = send(&app(), Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app(), Method::GET, "/v1/hedges/not-a-uuid", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_trade_books_lp_remainder() {
        let app = app();
        let (status, body) = send(&app, Method::POST, "/v1/trades", Some(trade_body("buy", "XAU", "10"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["price"], "101");
        assert_eq!(body["lp_grams"], "10");
        assert_eq!(body["exposure_unbooked"], false);
        assert!(body["hedge_id"].is_string());

        let (_, hedges) = send(&app, Method::GET, "/v1/hedges?metal=XAU&open_only=true", None).await;
        assert_eq!(hedges.as_array().unwrap().len(), 1);

        let (_, ledger) = send(&app, Method::GET, "/v1/inventory/XAU", None).await;
        assert_eq!(ledger["ledger"]["net_directional_exposure"], "-10");
    }

    #[tokio::test]
    async fn test_trade_refused_on_stock() {
        let (status, body) = send(
            &app(),
            Method::POST,
            "/v1/trades",
            Some(trade_body("buy", "XPD", "5001")),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "CAPACITY_EXCEEDED");
    }

    #[tokio::test]
    async fn test_trade_fails_open_when_store_down() {
        let (app, store) = app_with_store();
        store.set_available(false);
        let (status, body) = send(&app, Method::POST, "/v1/trades", Some(trade_body("sell", "XAG", "3"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["degraded_match"], true);
        assert_eq!(body["exposure_unbooked"], true);
        assert_eq!(body["lp_grams"], "3");
    }

    #[tokio::test]
    async fn test_crossed_quote_rejected() {
        let mut body = trade_body("buy", "XAU", "1");
        body["quote"] = json!({ "ask": "99", "bid": "101" });
        let (status, _) = send(&app(), Method::POST, "/v1/trades", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_conversion() {
        let (status, body) = send(
            &app(),
            Method::POST,
            "/v1/conversions",
            Some(json!({
                "from_metal": "XAU",
                "to_metal": "XAG",
                "grams": "2",
                "from_quote": { "ask": "80", "bid": "75" },
                "to_quote": { "ask": "0.95", "bid": "0.90" },
                "client_id": "client-1"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        // 2 × 75 / 0.95 = 157.894736...
        assert_eq!(body["to_grams"], "157.8947");
        assert_eq!(body["sell_leg"]["side"], "sell");
        assert_eq!(body["buy_leg"]["match_result"]["counter_asset"], "XAU");
    }

    #[tokio::test]
    async fn test_reconciliation_sweep_is_clean() {
        let app = app();
        send(&app, Method::POST, "/v1/trades", Some(trade_body("buy", "XAU", "10"))).await;
        send(
            &app,
            Method::POST,
            "/v1/inventory/XAU/allocations",
            Some(json!({ "grams": "10" })),
        )
        .await;

        let (status, reports) = send(&app, Method::GET, "/v1/reconciliation", None).await;
        assert_eq!(status, StatusCode::OK);
        let reports = reports.as_array().unwrap();
        assert_eq!(reports.len(), 4);
        assert!(reports.iter().all(|r| r["within_tolerance"] == true));
        assert!(reports.iter().all(|r| r["corrupted_entries"] == 0));
    }
}
