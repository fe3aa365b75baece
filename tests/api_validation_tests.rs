//! Handler-level validation behavior, driven through the router with
//! `tower::ServiceExt::oneshot`. These paths reject the request before any
//! database work, so the state carries a disconnected handle and an empty
//! source chain.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    routing::{patch, post},
    Router,
};
use sea_orm::DatabaseConnection;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use pagos_backend::handlers::{pago_movil, rate};
use pagos_backend::services::alert_engine::AlertEngine;
use pagos_backend::services::pago_movil::PagoMovilService;
use pagos_backend::services::rate_service::RateService;
use pagos_backend::services::rate_store::RateStore;
use pagos_backend::services::snapshot_service::SnapshotService;
use pagos_backend::sources::SourceChain;
use pagos_backend::AppState;

fn test_state() -> AppState {
    let db = Arc::new(DatabaseConnection::default());
    let store = RateStore::new(db.clone());
    let alerts = AlertEngine::new(db.clone());
    let rates = RateService::new(store, alerts.clone(), Arc::new(SourceChain::new(vec![])));
    let snapshots = SnapshotService::new(db.clone(), rates.clone());
    let pago_movil_service = PagoMovilService::new(db.clone(), rates.clone());

    AppState {
        db,
        rates,
        alerts,
        snapshots,
        pago_movil: pago_movil_service,
    }
}

fn test_router() -> Router {
    Router::new()
        .route("/api/exchange-rate/convert", post(rate::convert_currency))
        .route("/api/exchange-rate/set-manual", post(rate::set_manual_rate))
        .route("/api/exchange-rate/snapshot", post(rate::pin_snapshot))
        .route("/api/pagomovil/verify", post(pago_movil::create_verification))
        .route(
            "/api/pagomovil/{id}/status",
            patch(pago_movil::update_verification_status),
        )
        .with_state(test_state())
}

async fn send_json(
    router: Router,
    method: &str,
    uri: &str,
    body: Value,
) -> (StatusCode, Value) {
    let response = router
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn convert_rejects_same_currency_pair() {
    let (status, body) = send_json(
        test_router(),
        "POST",
        "/api/exchange-rate/convert",
        json!({"amount": "100", "from_currency": "USD", "to_currency": "USD", "rate": "36.5"}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("must differ"));
}

#[tokio::test]
async fn convert_with_explicit_rate_skips_the_rate_pipeline() {
    let (status, body) = send_json(
        test_router(),
        "POST",
        "/api/exchange-rate/convert",
        json!({"amount": "10", "from_currency": "USD", "to_currency": "VES", "rate": "36.5"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let converted: rust_decimal::Decimal =
        body["converted_amount"].as_str().unwrap().parse().unwrap();
    assert_eq!(converted, rust_decimal::Decimal::from(365));
    assert_eq!(body["rate_source"].as_str().unwrap(), "custom");
}

#[tokio::test]
async fn manual_rate_below_floor_is_rejected_before_any_commit() {
    let (status, body) = send_json(
        test_router(),
        "POST",
        "/api/exchange-rate/set-manual",
        json!({"rate": "0.5"}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("sanity floor"));
}

#[tokio::test]
async fn snapshot_requires_exactly_one_target() {
    let (status, _) = send_json(
        test_router(),
        "POST",
        "/api/exchange-rate/snapshot",
        json!({"order_id": 1, "payment_id": 2, "amount_usd": "10"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send_json(
        test_router(),
        "POST",
        "/api/exchange-rate/snapshot",
        json!({"amount_usd": "10"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn verify_rejects_malformed_sender_id_and_phone() {
    let (status, body) = send_json(
        test_router(),
        "POST",
        "/api/pagomovil/verify",
        json!({
            "user_id": 1,
            "sender_id": "X-12345678",
            "sender_phone": "04141234567",
            "bank_code": "0102",
            "recipient": "Tienda C.A.",
            "amount_ves": "1000"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Sender ID"));

    let (status, body) = send_json(
        test_router(),
        "POST",
        "/api/pagomovil/verify",
        json!({
            "user_id": 1,
            "sender_id": "V-12345678",
            "sender_phone": "123",
            "bank_code": "0102",
            "recipient": "Tienda C.A.",
            "amount_ves": "1000"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("10-11 digits"));
}

#[tokio::test]
async fn status_update_only_accepts_terminal_targets() {
    let (status, body) = send_json(
        test_router(),
        "PATCH",
        "/api/pagomovil/7/status",
        json!({"status": "pending"}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("'approved' or 'rejected'"));
}
