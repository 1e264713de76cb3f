//! HTTP client against a local stand-in for the delivery service.

use std::net::SocketAddr;
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use storefront_checkout::{CheckoutError, DeliveryCostClient, HttpDeliveryClient};
use storefront_core::types::Address;
use storefront_core::Money;
use tokio::net::TcpListener;

fn zip_of(body: &Value) -> &str {
    body["address"]["zip_code"].as_str().unwrap_or_default()
}

async fn validate_address(Json(body): Json<Value>) -> Response {
    match zip_of(&body) {
        "93501" => Json(json!({ "within_delivery_zone": false, "distance_miles": 72.4 }))
            .into_response(),
        "50000" => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "geocoder unavailable" })),
        )
            .into_response(),
        "50200" => (StatusCode::BAD_GATEWAY, "bad gateway").into_response(),
        "40800" => {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Json(json!({ "within_delivery_zone": true, "distance_miles": 1.0 })).into_response()
        }
        _ => Json(json!({ "within_delivery_zone": true, "distance_miles": 3.2 })).into_response(),
    }
}

async fn calculate_cost(Json(body): Json<Value>) -> Response {
    if zip_of(&body) == "93501" {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "error": "Address is outside our delivery area",
                "code": "OUT_OF_DELIVERY_ZONE",
            })),
        )
            .into_response();
    }

    let order_total = body["order_total"].as_f64().unwrap_or_default();
    Json(json!({
        "delivery_cost": 12.5,
        "is_free_delivery": order_total >= 1000.0,
        "distance_miles": 3.2,
    }))
    .into_response()
}

async fn spawn_service() -> SocketAddr {
    let app = Router::new()
        .route("/api/delivery/validate-address", post(validate_address))
        .route("/api/delivery/calculate-delivery-cost", post(calculate_cost));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    addr
}

fn client_for(addr: SocketAddr) -> HttpDeliveryClient {
    HttpDeliveryClient::new(
        &format!("http://{addr}/api/delivery/"),
        Duration::from_millis(500),
    )
    .unwrap()
}

fn address(zip: &str) -> Address {
    Address {
        street: "200 N Spring St".to_string(),
        city: "Los Angeles".to_string(),
        state: "CA".to_string(),
        zip_code: zip.to_string(),
        country: "US".to_string(),
    }
}

#[tokio::test]
async fn test_validate_address_inside_zone() {
    let client = client_for(spawn_service().await);

    let result = client.validate_address(&address("90012")).await.unwrap();
    assert!(result.within_delivery_zone);
    assert_eq!(result.distance_miles, 3.2);
}

#[tokio::test]
async fn test_validate_address_outside_zone_is_an_answer() {
    let client = client_for(spawn_service().await);

    let result = client.validate_address(&address("93501")).await.unwrap();
    assert!(!result.within_delivery_zone);
}

#[tokio::test]
async fn test_cost_decodes_major_units() {
    let client = client_for(spawn_service().await);

    let quote = client
        .calculate_delivery_cost(&address("90012"), Money::from_cents(45_000))
        .await
        .unwrap();
    assert_eq!(quote.delivery_cost.cents(), 1_250);
    assert!(!quote.is_free_delivery);

    let quote = client
        .calculate_delivery_cost(&address("90012"), Money::from_cents(120_000))
        .await
        .unwrap();
    assert!(quote.is_free_delivery);
}

#[tokio::test]
async fn test_out_of_zone_code_maps_to_zone_error() {
    let client = client_for(spawn_service().await);

    let err = client
        .calculate_delivery_cost(&address("93501"), Money::from_cents(45_000))
        .await
        .unwrap_err();
    assert!(err.is_zone_error());
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_server_errors_carry_status() {
    let client = client_for(spawn_service().await);

    let err = client.validate_address(&address("50000")).await.unwrap_err();
    match err {
        CheckoutError::Server { status, message } => {
            assert_eq!(status, Some(500));
            assert_eq!(message, "geocoder unavailable");
        }
        other => panic!("expected server error, got {other:?}"),
    }

    let err = client.validate_address(&address("50200")).await.unwrap_err();
    match err {
        CheckoutError::Server { status, message } => {
            assert_eq!(status, Some(502));
            assert_eq!(message, "bad gateway");
        }
        other => panic!("expected server error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_timeout_is_a_network_error() {
    let client = client_for(spawn_service().await);

    let err = client.validate_address(&address("40800")).await.unwrap_err();
    assert!(matches!(err, CheckoutError::Network(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_unreachable_service_is_a_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client_for(addr)
        .validate_address(&address("90012"))
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::Network(_)));
}
