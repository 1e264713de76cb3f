mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{quote, Call, Outcome, ScriptedClient};
use storefront_checkout::{DebouncedEstimator, EstimatorConfig, EstimatorHandle};
use storefront_core::types::{Address, EstimateKind};
use storefront_core::Money;
use tokio::time::sleep;

fn address(zip: &str) -> Address {
    Address {
        street: "200 N Spring St".to_string(),
        zip_code: zip.to_string(),
        ..Default::default()
    }
}

fn start(client: &Arc<ScriptedClient>) -> EstimatorHandle {
    DebouncedEstimator::new(EstimatorConfig::default(), client.clone()).start()
}

#[tokio::test(start_paused = true)]
async fn test_keystrokes_collapse_into_one_request() {
    let client = ScriptedClient::new();
    let estimator = start(&client);
    let subtotal = Money::from_cents(45_000);

    for partial in ["9", "90", "900", "9000", "90001"] {
        estimator.submit(address(partial), subtotal).await.unwrap();
        sleep(Duration::from_millis(150)).await;
    }
    sleep(Duration::from_secs(2)).await;

    let calls = client.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0],
        Call::Cost {
            zip: "90001".to_string(),
            city: "Los Angeles".to_string(),
            order_total: subtotal,
        }
    );

    let estimate = estimator.current().unwrap();
    assert_eq!(estimate.kind, EstimateKind::Quoted);
    assert_eq!(estimate.cost.cents(), 2_500);
    assert!(!estimate.loading);
}

#[tokio::test(start_paused = true)]
async fn test_request_carries_zone_defaults() {
    let client = ScriptedClient::new();
    let estimator = start(&client);

    estimator
        .submit(address("90012"), Money::from_cents(10_000))
        .await
        .unwrap();
    sleep(Duration::from_secs(2)).await;

    let calls = client.calls();
    assert!(matches!(
        &calls[..],
        [Call::Cost { zip, city, .. }] if zip == "90012" && city == "Los Angeles"
    ));
    assert_eq!(estimator.current().unwrap().kind, EstimateKind::Quoted);
}

#[tokio::test(start_paused = true)]
async fn test_slow_older_response_never_overwrites_newer() {
    let client = ScriptedClient::new();
    client.script_cost("90001", 2_000, Outcome::Ok(quote(4_000, false)));
    client.script_cost("90002", 100, Outcome::Ok(quote(1_000, false)));
    let estimator = start(&client);
    let subtotal = Money::from_cents(30_000);

    // A fires at 800ms and answers at 2800ms
    estimator.submit(address("90001"), subtotal).await.unwrap();
    sleep(Duration::from_millis(900)).await;

    // B fires at 1700ms and answers at 1800ms
    estimator.submit(address("90002"), subtotal).await.unwrap();
    sleep(Duration::from_millis(1_000)).await;
    assert_eq!(estimator.current().unwrap().cost.cents(), 1_000);

    sleep(Duration::from_secs(3)).await;

    assert_eq!(client.cost_zips(), vec!["90001".to_string(), "90002".to_string()]);
    let estimate = estimator.current().unwrap();
    assert_eq!(estimate.cost.cents(), 1_000);
    assert!(!estimate.loading);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_keeps_previous_cost_while_loading() {
    let client = ScriptedClient::new();
    client.script_cost("90002", 500, Outcome::Ok(quote(1_500, false)));
    let estimator = start(&client);
    let subtotal = Money::from_cents(30_000);

    estimator.submit(address("90001"), subtotal).await.unwrap();
    sleep(Duration::from_secs(1)).await;
    assert_eq!(estimator.current().unwrap().cost.cents(), 2_500);

    estimator.submit(address("90002"), subtotal).await.unwrap();
    sleep(Duration::from_millis(900)).await;

    let refreshing = estimator.current().unwrap();
    assert!(refreshing.loading);
    assert_eq!(refreshing.cost.cents(), 2_500);

    sleep(Duration::from_secs(1)).await;
    let estimate = estimator.current().unwrap();
    assert!(!estimate.loading);
    assert_eq!(estimate.cost.cents(), 1_500);
}

#[tokio::test(start_paused = true)]
async fn test_dispose_during_pending_timer() {
    let client = ScriptedClient::new();
    let estimator = start(&client);

    estimator
        .submit(address("90001"), Money::from_cents(30_000))
        .await
        .unwrap();
    sleep(Duration::from_millis(300)).await;
    estimator.dispose().await;
    sleep(Duration::from_secs(3)).await;

    assert!(client.calls().is_empty());
    assert!(estimator.current().is_none());
    assert!(estimator
        .submit(address("90002"), Money::zero())
        .await
        .is_err());
}

#[tokio::test(start_paused = true)]
async fn test_out_of_zone_estimate() {
    let client = ScriptedClient::new();
    client.script_cost("93501", 50, Outcome::OutOfZone);
    let estimator = start(&client);

    estimator
        .submit(address("93501"), Money::from_cents(30_000))
        .await
        .unwrap();
    sleep(Duration::from_secs(2)).await;

    let estimate = estimator.current().unwrap();
    assert_eq!(estimate.kind, EstimateKind::OutOfZone);
    assert!(estimate.cost.is_zero());
    assert!(!estimate.is_estimate);
}

#[tokio::test(start_paused = true)]
async fn test_network_failure_shows_fallback() {
    let client = ScriptedClient::new();
    client.script_cost("90001", 50, Outcome::Network);
    let estimator = start(&client);

    estimator
        .submit(address("90001"), Money::from_cents(30_000))
        .await
        .unwrap();
    sleep(Duration::from_secs(2)).await;

    let estimate = estimator.current().unwrap();
    assert_eq!(estimate.kind, EstimateKind::Fallback);
    assert_eq!(estimate.cost.cents(), 5_000);
    assert!(!estimate.is_free);
}

#[tokio::test(start_paused = true)]
async fn test_fallback_is_free_above_threshold() {
    let client = ScriptedClient::new();
    client.script_cost("90001", 50, Outcome::Server(503));
    let estimator = start(&client);

    estimator
        .submit(address("90001"), Money::from_cents(120_000))
        .await
        .unwrap();
    sleep(Duration::from_secs(2)).await;

    let estimate = estimator.current().unwrap();
    assert_eq!(estimate.kind, EstimateKind::Fallback);
    assert!(estimate.is_free);
    assert!(estimate.cost.is_zero());
}

#[tokio::test(start_paused = true)]
async fn test_clearing_zip_drops_estimate() {
    let client = ScriptedClient::new();
    let estimator = start(&client);

    estimator
        .submit(address("90001"), Money::from_cents(30_000))
        .await
        .unwrap();
    sleep(Duration::from_secs(2)).await;
    assert!(estimator.current().is_some());

    estimator.submit(address(""), Money::from_cents(30_000)).await.unwrap();
    sleep(Duration::from_millis(10)).await;

    assert!(estimator.current().is_none());
    assert_eq!(client.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_clear_invalidates_in_flight_request() {
    let client = ScriptedClient::new();
    client.script_cost("90001", 1_000, Outcome::Ok(quote(4_000, false)));
    let estimator = start(&client);

    estimator
        .submit(address("90001"), Money::from_cents(30_000))
        .await
        .unwrap();
    sleep(Duration::from_millis(900)).await;
    assert!(estimator.current().unwrap().loading);

    estimator.clear().await.unwrap();
    sleep(Duration::from_secs(2)).await;

    assert!(estimator.current().is_none());
    assert_eq!(client.cost_zips(), vec!["90001".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_service_free_flag_does_not_grant_free_estimate() {
    let client = ScriptedClient::new();
    client.script_cost("90001", 50, Outcome::Ok(quote(0, true)));
    client.script_cost("90002", 50, Outcome::Ok(quote(3_000, false)));
    let estimator = start(&client);

    estimator
        .submit(address("90001"), Money::from_cents(50_000))
        .await
        .unwrap();
    sleep(Duration::from_secs(2)).await;

    let estimate = estimator.current().unwrap();
    assert_eq!(estimate.kind, EstimateKind::Quoted);
    assert!(!estimate.is_free);

    estimator
        .submit(address("90002"), Money::from_cents(120_000))
        .await
        .unwrap();
    sleep(Duration::from_secs(2)).await;

    let estimate = estimator.current().unwrap();
    assert!(estimate.is_free);
    assert!(estimate.cost.is_zero());
}
