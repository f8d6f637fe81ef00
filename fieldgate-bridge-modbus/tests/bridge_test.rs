//! Integration tests for the gateway client and fetch cycle.
//!
//! These tests run a small axum server that plays the role of the Modbus
//! REST gateway and verify the full flow from HTTP round trip to device
//! state, readings and notifications.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use serde_json::json;

use fieldgate_bridge_modbus::gateway::{GatewayClient, GatewayError, GatewayTarget};
use fieldgate_bridge_modbus::poller::FetchCycle;
use fieldgate_common::{ConnectionStatus, Severity};
use fieldgate_core::{
    BufferNotifier, DeviceState, FailurePolicy, HistoryStore, PollScheduler, StartOutcome,
    StopOutcome,
};

#[derive(Clone)]
struct MockState {
    status: StatusCode,
    body: String,
    hits: Arc<AtomicUsize>,
}

async fn respond(State(state): State<MockState>) -> (StatusCode, String) {
    state.hits.fetch_add(1, Ordering::SeqCst);
    (state.status, state.body.clone())
}

/// Spawn a mock gateway answering `POST /data` with a canned response.
async fn spawn_gateway(status: StatusCode, body: String) -> (String, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let state = MockState {
        status,
        body,
        hits: hits.clone(),
    };
    let app = Router::new().route("/data", post(respond)).with_state(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), hits)
}

fn target(api_url: &str, starting_register: u16, register_count: u16) -> GatewayTarget {
    GatewayTarget {
        api_url: api_url.to_string(),
        ip: "127.0.0.1".to_string(),
        port: 502,
        slave_id: 1,
        starting_register,
        register_count,
    }
}

struct Harness {
    cycle: FetchCycle,
    state: Arc<DeviceState>,
    history: Arc<HistoryStore>,
    notifier: Arc<BufferNotifier>,
}

fn harness(api_url: &str, starting_register: u16, register_count: u16) -> Harness {
    let state = Arc::new(DeviceState::new("plc01"));
    let history = Arc::new(HistoryStore::new());
    let notifier = Arc::new(BufferNotifier::new());
    let client = GatewayClient::new(Duration::from_secs(10)).unwrap();
    let cycle = FetchCycle::new(
        target(api_url, starting_register, register_count),
        state.clone(),
        client,
        history.clone(),
        notifier.clone(),
    );
    Harness {
        cycle,
        state,
        history,
        notifier,
    }
}

#[tokio::test]
async fn test_client_fetch_parses_values() {
    let (url, hits) = spawn_gateway(
        StatusCode::OK,
        json!({"connectionStatus": "connected", "values": [10, 20, 30]}).to_string(),
    )
    .await;

    let client = GatewayClient::new(Duration::from_secs(10)).unwrap();
    let result = client.fetch(&target(&url, 0, 3)).await.unwrap();

    assert_eq!(result.status, ConnectionStatus::Connected);
    assert_eq!(result.values, vec![10.0, 20.0, 30.0]);
    assert!(result.error.is_none());
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_fetch_cycle_records_readings_in_register_order() {
    let (url, _hits) = spawn_gateway(
        StatusCode::OK,
        json!({"connectionStatus": "connected", "values": [10, 20, 30]}).to_string(),
    )
    .await;

    let h = harness(&url, 5, 3);
    let recorded = h.cycle.fetch_once().await.unwrap();
    assert_eq!(recorded, 3);

    let readings: Vec<(u32, f64)> = h
        .history
        .history("plc01")
        .iter()
        .map(|r| (r.register, r.value))
        .collect();
    assert_eq!(readings, vec![(5, 10.0), (6, 20.0), (7, 30.0)]);

    let snapshot = h.state.snapshot();
    assert_eq!(snapshot.status, ConnectionStatus::Connected);
    assert_eq!(
        snapshot.last_values,
        vec!["Register 5: 10", "Register 6: 20", "Register 7: 30"]
    );

    // A manual fetch always reports.
    let notifications = h.notifier.entries();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].severity, Severity::Success);
}

#[tokio::test]
async fn test_gateway_error_suppresses_persistence() {
    let (url, _hits) = spawn_gateway(
        StatusCode::OK,
        json!({
            "connectionStatus": "error",
            "values": [1, 2],
            "error": "Error: Timed out"
        })
        .to_string(),
    )
    .await;

    let h = harness(&url, 0, 2);
    let recorded = h.cycle.fetch_once().await.unwrap();

    // Partial data next to an error is never persisted.
    assert_eq!(recorded, 0);
    assert!(h.history.is_empty());

    let snapshot = h.state.snapshot();
    assert_eq!(snapshot.status, ConnectionStatus::Error);
    assert_eq!(snapshot.last_error.as_deref(), Some("Error: Timed out"));

    let notifications = h.notifier.entries();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].severity, Severity::Danger);
    assert!(notifications[0].sticky);
}

#[tokio::test]
async fn test_empty_values_warn_on_manual_fetch() {
    let (url, _hits) = spawn_gateway(
        StatusCode::OK,
        json!({"connectionStatus": "connected", "values": []}).to_string(),
    )
    .await;

    let h = harness(&url, 0, 1);
    let recorded = h.cycle.fetch_once().await.unwrap();
    assert_eq!(recorded, 0);
    assert_eq!(h.state.status(), ConnectionStatus::Connected);

    let notifications = h.notifier.entries();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].severity, Severity::Warning);
    assert!(notifications[0].sticky);
}

#[tokio::test]
async fn test_polling_cycle_success_is_silent() {
    let (url, _hits) = spawn_gateway(
        StatusCode::OK,
        json!({"connectionStatus": "connected", "values": [42]}).to_string(),
    )
    .await;

    let h = harness(&url, 0, 1);
    h.state.begin_polling();

    h.cycle.fetch_once().await.unwrap();

    assert!(h.notifier.entries().is_empty());
    assert_eq!(h.state.status(), ConnectionStatus::Polling);
    assert_eq!(h.history.history("plc01").len(), 1);
}

#[tokio::test]
async fn test_unreachable_gateway() {
    // Nothing listens on the discard port.
    let h = harness("http://127.0.0.1:9", 0, 1);

    let error = h.cycle.fetch_once().await.unwrap_err();
    assert!(error.retryable);

    let snapshot = h.state.snapshot();
    assert_eq!(snapshot.status, ConnectionStatus::Error);
    assert!(snapshot.last_error.is_some());
    assert!(!snapshot.last_error.unwrap().is_empty());
    // Never "connected while polling" after a failure.
    assert!(!(snapshot.is_polling && snapshot.status == ConnectionStatus::Connected));

    let notifications = h.notifier.entries();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].severity, Severity::Danger);
}

#[tokio::test]
async fn test_http_error_is_retryable() {
    let (url, _hits) = spawn_gateway(StatusCode::INTERNAL_SERVER_ERROR, String::new()).await;

    let client = GatewayClient::new(Duration::from_secs(10)).unwrap();
    let error = client.fetch(&target(&url, 0, 1)).await.unwrap_err();
    assert!(matches!(error, GatewayError::Http(status) if status.as_u16() == 500));

    let h = harness(&url, 0, 1);
    let error = h.cycle.fetch_once().await.unwrap_err();
    assert!(error.retryable);
    assert_eq!(h.state.status(), ConnectionStatus::Error);
}

#[tokio::test]
async fn test_malformed_body_is_fatal() {
    let (url, _hits) = spawn_gateway(StatusCode::OK, "not json at all".to_string()).await;

    let h = harness(&url, 0, 1);
    let error = h.cycle.fetch_once().await.unwrap_err();
    assert!(!error.retryable);
    assert_eq!(h.state.status(), ConnectionStatus::Error);
}

#[tokio::test]
async fn test_connection_probe_success() {
    let (url, _hits) = spawn_gateway(
        StatusCode::OK,
        json!({"connectionStatus": "connected", "values": []}).to_string(),
    )
    .await;

    let h = harness(&url, 0, 1);
    h.cycle.test_connection().await.unwrap();

    assert_eq!(h.state.status(), ConnectionStatus::Connected);
    assert!(h.history.is_empty());

    let notifications = h.notifier.entries();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].severity, Severity::Success);
    assert!(!notifications[0].sticky);
}

#[tokio::test]
async fn test_connection_probe_failure() {
    let (url, _hits) = spawn_gateway(
        StatusCode::OK,
        json!({"connectionStatus": "error", "error": "Error: Connect failed"}).to_string(),
    )
    .await;

    let h = harness(&url, 0, 1);
    assert!(h.cycle.test_connection().await.is_err());

    assert_eq!(h.state.status(), ConnectionStatus::Error);
    let notifications = h.notifier.entries();
    assert_eq!(notifications[0].severity, Severity::Danger);
    assert!(notifications[0].sticky);
}

#[tokio::test]
async fn test_scheduled_polling_end_to_end() {
    let (url, hits) = spawn_gateway(
        StatusCode::OK,
        json!({"connectionStatus": "connected", "values": [10, 20, 30]}).to_string(),
    )
    .await;

    let h = harness(&url, 5, 3);
    let scheduler = PollScheduler::new();
    scheduler.register(h.state.clone(), h.cycle, 1000, FailurePolicy::Retry);

    assert_eq!(scheduler.start("plc01"), StartOutcome::Started);
    assert_eq!(scheduler.start("plc01"), StartOutcome::AlreadyRunning);

    tokio::time::sleep(Duration::from_millis(1300)).await;
    assert!(scheduler.is_running("plc01"));
    assert_eq!(h.state.status(), ConnectionStatus::Polling);
    assert!(hits.load(Ordering::SeqCst) >= 2);
    assert!(h.history.history("plc01").len() >= 6);
    // Routine successful polling stays silent.
    assert!(h.notifier.entries().is_empty());

    assert_eq!(scheduler.stop("plc01"), StopOutcome::Stopped);
    assert_eq!(h.state.status(), ConnectionStatus::Connected);
    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert!(!scheduler.is_running("plc01"));
    assert_eq!(scheduler.stop("plc01"), StopOutcome::NotRunning);
}

#[tokio::test]
async fn test_protocol_error_fail_stops_polling_task() {
    let (url, _hits) = spawn_gateway(StatusCode::OK, "garbage".to_string()).await;

    let h = harness(&url, 0, 1);
    let scheduler = PollScheduler::new();
    scheduler.register(h.state.clone(), h.cycle, 1000, FailurePolicy::Retry);
    scheduler.start("plc01");

    tokio::time::sleep(Duration::from_millis(300)).await;

    assert!(!scheduler.is_running("plc01"));
    let snapshot = h.state.snapshot();
    assert!(!snapshot.is_polling);
    assert_eq!(snapshot.status, ConnectionStatus::Error);
    assert!(snapshot.last_error.is_some());
    assert!(!h.notifier.entries().is_empty());
}
