//! HTTP query surface, exercised over a real socket.

use std::net::SocketAddr;
use std::sync::Arc;

use pingwarden::{
    actors::{reconciler::Reconciler, recorder::RecorderHandle},
    api::{ApiState, spawn_api_server},
    storage::MemoryBackend,
};
use pretty_assertions::assert_eq;
use serde_json::Value;

use crate::helpers::*;

struct ApiRig {
    addr: SocketAddr,
    reconciler: Arc<Reconciler>,
    recorder: RecorderHandle,
}

/// Boot a monitor for `target` (always failing), an in-memory recorder and
/// the API on a random port.
async fn spawn_test_api(target: &str) -> ApiRig {
    let rig = test_deps(Arc::new(ScriptedProber::always_failing()), 10, 100.0);
    let record_rx = rig.deps.record_tx.subscribe();

    let (recorder, _join) = RecorderHandle::spawn(record_rx, Box::new(MemoryBackend::new()), None);
    let reconciler = Arc::new(Reconciler::new(rig.deps));
    reconciler
        .reconcile(&[target.to_string()].into_iter().collect())
        .await;

    let addr = spawn_api_server(
        "127.0.0.1:0".parse().unwrap(),
        ApiState::new(recorder.clone(), reconciler.clone()),
    )
    .await
    .unwrap();

    ApiRig {
        addr,
        reconciler,
        recorder,
    }
}

async fn get_json(addr: SocketAddr, path: &str) -> (reqwest::StatusCode, Value) {
    let response = reqwest::get(format!("http://{addr}{path}")).await.unwrap();
    let status = response.status();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn health_reports_backend_status() {
    let rig = spawn_test_api("a.example").await;

    let (status, body) = get_json(rig.addr, "/api/v1/health").await;

    assert_eq!(status, reqwest::StatusCode::OK);
    assert_eq!(body["status"], "ok");

    rig.reconciler.stop_all().await;
}

#[tokio::test]
async fn records_endpoint_returns_persisted_observations() {
    let rig = spawn_test_api("a.example").await;

    // The spawn cycle plus two driven cycles, flushed into the backend.
    rig.reconciler.probe_now("a.example").await.unwrap();
    rig.reconciler.probe_now("a.example").await.unwrap();
    rig.recorder.flush().await.unwrap();

    let (status, body) = get_json(rig.addr, "/api/v1/records").await;

    assert_eq!(status, reqwest::StatusCode::OK);
    assert_eq!(body["count"], 3);
    let records = body["records"].as_array().unwrap();
    assert_eq!(records[0]["status"], "Ping Failure");
    assert_eq!(records[0]["attempt"], 3, "newest first");

    let (_, limited) = get_json(rig.addr, "/api/v1/records?limit=1").await;
    assert_eq!(limited["count"], 1);

    rig.reconciler.stop_all().await;
}

#[tokio::test]
async fn targets_endpoint_merges_storage_and_running_monitors() {
    let rig = spawn_test_api("a.example").await;

    rig.recorder.flush().await.unwrap();
    let (status, body) = get_json(rig.addr, "/api/v1/targets").await;

    assert_eq!(status, reqwest::StatusCode::OK);
    let targets = body["targets"].as_array().unwrap();
    let entry = targets
        .iter()
        .find(|t| t["target"] == "a.example")
        .expect("monitored target is listed");
    assert_eq!(entry["monitored"], true);

    rig.reconciler.stop_all().await;
}

#[tokio::test]
async fn stats_endpoint_aggregates_the_window() {
    let rig = spawn_test_api("a.example").await;

    rig.reconciler.probe_now("a.example").await.unwrap();
    rig.recorder.flush().await.unwrap();

    let (status, body) = get_json(rig.addr, "/api/v1/targets/a.example/stats").await;

    assert_eq!(status, reqwest::StatusCode::OK);
    assert_eq!(body["target"], "a.example");
    assert_eq!(body["total_records"], 2);
    assert_eq!(body["successful_records"], 0);
    assert_eq!(body["uptime_percentage"], 0.0);
    assert_eq!(body["trailing_failures"], 2);

    rig.reconciler.stop_all().await;
}

#[tokio::test]
async fn unknown_target_stats_is_404() {
    let rig = spawn_test_api("a.example").await;

    let (status, body) = get_json(rig.addr, "/api/v1/targets/nobody.example/stats").await;

    assert_eq!(status, reqwest::StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("nobody.example"));

    rig.reconciler.stop_all().await;
}
