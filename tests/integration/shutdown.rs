//! Ordered, idempotent teardown of the whole system.

use std::sync::Arc;
use std::time::Duration;

use pingwarden::{
    actors::{config_watcher::WatcherHandle, reconciler::Reconciler, recorder::RecorderHandle},
    lifecycle::Coordinator,
    storage::{MemoryBackend, RecordQuery, SqliteBackend, StorageBackend},
};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

use crate::helpers::*;

const PARKED_POLL: Duration = Duration::from_secs(3600);

struct Rig {
    coordinator: Coordinator,
    reconciler: Arc<Reconciler>,
    recorder: RecorderHandle,
    _dir: tempfile::TempDir,
}

async fn build_rig(backend: Box<dyn StorageBackend>, targets: &[&str]) -> Rig {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.json");
    let config = serde_json::json!({ "targets": targets });
    std::fs::write(&config_path, config.to_string()).unwrap();

    let rig = test_deps(Arc::new(ScriptedProber::always_failing()), 10, 100.0);
    let record_rx = rig.deps.record_tx.subscribe();
    let thresholds = rig.deps.thresholds.clone();

    let (recorder, recorder_join) = RecorderHandle::spawn(record_rx, backend, None);
    let reconciler = Arc::new(Reconciler::new(rig.deps));
    reconciler
        .reconcile(&targets.iter().map(|t| t.to_string()).collect())
        .await;

    let watcher = WatcherHandle::spawn(config_path, PARKED_POLL, reconciler.clone(), thresholds);

    Rig {
        coordinator: Coordinator::new(watcher, reconciler.clone(), recorder.clone(), recorder_join),
        reconciler,
        recorder,
        _dir: dir,
    }
}

#[tokio::test]
async fn shutdown_stops_monitors_and_closes_the_recorder() {
    let targets = ["a.example", "b.example", "c.example", "d.example", "e.example"];
    let rig = build_rig(Box::new(MemoryBackend::new()), &targets).await;

    assert_eq!(rig.reconciler.running_targets().await.len(), 5);

    rig.coordinator.shutdown().await;

    assert!(rig.reconciler.running_targets().await.is_empty());
    // The recorder actor is gone, so queries no longer reach a backend.
    assert!(rig.recorder.query_records(RecordQuery::default()).await.is_err());
}

#[tokio::test]
async fn shutdown_is_idempotent() {
    let rig = build_rig(Box::new(MemoryBackend::new()), &["a.example"]).await;

    rig.coordinator.shutdown().await;
    // A second call must return without doing anything, not hang or panic.
    rig.coordinator.shutdown().await;
}

#[tokio::test]
async fn records_are_flushed_before_the_backend_closes() {
    let db_dir = tempdir().unwrap();
    let db_path = db_dir.path().join("records.db");

    let backend = SqliteBackend::new(&db_path).await.unwrap();
    let rig = build_rig(Box::new(backend), &["a.example"]).await;

    // Produce records that sit in the recorder's batch buffer.
    rig.reconciler.probe_now("a.example").await.unwrap();
    rig.reconciler.probe_now("a.example").await.unwrap();

    rig.coordinator.shutdown().await;

    // Everything observed before shutdown must have reached the database,
    // including the spawn cycle's record.
    let reopened = SqliteBackend::new(&db_path).await.unwrap();
    let records = reopened.query_records(RecordQuery::default()).await.unwrap();
    assert_eq!(records.len(), 3);
    reopened.close().await.unwrap();
}
