//! The recorder actor as the single writer in front of a storage backend.

use chrono::Utc;
use pingwarden::{
    PingRecord, StatusKind,
    actors::recorder::RecorderHandle,
    storage::{MemoryBackend, RecordQuery},
};
use pretty_assertions::assert_eq;
use tokio::sync::broadcast;

fn record(target: &str, attempt: u64, status: StatusKind) -> PingRecord {
    PingRecord {
        timestamp: Utc::now(),
        target: target.to_string(),
        resolved_ip: Some("127.0.0.1".to_string()),
        status,
        latency_ms: match status {
            StatusKind::Success | StatusKind::HighLatency => Some(12.5),
            _ => None,
        },
        attempt,
    }
}

#[tokio::test]
async fn broadcast_records_end_up_in_the_backend() {
    let (record_tx, record_rx) = broadcast::channel(256);
    let (recorder, join) = RecorderHandle::spawn(record_rx, Box::new(MemoryBackend::new()), None);

    for attempt in 1..=3 {
        record_tx
            .send(record("a.example", attempt, StatusKind::Success))
            .unwrap();
    }

    recorder.flush().await.unwrap();
    let records = recorder.query_records(RecordQuery::default()).await.unwrap();

    assert_eq!(records.len(), 3);
    // Newest first.
    assert_eq!(records[0].attempt, 3);
    assert_eq!(records[2].attempt, 1);

    recorder.shutdown().await;
    join.await.unwrap();
}

#[tokio::test]
async fn queries_are_served_while_recording() {
    let (record_tx, record_rx) = broadcast::channel(256);
    let (recorder, join) = RecorderHandle::spawn(record_rx, Box::new(MemoryBackend::new()), None);

    record_tx
        .send(record("a.example", 1, StatusKind::Success))
        .unwrap();
    record_tx
        .send(record("a.example", 2, StatusKind::PingFailure))
        .unwrap();
    record_tx
        .send(record("b.example", 1, StatusKind::Success))
        .unwrap();
    recorder.flush().await.unwrap();

    let latest = recorder.latest_per_target().await.unwrap();
    assert_eq!(latest.len(), 2);

    let stats = recorder.target_stats("a.example", 100).await.unwrap();
    assert_eq!(stats.total_records, 2);
    assert_eq!(stats.successful_records, 1);
    assert_eq!(stats.uptime_percentage, 50.0);

    let health = recorder.health_check().await.unwrap();
    assert!(health.healthy);

    recorder.shutdown().await;
    join.await.unwrap();
}

#[tokio::test]
async fn filtered_queries_only_return_the_requested_target() {
    let (record_tx, record_rx) = broadcast::channel(256);
    let (recorder, join) = RecorderHandle::spawn(record_rx, Box::new(MemoryBackend::new()), None);

    record_tx
        .send(record("a.example", 1, StatusKind::Success))
        .unwrap();
    record_tx
        .send(record("b.example", 1, StatusKind::Success))
        .unwrap();
    recorder.flush().await.unwrap();

    let records = recorder
        .query_records(RecordQuery {
            target: Some("b.example".to_string()),
            ..RecordQuery::default()
        })
        .await
        .unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].target, "b.example");

    recorder.shutdown().await;
    join.await.unwrap();
}

#[tokio::test]
async fn shutdown_drains_unflushed_records() {
    let (record_tx, record_rx) = broadcast::channel(256);
    let (recorder, join) = RecorderHandle::spawn(record_rx, Box::new(MemoryBackend::new()), None);

    // No flush in between: these sit in the broadcast buffer or the batch.
    for attempt in 1..=5 {
        record_tx
            .send(record("a.example", attempt, StatusKind::Success))
            .unwrap();
    }

    recorder.shutdown().await;
    join.await.unwrap();
    // The backend is owned by the recorder, so the only observable effect
    // is that shutdown completed without the writer task hanging. Loss
    // would show up in the sqlite shutdown test, which reopens the file.
}
