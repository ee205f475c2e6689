//! In-memory storage backend (no persistence)
//!
//! Records live in a bounded ring buffer per target. Useful for tests and
//! deployments that only care about alerting, not history.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use crate::PingRecord;

use super::backend::{HealthStatus, RecordQuery, StorageBackend};
use super::error::StorageResult;
use super::schema::TargetStats;

/// Maximum records kept per target before the oldest are evicted
const MAX_RECORDS_PER_TARGET: usize = 1000;

/// In-memory record sink with a fixed per-target capacity.
#[derive(Default)]
pub struct MemoryBackend {
    /// Records grouped by target, oldest first within each buffer
    records: RwLock<HashMap<String, VecDeque<PingRecord>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn insert_batch(&self, records: Vec<PingRecord>) -> StorageResult<()> {
        let mut store = self.records.write().await;

        for record in records {
            let buffer = store.entry(record.target.clone()).or_default();
            buffer.push_back(record);
            if buffer.len() > MAX_RECORDS_PER_TARGET {
                buffer.pop_front();
            }
        }

        Ok(())
    }

    async fn query_records(&self, query: RecordQuery) -> StorageResult<Vec<PingRecord>> {
        let store = self.records.read().await;

        let mut matching: Vec<PingRecord> = match &query.target {
            Some(target) => store
                .get(target)
                .map(|buffer| buffer.iter().cloned().collect())
                .unwrap_or_default(),
            None => store.values().flatten().cloned().collect(),
        };

        // newest first across targets
        matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.attempt.cmp(&a.attempt)));

        Ok(matching
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect())
    }

    async fn latest_per_target(&self) -> StorageResult<Vec<PingRecord>> {
        let store = self.records.read().await;

        let mut latest: Vec<PingRecord> = store
            .values()
            .filter_map(|buffer| buffer.back().cloned())
            .collect();
        latest.sort_by(|a, b| a.target.cmp(&b.target));

        Ok(latest)
    }

    async fn target_stats(&self, target: &str, window: usize) -> StorageResult<TargetStats> {
        let store = self.records.read().await;

        let recent: Vec<PingRecord> = store
            .get(target)
            .map(|buffer| buffer.iter().rev().take(window).cloned().collect())
            .unwrap_or_default();

        Ok(TargetStats::from_window(target, &recent))
    }

    async fn cleanup_old_records(&self, before: DateTime<Utc>) -> StorageResult<usize> {
        let mut store = self.records.write().await;
        let mut deleted = 0;

        for buffer in store.values_mut() {
            let len_before = buffer.len();
            buffer.retain(|r| r.timestamp >= before);
            deleted += len_before - buffer.len();
        }

        debug!("in-memory cleanup removed {deleted} records");
        Ok(deleted)
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        let store = self.records.read().await;
        let total: usize = store.values().map(VecDeque::len).sum();

        Ok(HealthStatus {
            healthy: true,
            message: "in-memory storage operational".to_string(),
            metadata: std::collections::HashMap::from([
                ("backend".to_string(), "memory".to_string()),
                ("total_records".to_string(), total.to_string()),
                ("targets".to_string(), store.len().to_string()),
            ]),
        })
    }

    async fn close(&self) -> StorageResult<()> {
        debug!("closing in-memory backend");
        Ok(())
    }
}
