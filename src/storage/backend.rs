//! Storage backend trait definition

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::PingRecord;

use super::error::StorageResult;
use super::schema::TargetStats;

/// Query parameters for fetching stored records
#[derive(Debug, Clone)]
pub struct RecordQuery {
    /// Restrict to one target (all targets when absent)
    pub target: Option<String>,

    /// Maximum number of records to return
    pub limit: usize,

    /// Records to skip (for pagination)
    pub offset: usize,
}

impl Default for RecordQuery {
    fn default() -> Self {
        Self {
            target: None,
            limit: 100,
            offset: 0,
        }
    }
}

/// Health status of the storage backend
#[derive(Debug, Clone)]
pub struct HealthStatus {
    /// Is the backend operational?
    pub healthy: bool,

    /// Human-readable status message
    pub message: String,

    /// Additional backend-specific metadata
    pub metadata: std::collections::HashMap<String, String>,
}

/// Trait for record sinks.
///
/// Implementations must be `Send + Sync`; they are shared by the recorder
/// actor and the query API across tasks, and any internal synchronization
/// (e.g. a connection pool) is the implementation's responsibility.
///
/// Writes are append-only. A failed write is reported to the caller, which
/// logs and drops the batch - observations are continuously generated, so a
/// gap is acceptable and never fatal.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Insert a batch of records. Must be atomic per batch.
    async fn insert_batch(&self, records: Vec<PingRecord>) -> StorageResult<()>;

    /// Fetch records, newest first.
    async fn query_records(&self, query: RecordQuery) -> StorageResult<Vec<PingRecord>>;

    /// The most recent record of every target that has any.
    async fn latest_per_target(&self) -> StorageResult<Vec<PingRecord>>;

    /// Rolling statistics over the trailing `window` records of one target.
    async fn target_stats(&self, target: &str, window: usize) -> StorageResult<TargetStats>;

    /// Delete records older than the given timestamp; returns how many were
    /// removed. Used for retention policy enforcement.
    async fn cleanup_old_records(&self, before: DateTime<Utc>) -> StorageResult<usize>;

    /// Lightweight operational check.
    async fn health_check(&self) -> StorageResult<HealthStatus>;

    /// Release underlying resources (close the pool). Called exactly once,
    /// after every writer has stopped.
    async fn close(&self) -> StorageResult<()>;
}
