//! Message types for actor communication

use tokio::sync::oneshot;

use crate::{
    PingRecord,
    storage::{HealthStatus, RecordQuery, StorageResult, TargetStats},
};

/// Commands accepted by a target monitor between probe cycles.
#[derive(Debug)]
pub enum MonitorCommand {
    /// Run a probe cycle immediately instead of waiting for the interval.
    ProbeNow {
        respond_to: oneshot::Sender<MonitorState>,
    },
    /// Inspect the monitor's counters without probing.
    GetState {
        respond_to: oneshot::Sender<MonitorState>,
    },
    Shutdown,
}

/// Snapshot of a monitor's internal counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorState {
    pub target: String,
    pub consecutive_failures: usize,
    pub consecutive_latency_alerts: usize,
    /// The attempt number the next probe cycle will use.
    pub next_attempt: u64,
}

/// Commands accepted by the recorder actor.
#[derive(Debug)]
pub enum RecorderCommand {
    /// Write the current batch out immediately.
    Flush {
        respond_to: oneshot::Sender<StorageResult<()>>,
    },
    QueryRecords {
        query: RecordQuery,
        respond_to: oneshot::Sender<StorageResult<Vec<PingRecord>>>,
    },
    LatestPerTarget {
        respond_to: oneshot::Sender<StorageResult<Vec<PingRecord>>>,
    },
    TargetStats {
        target: String,
        window: usize,
        respond_to: oneshot::Sender<StorageResult<TargetStats>>,
    },
    HealthCheck {
        respond_to: oneshot::Sender<StorageResult<HealthStatus>>,
    },
    Shutdown,
}

/// Commands accepted by the config watcher.
#[derive(Debug)]
pub enum WatcherCommand {
    /// Re-read the config file right now, regardless of its mtime.
    ReloadNow {
        respond_to: oneshot::Sender<anyhow::Result<ReconcileSummary>>,
    },
    Shutdown,
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Targets a monitor was started for.
    pub started: Vec<String>,
    /// Targets whose monitor was stopped.
    pub stopped: Vec<String>,
}

impl ReconcileSummary {
    pub fn is_noop(&self) -> bool {
        self.started.is_empty() && self.stopped.is_empty()
    }
}
