//! Aggregated per-target statistics derived from stored records
//!
//! The query layer exposes a rolling view over the most recent N records of a
//! target. Uptime counts only `Success` records (a high-latency reply is
//! reachable but not healthy); the latency average covers every record that
//! carries a latency, i.e. successes and high-latency replies.

use serde::{Deserialize, Serialize};

use crate::{PingRecord, StatusKind};

/// Rolling statistics over the trailing window of one target's records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetStats {
    pub target: String,

    /// Records considered (bounded by the requested window)
    pub total_records: usize,

    /// Records with status `Success`
    pub successful_records: usize,

    /// successful_records / total_records * 100, 0 when the window is empty
    pub uptime_percentage: f64,

    /// Mean latency of records carrying a latency, absent when none do
    pub avg_latency_ms: Option<f64>,

    /// Consecutive `Ping Failure` records counted back from the latest
    pub trailing_failures: usize,

    /// Most recent record in the window
    pub latest: Option<PingRecord>,
}

impl TargetStats {
    /// Compute stats from a window ordered newest-first.
    pub fn from_window(target: &str, window: &[PingRecord]) -> Self {
        let total_records = window.len();
        let successful_records = window
            .iter()
            .filter(|r| r.status == StatusKind::Success)
            .count();

        let uptime_percentage = if total_records > 0 {
            successful_records as f64 / total_records as f64 * 100.0
        } else {
            0.0
        };

        let latencies: Vec<f64> = window.iter().filter_map(|r| r.latency_ms).collect();
        let avg_latency_ms = if latencies.is_empty() {
            None
        } else {
            Some(latencies.iter().sum::<f64>() / latencies.len() as f64)
        };

        let trailing_failures = window
            .iter()
            .take_while(|r| r.status == StatusKind::PingFailure)
            .count();

        Self {
            target: target.to_string(),
            total_records,
            successful_records,
            uptime_percentage,
            avg_latency_ms,
            trailing_failures,
            latest: window.first().cloned(),
        }
    }
}
