pub mod actors;
pub mod alerts;
pub mod api;
pub mod config;
pub mod evaluate;
pub mod lifecycle;
pub mod probe;
pub mod storage;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Classification of a single probe cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusKind {
    Success,
    #[serde(rename = "High Latency")]
    HighLatency,
    #[serde(rename = "Ping Failure")]
    PingFailure,
    #[serde(rename = "Resolution Failure")]
    ResolutionFailure,
}

impl StatusKind {
    /// String stored in the `status` column of the record sink.
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusKind::Success => "Success",
            StatusKind::HighLatency => "High Latency",
            StatusKind::PingFailure => "Ping Failure",
            StatusKind::ResolutionFailure => "Resolution Failure",
        }
    }

    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "Success" => StatusKind::Success,
            "High Latency" => StatusKind::HighLatency,
            "Resolution Failure" => StatusKind::ResolutionFailure,
            _ => StatusKind::PingFailure,
        }
    }
}

impl std::fmt::Display for StatusKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One persisted observation: the outcome of a single probe cycle for one target.
///
/// This is the unit written to the record sink and broadcast to subscribers.
/// Within a target, records are strictly ordered by `attempt`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingRecord {
    /// When the cycle completed (always UTC)
    pub timestamp: DateTime<Utc>,

    /// Target name as configured (hostname/URL)
    pub target: String,

    /// Resolved address, absent when resolution failed
    pub resolved_ip: Option<String>,

    /// Outcome classification
    pub status: StatusKind,

    /// Round-trip time in milliseconds, absent for failures
    pub latency_ms: Option<f64>,

    /// Monotonic per-target attempt counter (starts at 1, never reset)
    pub attempt: u64,
}

/// Transient result of one reachability check, before classification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeOutcome {
    pub success: bool,
    pub latency_ms: Option<f64>,
}

impl ProbeOutcome {
    pub fn success(latency_ms: f64) -> Self {
        Self {
            success: true,
            latency_ms: Some(latency_ms),
        }
    }

    pub fn failure() -> Self {
        Self {
            success: false,
            latency_ms: None,
        }
    }
}
