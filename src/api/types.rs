//! Shared API response types

use serde::Serialize;

use crate::{PingRecord, storage::TargetStats};

/// Response for `GET /api/v1/health`
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub storage: String,
    pub timestamp: String,
}

/// Response for `GET /api/v1/records`
#[derive(Debug, Serialize)]
pub struct RecordsResponse {
    pub records: Vec<PingRecord>,
    pub count: usize,
}

/// One entry of `GET /api/v1/targets`
#[derive(Debug, Serialize)]
pub struct TargetOverview {
    pub target: String,
    /// Whether a monitor is currently running for this target.
    pub monitored: bool,
    pub latest: Option<PingRecord>,
}

/// Response for `GET /api/v1/targets`
#[derive(Debug, Serialize)]
pub struct TargetsResponse {
    pub targets: Vec<TargetOverview>,
    pub count: usize,
}

/// Response for `GET /api/v1/targets/{name}/stats`
#[derive(Debug, Serialize)]
pub struct TargetStatsResponse {
    pub window: usize,
    #[serde(flatten)]
    pub stats: TargetStats,
}
