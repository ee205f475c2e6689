//! Per-target status endpoints

use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use crate::{
    PingRecord,
    api::{
        error::{ApiError, ApiResult},
        state::ApiState,
        types::{TargetOverview, TargetStatsResponse, TargetsResponse},
    },
};

/// Query parameters for target statistics
#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    /// How many recent records to aggregate over (default: 100)
    window: Option<usize>,
}

/// GET /api/v1/targets
///
/// Lists every target known to the record sink or currently monitored,
/// with its latest record.
pub async fn list_targets(State(state): State<ApiState>) -> ApiResult<Json<TargetsResponse>> {
    let latest = state.recorder.latest_per_target().await?;
    let running = state.reconciler.running_targets().await;

    let mut by_target: BTreeMap<String, Option<PingRecord>> = latest
        .into_iter()
        .map(|record| (record.target.clone(), Some(record)))
        .collect();
    for target in running {
        by_target.entry(target).or_insert(None);
    }

    let mut targets = Vec::with_capacity(by_target.len());
    for (target, latest) in by_target {
        let monitored = state.reconciler.is_monitored(&target).await;
        targets.push(TargetOverview {
            target,
            monitored,
            latest,
        });
    }

    let count = targets.len();
    Ok(Json(TargetsResponse { targets, count }))
}

/// GET /api/v1/targets/:name/stats
///
/// Aggregated statistics over the most recent records of one target.
pub async fn target_stats(
    State(state): State<ApiState>,
    Path(name): Path<String>,
    Query(query): Query<StatsQuery>,
) -> ApiResult<Json<TargetStatsResponse>> {
    let window = query.window.unwrap_or(100).clamp(1, 10_000);

    let stats = state.recorder.target_stats(&name, window).await?;
    if stats.total_records == 0 && !state.reconciler.is_monitored(&name).await {
        return Err(ApiError::NotFound(format!("unknown target: {name}")));
    }

    Ok(Json(TargetStatsResponse { window, stats }))
}
