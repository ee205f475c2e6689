//! Ping record query endpoint

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;

use crate::{
    api::{error::ApiResult, state::ApiState, types::RecordsResponse},
    storage::RecordQuery,
};

/// Query parameters for record listing
#[derive(Debug, Deserialize)]
pub struct RecordsQuery {
    /// Restrict results to one target
    target: Option<String>,

    /// Max results (default: 100)
    limit: Option<usize>,

    /// Skip this many results (default: 0)
    offset: Option<usize>,
}

/// GET /api/v1/records
///
/// Returns stored ping records, newest first.
pub async fn list_records(
    State(state): State<ApiState>,
    Query(query): Query<RecordsQuery>,
) -> ApiResult<Json<RecordsResponse>> {
    let limit = query.limit.unwrap_or(100).clamp(1, 1000);

    let records = state
        .recorder
        .query_records(RecordQuery {
            target: query.target,
            limit,
            offset: query.offset.unwrap_or(0),
        })
        .await?;

    let count = records.len();
    Ok(Json(RecordsResponse { records, count }))
}
