//! Health check endpoint

use axum::{Json, extract::State, http::StatusCode};

use crate::api::{state::ApiState, types::HealthResponse};

/// GET /api/v1/health
///
/// Reports whether the record sink's storage backend is reachable.
pub async fn health_check(
    State(state): State<ApiState>,
) -> (StatusCode, Json<HealthResponse>) {
    let (status_code, status, storage) = match state.recorder.health_check().await {
        Ok(health) if health.healthy => (StatusCode::OK, "ok", health.message),
        Ok(health) => (StatusCode::SERVICE_UNAVAILABLE, "degraded", health.message),
        Err(err) => (StatusCode::SERVICE_UNAVAILABLE, "degraded", err.to_string()),
    };

    (
        status_code,
        Json(HealthResponse {
            status: status.to_string(),
            storage,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }),
    )
}
