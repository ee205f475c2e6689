//! Read-only HTTP query surface
//!
//! Serves aggregate views over the record sink. The API never mutates
//! monitoring state; it only reads through the recorder and reconciler
//! handles.
//!
//! ## Endpoints
//!
//! - `GET /api/v1/health` - Storage backend health
//! - `GET /api/v1/records` - Stored ping records, newest first
//! - `GET /api/v1/targets` - Known targets with their latest record
//! - `GET /api/v1/targets/{name}/stats` - Aggregated target statistics

pub mod error;
pub mod routes;
pub mod state;
pub mod types;

pub use error::{ApiError, ApiResult};
pub use state::ApiState;
pub use types::{
    HealthResponse, RecordsResponse, TargetOverview, TargetStatsResponse, TargetsResponse,
};

use std::net::SocketAddr;

use axum::{Router, routing::get};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

/// Build the API router. Exposed separately so tests can drive it without
/// binding a socket.
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/v1/health", get(routes::health::health_check))
        .route("/api/v1/records", get(routes::records::list_records))
        .route("/api/v1/targets", get(routes::targets::list_targets))
        .route(
            "/api/v1/targets/:name/stats",
            get(routes::targets::target_stats),
        )
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Spawn the API server in a background task.
///
/// Returns the server's local address.
pub async fn spawn_api_server(bind_addr: SocketAddr, state: ApiState) -> anyhow::Result<SocketAddr> {
    info!("starting API server on {bind_addr}");

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    let local_addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            tracing::error!("API server error: {err}");
        }
    });

    Ok(local_addr)
}
