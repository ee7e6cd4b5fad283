use axum::Json;
use crate::models::{HealthResponse, ProbeResponse};
use tracing::debug;

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    debug!("Health check requested");
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "Server is running".to_string(),
    })
}

/// Readiness check endpoint. Lock state is in memory only, so a running
/// process is a ready one.
pub async fn ready_check() -> Json<HealthResponse> {
    debug!("Readiness check requested");
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "Service is ready".to_string(),
    })
}

/// Root `/health` probe
pub async fn probe() -> Json<ProbeResponse> {
    Json(ProbeResponse { ok: true })
}
