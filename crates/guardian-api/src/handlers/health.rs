//! Health and version probes

use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub name: &'static str,
    pub version: &'static str,
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy" })
}

/// GET /health/ready
pub async fn ready() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ready" })
}

/// GET /health/live
pub async fn live() -> Json<HealthResponse> {
    Json(HealthResponse { status: "alive" })
}

/// GET /version
pub async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        name: "guardian",
        version: env!("CARGO_PKG_VERSION"),
    })
}
