//! Health check endpoint.

use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
}

/// GET /health — liveness of `service`.
pub async fn check(service: &'static str) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service,
    })
}
