//! Health and version endpoints

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub name: &'static str,
    pub version: &'static str,
    pub sdk_version: &'static str,
}

/// GET /health - local liveness, never sent to Guardial
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy" })
}

/// GET /version
pub async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        sdk_version: guardial_sdk::VERSION,
    })
}

/// GET /health/guardial - runs the SDK self-test against the configured endpoint.
///
/// 200 with the report when Guardial answers, 503 otherwise.
pub async fn guardial_health(State(state): State<AppState>) -> impl IntoResponse {
    let report = state.guardial.self_test().await;
    let status = if report.success {
        StatusCode::OK
    } else {
        tracing::warn!(endpoint = %report.endpoint, "Guardial self-test failed");
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report))
}
