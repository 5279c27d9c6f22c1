//! Health check handler.

use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub storage: &'static str,
    pub metadata: &'static str,
}

/// GET /health - Liveness plus dependency connectivity.
///
/// Unauthenticated so load balancers and orchestration probes can hit it.
/// Reports 503 when either durable backend is unreachable.
pub async fn health_check(State(state): State<AppState>) -> Response {
    let storage = state.storage.health_check().await;
    let metadata = state.metadata.health_check().await;

    if let Err(error) = &storage {
        tracing::warn!(error = %error, "storage health check failed");
    }
    if let Err(error) = &metadata {
        tracing::warn!(error = %error, "metadata health check failed");
    }

    let healthy = storage.is_ok() && metadata.is_ok();
    let body = Json(HealthResponse {
        status: if healthy { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        storage: if storage.is_ok() { "ok" } else { "unreachable" },
        metadata: if metadata.is_ok() { "ok" } else { "unreachable" },
    });

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, body).into_response()
}
