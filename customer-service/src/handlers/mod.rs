//! HTTP handlers for customer-service.

pub mod customers;
pub mod payments;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::services::get_metrics;
use crate::startup::AppState;

/// Liveness plus a store ping; `503` when the store does not answer.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let backend = state.repository.backend();
    match state.repository.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "service": "customer-service", "store": backend })),
        ),
        Err(e) => {
            tracing::warn!(error = %e, store = backend, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable", "service": "customer-service", "store": backend })),
            )
        }
    }
}

pub async fn readiness_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ready" })))
}

pub async fn metrics() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        get_metrics(),
    )
}
