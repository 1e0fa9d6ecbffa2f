//! Health check endpoints.

use axum::{extract::State, http::StatusCode, response::IntoResponse};

use crate::state::AppState;

/// Liveness probe.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness probe: is the backend reachable?
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    match state.backend().ping().await {
        Ok(()) => (StatusCode::OK, "ready"),
        Err(e) => {
            tracing::warn!("Readiness check failed: {e}");
            (StatusCode::SERVICE_UNAVAILABLE, "backend unavailable")
        }
    }
}
