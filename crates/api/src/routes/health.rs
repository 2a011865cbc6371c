use axum::extract::State;
use axum::{routing::get, Json, Router};
use barbershop_core::job::JobStatus;
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Jobs currently running the synthesis pipeline.
    pub active_jobs: usize,
    /// Jobs waiting for a free slot.
    pub queued_jobs: usize,
}

/// GET /health -- returns service status and job counts.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let active_jobs = state.registry.count_by_status(JobStatus::Running).await;

    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        active_jobs,
        queued_jobs: state.submitter.queued(),
    })
}

/// Mount health check routes.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
