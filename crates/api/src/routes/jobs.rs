//! Route definitions for job submission, results and status.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{jobs, results};
use crate::state::AppState;

/// Job routes.
///
/// ```text
/// POST   /process               -> process
/// GET    /results/{job_id}      -> get_result
/// GET    /jobs/{job_id}         -> get_job
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/process", post(jobs::process))
        .route("/results/{job_id}", get(results::get_result))
        .route("/jobs/{job_id}", get(jobs::get_job))
}
