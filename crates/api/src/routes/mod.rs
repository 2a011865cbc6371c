pub mod health;
pub mod jobs;

use axum::routing::get;
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the application route tree.
///
/// Route hierarchy:
///
/// ```text
/// /                        welcome message
/// /process                 submit a job (POST, multipart)
/// /results/{job_id}        result image or not-ready JSON
/// /jobs/{job_id}           job state record
/// ```
///
/// `/health` is mounted separately by the router builder.
pub fn app_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::home::welcome))
        .merge(jobs::router())
}
