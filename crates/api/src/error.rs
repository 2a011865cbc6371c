use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use barbershop_core::error::CoreError;
use barbershop_core::paths::PathError;
use barbershop_pipeline::SubmitError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `barbershop_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A caller-supplied directory that is empty or leaves the data root.
    #[error(transparent)]
    Path(#[from] PathError),

    /// The job could not be queued.
    #[error(transparent)]
    Submit(#[from] SubmitError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
            },

            AppError::Path(err) => (StatusCode::BAD_REQUEST, "INVALID_PATH", err.to_string()),

            AppError::Submit(err) => classify_submit_error(err),

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// A full queue is backpressure and a closed queue means shutdown; both
/// tell the client to come back later.
fn classify_submit_error(err: &SubmitError) -> (StatusCode, &'static str, String) {
    match err {
        SubmitError::QueueFull { .. } => {
            tracing::warn!(error = %err, "Rejecting job submission");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "QUEUE_FULL",
                "Too many jobs waiting, try again later".to_string(),
            )
        }
        SubmitError::Closed => (
            StatusCode::SERVICE_UNAVAILABLE,
            "SERVICE_UNAVAILABLE",
            "Service is shutting down".to_string(),
        ),
    }
}
