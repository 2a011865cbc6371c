//! Result retrieval.
//!
//! The result location is derived from the caller's `output_dir`, the job id
//! and the tool's naming convention, so a result can be fetched by anyone
//! who knows where it was written. Outcomes that are not an image are
//! reported with status 200 and a JSON `error` body.

use std::io::ErrorKind;
use std::path::Path as FsPath;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use barbershop_core::job::JobStatus;
use barbershop_core::paths::{job_output_dir, resolve_within};
use barbershop_core::types::JobId;
use serde::Serialize;
use tokio_util::io::ReaderStream;

use crate::error::{AppError, AppResult};
use crate::extract::OutputDir;
use crate::state::AppState;

const NOT_READY: &str = "Results not ready or job ID is incorrect";

#[derive(Debug, Serialize)]
struct NotReady {
    error: &'static str,
}

#[derive(Debug, Serialize)]
struct JobFailed {
    error: &'static str,
    job_id: JobId,
    reason: Option<String>,
    exit_code: Option<i32>,
}

fn not_ready() -> Response {
    Json(NotReady { error: NOT_READY }).into_response()
}

/// GET /results/{job_id}
///
/// `output_dir` must match the one given at submission. Streams the result
/// image as `image/png` once the tool has written it; otherwise the JSON body
/// says the job failed or is not ready yet.
pub async fn get_result(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    OutputDir(output_dir): OutputDir,
) -> AppResult<Response> {
    let output_base = resolve_within(&state.config.data_root, &output_dir)?;

    // Ids are only ever issued as UUIDs; anything else cannot have a result.
    let Ok(job_id) = job_id.parse::<JobId>() else {
        return Ok(not_ready());
    };

    let job_dir = job_output_dir(&output_base, job_id);
    let result_path = state.tool.result_path(&job_dir);

    if let Some((file, len)) = open_result(&result_path).await {
        tracing::debug!(job_id = %job_id, bytes = len, "Serving result");
        return Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, "image/png")
            .header(CONTENT_LENGTH, len.to_string())
            .body(Body::from_stream(ReaderStream::new(file)))
            .map_err(|e| AppError::InternalError(e.to_string()));
    }

    // Report a known failure only when the caller named the same output
    // directory the job was submitted with.
    match state.registry.get(job_id).await {
        Some(record) if record.status == JobStatus::Failed && record.output_dir == job_dir => {
            Ok(Json(JobFailed {
                error: "Job failed",
                job_id,
                reason: record.error,
                exit_code: record.exit_code,
            })
            .into_response())
        }
        _ => Ok(not_ready()),
    }
}

/// Open the result for streaming. `None` unless it is a readable regular file.
async fn open_result(path: &FsPath) -> Option<(tokio::fs::File, u64)> {
    let opened = async {
        let file = tokio::fs::File::open(path).await?;
        let meta = file.metadata().await?;
        Ok::<_, std::io::Error>((file, meta))
    }
    .await;

    match opened {
        Ok((file, meta)) if meta.is_file() => Some((file, meta.len())),
        Ok(_) => {
            tracing::warn!(path = %path.display(), "Result path is not a regular file");
            None
        }
        Err(e) if e.kind() == ErrorKind::NotFound => None,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Cannot open result");
            None
        }
    }
}
