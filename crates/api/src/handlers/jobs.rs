//! Handlers for job submission and job status.
//!
//! A submission is accepted as soon as it is queued; the work itself runs on
//! the dispatcher and its outcome is visible through `GET /jobs/{job_id}`
//! and `GET /results/{job_id}`.

use axum::extract::{Multipart, Path, State};
use axum::Json;
use barbershop_core::error::CoreError;
use barbershop_core::job::JobRecord;
use barbershop_core::paths::{job_output_dir, resolve_within};
use barbershop_core::types::{new_job_id, JobId};
use barbershop_pipeline::JobSpec;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of a successful `POST /process`.
#[derive(Debug, Serialize)]
pub struct ProcessStarted {
    pub message: &'static str,
    pub job_id: JobId,
}

/// Raw multipart fields of a submission.
#[derive(Default)]
struct SubmitForm {
    files: [Option<Vec<u8>>; 3],
    input_dir: Option<String>,
    output_dir: Option<String>,
}

impl SubmitForm {
    async fn read(multipart: &mut Multipart) -> AppResult<Self> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?
        {
            let name = field.name().unwrap_or("").to_string();
            let slot = match name.as_str() {
                "file1" => 0,
                "file2" => 1,
                "file3" => 2,
                "input_dir" | "output_dir" => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(e.to_string()))?;
                    if name == "input_dir" {
                        form.input_dir = Some(text);
                    } else {
                        form.output_dir = Some(text);
                    }
                    continue;
                }
                _ => continue, // ignore unknown fields
            };
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.to_string()))?;
            form.files[slot] = Some(data.to_vec());
        }

        Ok(form)
    }
}

fn required<T>(value: Option<T>, field: &str) -> AppResult<T> {
    value.ok_or_else(|| AppError::BadRequest(format!("Missing required '{field}' field")))
}

fn required_upload(value: Option<Vec<u8>>, field: &str) -> AppResult<Vec<u8>> {
    let data = required(value, field)?;
    if data.is_empty() {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Uploaded '{field}' is empty"
        ))));
    }
    Ok(data)
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

/// POST /process
///
/// Accepts `file1`, `file2`, `file3`, `input_dir` and `output_dir` as
/// multipart fields, queues the job and returns its id immediately.
/// Image decoding happens in the background, so an unreadable upload is
/// still accepted here and shows up as a failed job.
pub async fn process(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<ProcessStarted>> {
    let SubmitForm {
        files: [file1, file2, file3],
        input_dir,
        output_dir,
    } = SubmitForm::read(&mut multipart).await?;

    let uploads = [
        required_upload(file1, "file1")?,
        required_upload(file2, "file2")?,
        required_upload(file3, "file3")?,
    ];
    let root = &state.config.data_root;
    let input_dir = resolve_within(root, &required(input_dir, "input_dir")?)?;
    let output_base = resolve_within(root, &required(output_dir, "output_dir")?)?;

    let job_id = new_job_id();
    let job = JobSpec {
        id: job_id,
        uploads,
        input_dir,
        output_dir: job_output_dir(&output_base, job_id),
    };

    tracing::info!(
        job_id = %job_id,
        input_dir = %job.input_dir.display(),
        output_dir = %job.output_dir.display(),
        "Job submitted",
    );

    state.submitter.submit(job).await?;

    Ok(Json(ProcessStarted {
        message: "Processing started",
        job_id,
    }))
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// GET /jobs/{job_id}
///
/// Current state record of a job submitted since the server started.
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
) -> AppResult<Json<DataResponse<JobRecord>>> {
    let record = state
        .registry
        .get(job_id)
        .await
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Job",
            id: job_id,
        }))?;

    Ok(Json(DataResponse { data: record }))
}
