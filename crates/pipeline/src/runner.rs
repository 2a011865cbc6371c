//! Executes a single synthesis job end to end.
//!
//! 1. Create the input and job output directories.
//! 2. Write the three uploads as `file{1,2,3}.png`.
//! 3. Resize each to `resized_{1,2,3}.png` (blocking pool).
//! 4. Run the synthesis tool and wait for it.
//! 5. Check that the result file exists.

use std::path::PathBuf;

use barbershop_core::preprocess::{self, ProcessingError, TARGET_SIZE};
use barbershop_core::subprocess::{self, ProcessError, ProcessOutput};
use barbershop_core::synthesis::{SynthesisTool, RESIZED_FILE_NAMES, UPLOAD_FILE_NAMES};
use barbershop_core::types::JobId;

/// Everything needed to run one job.
#[derive(Debug, Clone)]
pub struct JobSpec {
    pub id: JobId,
    /// Raw bytes of the three uploaded images, in `file1..file3` order.
    pub uploads: [Vec<u8>; 3],
    /// Directory receiving the uploads and resized derivatives.
    pub input_dir: PathBuf,
    /// Job-scoped output directory (`<output_dir>/<job_id>`).
    pub output_dir: PathBuf,
}

/// Successful job result.
#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub result_path: PathBuf,
    pub output: ProcessOutput,
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("failed to create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write upload {}: {source}", path.display())]
    WriteUpload {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Processing(#[from] ProcessingError),

    #[error("preprocessing task aborted: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("synthesis tool could not be run: {0}")]
    Process(#[from] ProcessError),

    #[error("synthesis tool exited with code {}", output.exit_code)]
    ToolFailed { output: ProcessOutput },

    #[error("synthesis tool exited successfully but produced no result at {}", path.display())]
    MissingResult { path: PathBuf, output: ProcessOutput },
}

impl RunError {
    /// Exit code and stderr of the tool, when it ran to completion.
    pub fn tool_output(&self) -> Option<&ProcessOutput> {
        match self {
            Self::ToolFailed { output } | Self::MissingResult { output, .. } => Some(output),
            _ => None,
        }
    }
}

/// Runs jobs against a configured [`SynthesisTool`].
#[derive(Debug, Clone)]
pub struct JobRunner {
    tool: SynthesisTool,
    target_size: (u32, u32),
}

impl JobRunner {
    pub fn new(tool: SynthesisTool) -> Self {
        Self {
            tool,
            target_size: TARGET_SIZE,
        }
    }

    /// Override the resize target. The synthesis tool itself requires
    /// [`TARGET_SIZE`]; smaller sizes keep tests fast.
    pub fn with_target_size(mut self, target_size: (u32, u32)) -> Self {
        self.target_size = target_size;
        self
    }

    /// Run `job` to completion.
    pub async fn run(&self, job: &JobSpec) -> Result<JobOutcome, RunError> {
        self.prepare_inputs(job).await?;

        let mut cmd = self.tool.command(&job.input_dir, &job.output_dir);
        tracing::debug!(job_id = %job.id, command = ?cmd.as_std(), "Invoking synthesis tool");

        let output = subprocess::run_command(&mut cmd, &self.tool.run_options()).await?;
        tracing::debug!(
            job_id = %job.id,
            exit_code = output.exit_code,
            duration_ms = output.duration_ms,
            "Synthesis tool finished",
        );

        if !output.success() {
            return Err(RunError::ToolFailed { output });
        }

        let result_path = self.tool.result_path(&job.output_dir);
        if !tokio::fs::try_exists(&result_path).await.unwrap_or(false) {
            return Err(RunError::MissingResult {
                path: result_path,
                output,
            });
        }

        Ok(JobOutcome {
            result_path,
            output,
        })
    }

    /// Steps 1-3: directories, raw uploads, resized derivatives.
    async fn prepare_inputs(&self, job: &JobSpec) -> Result<(), RunError> {
        for dir in [&job.input_dir, &job.output_dir] {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| RunError::CreateDir {
                    path: dir.clone(),
                    source: e,
                })?;
        }

        let mut pairs = Vec::with_capacity(UPLOAD_FILE_NAMES.len());
        for ((upload, raw_name), resized_name) in job
            .uploads
            .iter()
            .zip(UPLOAD_FILE_NAMES)
            .zip(RESIZED_FILE_NAMES)
        {
            let raw_path = job.input_dir.join(raw_name);
            tokio::fs::write(&raw_path, upload)
                .await
                .map_err(|e| RunError::WriteUpload {
                    path: raw_path.clone(),
                    source: e,
                })?;
            pairs.push((raw_path, job.input_dir.join(resized_name)));
        }

        let target_size = self.target_size;
        tokio::task::spawn_blocking(move || resize_all(&pairs, target_size)).await??;
        Ok(())
    }
}

fn resize_all(pairs: &[(PathBuf, PathBuf)], target_size: (u32, u32)) -> Result<(), ProcessingError> {
    for (raw, resized) in pairs {
        preprocess::resize_image(raw, resized, target_size)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
