//! Job state records.
//!
//! A [`JobRecord`] tracks one synthesis job from submission to completion.
//! Records are plain data; the pipeline's registry owns them and applies
//! the transitions defined here.

use std::path::PathBuf;

use serde::Serialize;

use crate::types::{JobId, Timestamp};

/// Most stderr kept on a failed record. Longer output keeps its tail, where
/// tracebacks end.
pub const MAX_STORED_STDERR: usize = 64 * 1024;

/// Lifecycle of a job.
///
/// ```text
/// pending -> running -> succeeded
///                    \-> failed
/// pending ------------> failed      (never started, e.g. on shutdown)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    /// Whether the job has reached a final state.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// State record for a single job.
#[derive(Debug, Clone, Serialize)]
pub struct JobRecord {
    pub id: JobId,
    pub status: JobStatus,
    /// Directory holding the uploads and their resized derivatives.
    pub input_dir: PathBuf,
    /// Job-scoped output directory (`<output_dir>/<job_id>`).
    pub output_dir: PathBuf,
    pub submitted_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub finished_at: Option<Timestamp>,
    /// Path of the synthesized image, set once the job succeeds.
    pub result_path: Option<PathBuf>,
    /// Exit code of the synthesis tool, if it ran to completion.
    pub exit_code: Option<i32>,
    /// Captured stderr of the synthesis tool.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    /// Human-readable failure reason.
    pub error: Option<String>,
}

impl JobRecord {
    /// Create a freshly submitted (pending) record.
    pub fn new(id: JobId, input_dir: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            id,
            status: JobStatus::Pending,
            input_dir,
            output_dir,
            submitted_at: chrono::Utc::now(),
            started_at: None,
            finished_at: None,
            result_path: None,
            exit_code: None,
            stderr: None,
            error: None,
        }
    }

    pub fn mark_running(&mut self) {
        self.status = JobStatus::Running;
        self.started_at = Some(chrono::Utc::now());
    }

    pub fn mark_succeeded(&mut self, result_path: PathBuf, exit_code: i32) {
        self.status = JobStatus::Succeeded;
        self.result_path = Some(result_path);
        self.exit_code = Some(exit_code);
        self.finished_at = Some(chrono::Utc::now());
    }

    /// Record a failure. `exit_code` and `stderr` are only known when the
    /// synthesis tool actually ran. Only the last [`MAX_STORED_STDERR`]
    /// bytes of `stderr` are kept.
    pub fn mark_failed(&mut self, reason: String, exit_code: Option<i32>, stderr: Option<String>) {
        self.status = JobStatus::Failed;
        self.error = Some(reason);
        self.exit_code = exit_code;
        self.stderr = stderr.map(tail);
        self.finished_at = Some(chrono::Utc::now());
    }
}

fn tail(mut text: String) -> String {
    if text.len() <= MAX_STORED_STDERR {
        return text;
    }
    let mut start = text.len() - MAX_STORED_STDERR;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    text.drain(..start);
    text
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
