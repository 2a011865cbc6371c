//! Command-line contract of the external hairstyle-transfer tool.
//!
//! The tool reads three 1024x1024 images from `--input_dir` and writes one
//! image to `--output_dir`, named after the three input stems and the style
//! token. [`SynthesisTool`] builds the invocation and [`result_file_name`]
//! derives the output name; both the job runner and the result endpoint use
//! the latter so the naming convention lives in one place.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::process::Command;

use crate::subprocess::RunOptions;

/// Names under which the three raw uploads are stored in the input directory.
pub const UPLOAD_FILE_NAMES: [&str; 3] = ["file1.png", "file2.png", "file3.png"];

/// Names of the resized derivatives handed to the tool, in argument order
/// (`--im_path1`, `--im_path2`, `--im_path3`).
pub const RESIZED_FILE_NAMES: [&str; 3] = ["resized_1.png", "resized_2.png", "resized_3.png"];

/// Default style token (`--sign`).
pub const DEFAULT_SIGN: &str = "realistic";

/// Default blending smoothness (`--smooth`).
pub const DEFAULT_SMOOTH: u32 = 5;

/// Default wall-clock limit for one tool run.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// How to invoke the synthesis tool.
#[derive(Debug, Clone)]
pub struct SynthesisTool {
    /// Executable to run (default `python`).
    pub program: String,
    /// Arguments placed before the contract arguments (default `["main.py"]`).
    pub base_args: Vec<String>,
    /// Working directory of the tool process.
    pub working_dir: PathBuf,
    /// Style token passed as `--sign`.
    pub sign: String,
    /// Smoothness passed as `--smooth`.
    pub smooth: u32,
    /// Kill the tool after this long. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for SynthesisTool {
    fn default() -> Self {
        Self {
            program: "python".to_string(),
            base_args: vec!["main.py".to_string()],
            working_dir: PathBuf::from("."),
            sign: DEFAULT_SIGN.to_string(),
            smooth: DEFAULT_SMOOTH,
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }
}

impl SynthesisTool {
    /// Contract arguments for one job, in the order the tool expects.
    pub fn arguments(&self, input_dir: &Path, output_dir: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::with_capacity(14);
        args.push("--input_dir".into());
        args.push(input_dir.as_os_str().to_owned());
        for (i, name) in RESIZED_FILE_NAMES.iter().enumerate() {
            args.push(format!("--im_path{}", i + 1).into());
            args.push((*name).into());
        }
        args.push("--sign".into());
        args.push(self.sign.clone().into());
        args.push("--smooth".into());
        args.push(self.smooth.to_string().into());
        args.push("--output_dir".into());
        args.push(output_dir.as_os_str().to_owned());
        args
    }

    /// Build the full command: program, base args, then contract args.
    pub fn command(&self, input_dir: &Path, output_dir: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.base_args)
            .args(self.arguments(input_dir, output_dir));
        cmd
    }

    /// Subprocess options (working directory, timeout) for a tool run.
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            working_directory: Some(self.working_dir.clone()),
            timeout: self.timeout,
        }
    }

    /// File name the tool writes its result under.
    pub fn result_file_name(&self) -> String {
        result_file_name(&RESIZED_FILE_NAMES, &self.sign)
    }

    /// Full path of the result for a job-scoped output directory.
    pub fn result_path(&self, job_output_dir: &Path) -> PathBuf {
        job_output_dir.join(self.result_file_name())
    }
}

/// `<stem1>_<stem2>_<stem3>_<sign>.png`
pub fn result_file_name(images: &[&str], sign: &str) -> String {
    let mut parts: Vec<&str> = images
        .iter()
        .map(|name| {
            Path::new(name)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or(*name)
        })
        .collect();
    parts.push(sign);
    format!("{}.png", parts.join("_"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
