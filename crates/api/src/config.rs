use std::path::PathBuf;
use std::time::Duration;

use barbershop_core::synthesis::{SynthesisTool, DEFAULT_SIGN, DEFAULT_SMOOTH};
use barbershop_pipeline::DispatcherConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    /// A single `*` allows any origin.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Time given to in-flight jobs after the server stops (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Maximum accepted request body size in bytes (default: 64 MiB).
    pub max_upload_bytes: usize,
    /// Root under which all caller-supplied directories are resolved.
    /// Always absolute.
    pub data_root: PathBuf,
    /// Number of synthesis jobs allowed to run at once (default: `2`).
    pub max_concurrent_jobs: usize,
    /// Number of jobs allowed to wait for a slot (default: `64`).
    pub queue_capacity: usize,
    /// Seconds a finished job stays visible in the registry, `0` keeps it
    /// forever (default: `3600`).
    pub job_retention_secs: u64,
    /// Synthesis tool executable (default: `python`).
    pub synth_program: String,
    /// Arguments placed before the tool's contract arguments, whitespace
    /// separated in `SYNTH_ARGS` (default: `main.py`).
    pub synth_args: Vec<String>,
    /// Working directory of the tool process (default: `.`).
    pub synth_workdir: PathBuf,
    /// Tool timeout in seconds, `0` disables it (default: `1800`).
    pub synth_timeout_secs: u64,
    /// Style token passed as `--sign` (default: `realistic`).
    pub synth_sign: String,
    /// Smoothness passed as `--smooth` (default: `5`).
    pub synth_smooth: u32,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default      |
    /// |-------------------------|--------------|
    /// | `HOST`                  | `0.0.0.0`    |
    /// | `PORT`                  | `8000`       |
    /// | `CORS_ORIGINS`          | `*`          |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`         |
    /// | `SHUTDOWN_TIMEOUT_SECS` | `30`         |
    /// | `MAX_UPLOAD_BYTES`      | `67108864`   |
    /// | `DATA_ROOT`             | `./data`     |
    /// | `MAX_CONCURRENT_JOBS`   | `2`          |
    /// | `QUEUE_CAPACITY`        | `64`         |
    /// | `JOB_RETENTION_SECS`    | `3600`       |
    /// | `SYNTH_PROGRAM`         | `python`     |
    /// | `SYNTH_ARGS`            | `main.py`    |
    /// | `SYNTH_WORKDIR`         | `.`          |
    /// | `SYNTH_TIMEOUT_SECS`    | `1800`       |
    /// | `SYNTH_SIGN`            | `realistic`  |
    /// | `SYNTH_SMOOTH`          | `5`          |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "8000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let max_upload_bytes: usize = std::env::var("MAX_UPLOAD_BYTES")
            .unwrap_or_else(|_| "67108864".into())
            .parse()
            .expect("MAX_UPLOAD_BYTES must be a valid usize");

        let data_root = absolute(PathBuf::from(
            std::env::var("DATA_ROOT").unwrap_or_else(|_| "./data".into()),
        ));

        let max_concurrent_jobs: usize = std::env::var("MAX_CONCURRENT_JOBS")
            .unwrap_or_else(|_| "2".into())
            .parse()
            .expect("MAX_CONCURRENT_JOBS must be a valid usize");

        let queue_capacity: usize = std::env::var("QUEUE_CAPACITY")
            .unwrap_or_else(|_| "64".into())
            .parse()
            .expect("QUEUE_CAPACITY must be a valid usize");

        let job_retention_secs: u64 = std::env::var("JOB_RETENTION_SECS")
            .unwrap_or_else(|_| "3600".into())
            .parse()
            .expect("JOB_RETENTION_SECS must be a valid u64");

        let synth_program = std::env::var("SYNTH_PROGRAM").unwrap_or_else(|_| "python".into());

        let synth_args: Vec<String> = std::env::var("SYNTH_ARGS")
            .unwrap_or_else(|_| "main.py".into())
            .split_whitespace()
            .map(str::to_string)
            .collect();

        let synth_workdir =
            PathBuf::from(std::env::var("SYNTH_WORKDIR").unwrap_or_else(|_| ".".into()));

        let synth_timeout_secs: u64 = std::env::var("SYNTH_TIMEOUT_SECS")
            .unwrap_or_else(|_| "1800".into())
            .parse()
            .expect("SYNTH_TIMEOUT_SECS must be a valid u64");

        let synth_sign = std::env::var("SYNTH_SIGN").unwrap_or_else(|_| DEFAULT_SIGN.into());

        let synth_smooth: u32 = std::env::var("SYNTH_SMOOTH")
            .unwrap_or_else(|_| DEFAULT_SMOOTH.to_string())
            .parse()
            .expect("SYNTH_SMOOTH must be a valid u32");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            max_upload_bytes,
            data_root,
            max_concurrent_jobs,
            queue_capacity,
            job_retention_secs,
            synth_program,
            synth_args,
            synth_workdir,
            synth_timeout_secs,
            synth_sign,
            synth_smooth,
        }
    }

    /// Invocation settings for the external synthesis tool.
    pub fn synthesis_tool(&self) -> SynthesisTool {
        SynthesisTool {
            program: self.synth_program.clone(),
            base_args: self.synth_args.clone(),
            working_dir: self.synth_workdir.clone(),
            sign: self.synth_sign.clone(),
            smooth: self.synth_smooth,
            timeout: (self.synth_timeout_secs > 0)
                .then(|| Duration::from_secs(self.synth_timeout_secs)),
        }
    }

    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            max_concurrent_jobs: self.max_concurrent_jobs,
            queue_capacity: self.queue_capacity,
            finished_retention: (self.job_retention_secs > 0)
                .then(|| Duration::from_secs(self.job_retention_secs)),
        }
    }

    /// Whether `CORS_ORIGINS` allows every origin.
    pub fn cors_allows_any(&self) -> bool {
        self.cors_origins.iter().any(|o| o == "*")
    }
}

/// Log output format, selected by `LOG_FORMAT` (`text` or `json`).
///
/// Read separately from [`ServerConfig`] because tracing is initialized
/// before the rest of the configuration is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    pub fn from_env() -> Self {
        match std::env::var("LOG_FORMAT") {
            Ok(v) if v.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Text,
        }
    }
}

fn absolute(path: PathBuf) -> PathBuf {
    std::path::absolute(&path).unwrap_or(path)
}
