use std::sync::Arc;

use barbershop_core::synthesis::SynthesisTool;
use barbershop_pipeline::{JobRegistry, JobSubmitter};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Job state records, shared with the dispatcher.
    pub registry: Arc<JobRegistry>,
    /// Handle for enqueueing jobs on the dispatcher.
    pub submitter: JobSubmitter,
    /// Tool settings, used to derive result file names.
    pub tool: Arc<SynthesisTool>,
}

impl AppState {
    pub fn new(config: Arc<ServerConfig>, registry: Arc<JobRegistry>, submitter: JobSubmitter) -> Self {
        let tool = Arc::new(config.synthesis_tool());
        Self {
            config,
            registry,
            submitter,
            tool,
        }
    }
}
