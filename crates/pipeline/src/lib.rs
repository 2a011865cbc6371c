//! Job execution pipeline.
//!
//! [`runner::JobRunner`] performs one job (write uploads, resize, invoke the
//! synthesis tool). [`dispatcher::JobDispatcher`] feeds queued jobs to a
//! bounded number of concurrent runner slots and keeps
//! [`registry::JobRegistry`] records current.

pub mod dispatcher;
pub mod registry;
pub mod runner;

pub use dispatcher::{DispatcherConfig, JobDispatcher, JobSubmitter, SubmitError};
pub use registry::JobRegistry;
pub use runner::{JobOutcome, JobRunner, JobSpec, RunError};
