//! Bounded background job dispatcher.
//!
//! Submitted jobs are registered as `pending` and pushed onto a bounded
//! queue. A single long-lived dispatcher task pulls them off and gives each
//! its own task. That task first takes the lock for its input directory,
//! since jobs sharing one write the same `file{n}.png` / `resized_{n}.png`
//! names, and only then one of `max_concurrent_jobs` semaphore permits. A
//! job waiting on another job's directory therefore never holds a slot.
//!
//! A job counts as queued from submission until it gets its permit. Once
//! `queue_capacity` jobs are queued, new submissions are rejected.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use barbershop_core::job::JobRecord;
use tokio::sync::{mpsc, Mutex, Semaphore};
use tokio::task::JoinSet;
use tokio::time::{Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::registry::JobRegistry;
use crate::runner::{JobRunner, JobSpec};

/// Default number of jobs allowed to run at once.
pub const DEFAULT_MAX_CONCURRENT_JOBS: usize = 2;

/// Default number of jobs allowed to wait in the queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Default time a finished job stays in the registry.
pub const DEFAULT_FINISHED_RETENTION: Duration = Duration::from_secs(3600);

/// Upper bound on the time between registry sweeps.
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Reason recorded for jobs still queued when the dispatcher stops.
pub const SHUTDOWN_REASON: &str = "Service shut down before the job started";

#[derive(Debug, Clone, Copy)]
pub struct DispatcherConfig {
    pub max_concurrent_jobs: usize,
    pub queue_capacity: usize,
    /// How long succeeded and failed records are kept. `None` keeps them
    /// for the lifetime of the process.
    pub finished_retention: Option<Duration>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: DEFAULT_MAX_CONCURRENT_JOBS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            finished_retention: Some(DEFAULT_FINISHED_RETENTION),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("job queue is full ({capacity} jobs waiting)")]
    QueueFull { capacity: usize },

    #[error("job dispatcher is not running")]
    Closed,
}

/// Cloneable handle used by request handlers to enqueue jobs.
#[derive(Clone)]
pub struct JobSubmitter {
    tx: mpsc::Sender<JobSpec>,
    registry: Arc<JobRegistry>,
    waiting: Arc<AtomicUsize>,
    capacity: usize,
}

impl JobSubmitter {
    /// Register `job` as pending and enqueue it without waiting.
    ///
    /// On failure the registry entry is removed again, so a rejected job
    /// leaves no trace.
    pub async fn submit(&self, job: JobSpec) -> Result<(), SubmitError> {
        let reserved = self
            .waiting
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < self.capacity).then_some(n + 1)
            });
        if reserved.is_err() {
            return Err(SubmitError::QueueFull {
                capacity: self.capacity,
            });
        }

        let id = job.id;
        self.registry
            .insert(JobRecord::new(
                id,
                job.input_dir.clone(),
                job.output_dir.clone(),
            ))
            .await;

        if let Err(err) = self.tx.try_send(job) {
            self.waiting.fetch_sub(1, Ordering::SeqCst);
            self.registry.remove(id).await;
            return Err(match err {
                mpsc::error::TrySendError::Full(_) => SubmitError::QueueFull {
                    capacity: self.capacity,
                },
                mpsc::error::TrySendError::Closed(_) => SubmitError::Closed,
            });
        }

        tracing::info!(job_id = %id, "Job queued");
        Ok(())
    }

    /// Number of accepted jobs that have not started running yet.
    pub fn queued(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }
}

/// Background dispatcher. Create with [`JobDispatcher::new`], then spawn
/// [`JobDispatcher::run`].
pub struct JobDispatcher {
    rx: mpsc::Receiver<JobSpec>,
    workers: Arc<Workers>,
    max_concurrent_jobs: usize,
    finished_retention: Option<Duration>,
}

impl JobDispatcher {
    /// Build a dispatcher and the submitter handle that feeds it.
    pub fn new(
        runner: Arc<JobRunner>,
        registry: Arc<JobRegistry>,
        config: DispatcherConfig,
    ) -> (Self, JobSubmitter) {
        let max_concurrent_jobs = config.max_concurrent_jobs.max(1);
        let capacity = config.queue_capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        let waiting = Arc::new(AtomicUsize::new(0));

        let dispatcher = Self {
            rx,
            workers: Arc::new(Workers {
                runner,
                registry: Arc::clone(&registry),
                slots: Semaphore::new(max_concurrent_jobs),
                input_locks: DirLocks::default(),
                waiting: Arc::clone(&waiting),
            }),
            max_concurrent_jobs,
            finished_retention: config.finished_retention.filter(|d| !d.is_zero()),
        };
        let submitter = JobSubmitter {
            tx,
            registry,
            waiting,
            capacity,
        };

        (dispatcher, submitter)
    }

    /// Run the dispatch loop until `cancel` fires, then wait for running
    /// jobs to finish. Jobs that have not started by then are marked failed.
    pub async fn run(mut self, cancel: CancellationToken) {
        tracing::info!(
            max_concurrent_jobs = self.max_concurrent_jobs,
            finished_retention_secs = self.finished_retention.map(|d| d.as_secs()),
            "Job dispatcher started",
        );

        let mut in_flight = JoinSet::new();
        let mut sweep = self.finished_retention.map(|retention| {
            let mut interval = tokio::time::interval(retention.min(MAX_SWEEP_INTERVAL));
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });

        loop {
            // Reap finished workers so the set does not grow unbounded.
            while in_flight.try_join_next().is_some() {}

            tokio::select! {
                _ = cancel.cancelled() => break,
                job = self.rx.recv() => match job {
                    Some(job) => {
                        let workers = Arc::clone(&self.workers);
                        let cancel = cancel.clone();
                        in_flight.spawn(async move { workers.execute(job, cancel).await });
                    }
                    None => break,
                },
                _ = next_sweep(&mut sweep) => {
                    if let Some(retention) = self.finished_retention {
                        let evicted = self.workers.registry.evict_finished(retention).await;
                        if evicted > 0 {
                            tracing::debug!(evicted, "Evicted finished jobs");
                        }
                    }
                }
            }
        }

        tracing::info!("Job dispatcher shutting down");

        self.rx.close();
        while let Some(job) = self.rx.recv().await {
            self.workers.abandon(&job).await;
        }

        let remaining = in_flight.len();
        if remaining > 0 {
            tracing::info!(remaining, "Waiting for in-flight jobs");
        }
        while in_flight.join_next().await.is_some() {}

        tracing::info!("Job dispatcher stopped");
    }
}

async fn next_sweep(sweep: &mut Option<Interval>) {
    match sweep {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// State shared by every job task.
struct Workers {
    runner: Arc<JobRunner>,
    registry: Arc<JobRegistry>,
    slots: Semaphore,
    input_locks: DirLocks,
    waiting: Arc<AtomicUsize>,
}

impl Workers {
    /// Run one job and record its outcome.
    async fn execute(&self, job: JobSpec, cancel: CancellationToken) {
        let lock = self.input_locks.handle(&job.input_dir).await;
        self.execute_locked(&lock, &job, &cancel).await;
        drop(lock);
        self.input_locks.release(&job.input_dir).await;
    }

    async fn execute_locked(&self, lock: &Mutex<()>, job: &JobSpec, cancel: &CancellationToken) {
        // Directory first, then a slot.
        let acquired = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            acquired = async {
                let guard = lock.lock().await;
                let permit = self.slots.acquire().await.ok()?;
                Some((guard, permit))
            } => acquired,
        };
        let Some((_guard, _permit)) = acquired else {
            self.abandon(job).await;
            return;
        };
        self.waiting.fetch_sub(1, Ordering::SeqCst);

        self.registry.update(job.id, JobRecord::mark_running).await;
        tracing::info!(job_id = %job.id, input_dir = %job.input_dir.display(), "Job started");

        match self.runner.run(job).await {
            Ok(outcome) => {
                tracing::info!(
                    job_id = %job.id,
                    result = %outcome.result_path.display(),
                    duration_ms = outcome.output.duration_ms,
                    "Job succeeded",
                );
                self.registry
                    .update(job.id, |r| {
                        r.mark_succeeded(outcome.result_path, outcome.output.exit_code)
                    })
                    .await;
            }
            Err(err) => {
                let output = err.tool_output();
                let exit_code = output.map(|o| o.exit_code);
                let stderr = output.map(|o| o.stderr.clone());
                tracing::error!(
                    job_id = %job.id,
                    error = %err,
                    exit_code,
                    stderr = stderr.as_deref().unwrap_or(""),
                    "Job failed",
                );
                self.registry
                    .update(job.id, |r| r.mark_failed(err.to_string(), exit_code, stderr))
                    .await;
            }
        }
    }

    /// Fail a job that never started.
    async fn abandon(&self, job: &JobSpec) {
        self.waiting.fetch_sub(1, Ordering::SeqCst);
        self.registry
            .update(job.id, |r| r.mark_failed(SHUTDOWN_REASON.into(), None, None))
            .await;
        tracing::info!(job_id = %job.id, "Job dropped at shutdown");
    }
}

/// Per-directory async locks. Entries are dropped once no job holds them.
#[derive(Default)]
struct DirLocks {
    inner: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl DirLocks {
    async fn handle(&self, dir: &Path) -> Arc<Mutex<()>> {
        let mut map = self.inner.lock().await;
        Arc::clone(map.entry(dir.to_path_buf()).or_default())
    }

    async fn release(&self, dir: &Path) {
        let mut map = self.inner.lock().await;
        if map.get(dir).is_some_and(|l| Arc::strong_count(l) == 1) {
            map.remove(dir);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
