use std::collections::HashMap;
use std::time::Duration;

use barbershop_core::job::{JobRecord, JobStatus};
use barbershop_core::types::JobId;
use tokio::sync::RwLock;

/// In-memory table of job state records, keyed by job id.
///
/// Thread-safe via interior `RwLock`; designed to be wrapped in `Arc` and
/// shared between the HTTP handlers and the dispatcher. Finished records are
/// dropped by [`JobRegistry::evict_finished`]; the dispatcher sweeps on a
/// timer.
pub struct JobRegistry {
    jobs: RwLock<HashMap<JobId, JobRecord>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
        }
    }

    /// Insert (or replace) a record.
    pub async fn insert(&self, record: JobRecord) {
        self.jobs.write().await.insert(record.id, record);
    }

    /// Remove a record, returning it if present.
    pub async fn remove(&self, id: JobId) -> Option<JobRecord> {
        self.jobs.write().await.remove(&id)
    }

    /// Snapshot of a single record.
    pub async fn get(&self, id: JobId) -> Option<JobRecord> {
        self.jobs.read().await.get(&id).cloned()
    }

    /// Apply `f` to the record for `id`. Returns `false` if the id is unknown.
    pub async fn update<F>(&self, id: JobId, f: F) -> bool
    where
        F: FnOnce(&mut JobRecord),
    {
        match self.jobs.write().await.get_mut(&id) {
            Some(record) => {
                f(record);
                true
            }
            None => false,
        }
    }

    /// Number of records currently in `status`.
    pub async fn count_by_status(&self, status: JobStatus) -> usize {
        self.jobs
            .read()
            .await
            .values()
            .filter(|r| r.status == status)
            .count()
    }

    /// Total number of records.
    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    /// Remove succeeded and failed records that finished at least `max_age`
    /// ago. Returns how many were removed.
    pub async fn evict_finished(&self, max_age: Duration) -> usize {
        let Ok(max_age) = chrono::TimeDelta::from_std(max_age) else {
            return 0;
        };
        let cutoff = chrono::Utc::now() - max_age;

        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, r| {
            !(r.status.is_terminal() && r.finished_at.is_some_and(|t| t <= cutoff))
        });
        before - jobs.len()
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
