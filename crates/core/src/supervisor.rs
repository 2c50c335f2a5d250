// crates/core/src/supervisor.rs
//! The supervisor: job lifecycle over a shared store.

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{JobError, JobResult};
use crate::store::{CounterDelta, JobStore};
use crate::types::{JobHandle, JobId, JobOptions, JobRecord, JobStatus, JobView};

/// Supervises background jobs against a shared [`JobStore`].
///
/// Cloning is cheap; all clones share the store. Counter updates are
/// fire and forget so that supervised work never blocks on bookkeeping,
/// while cancellation, status reads and finalization are awaited.
#[derive(Clone)]
pub struct Supervisor {
    store: Arc<dyn JobStore>,
}

impl Supervisor {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    /// The underlying store handle.
    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    /// Create the persistent record for a new job and hand back its
    /// handle.
    ///
    /// The record starts `running` with zeroed counters and a lowered
    /// cancellation flag. If the insert fails there is no job and no
    /// handle.
    pub async fn start(&self, options: JobOptions) -> JobResult<JobHandle> {
        let record = JobRecord::new(uuid::Uuid::new_v4().to_string());
        self.store.insert(&record).await?;
        info!(
            job_id = %record.id,
            label = options.label.as_deref().unwrap_or("job"),
            "job started"
        );
        Ok(JobHandle {
            id: record.id,
            options,
        })
    }

    /// Record `n` successfully processed items.
    ///
    /// Fire and forget: the write happens on a spawned task, and both
    /// persistence failures and no-match outcomes are logged, never
    /// surfaced to the caller.
    pub fn record_success(&self, handle: &JobHandle, n: u64) {
        self.spawn_increment(handle.id.clone(), CounterDelta::good(n));
    }

    /// Record `n` failed items. Fire and forget, like
    /// [`Supervisor::record_success`].
    pub fn record_failure(&self, handle: &JobHandle, n: u64) {
        self.spawn_increment(handle.id.clone(), CounterDelta::bad(n));
    }

    fn spawn_increment(&self, id: JobId, delta: CounterDelta) {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            match store.increment(&id, delta).await {
                Ok(true) => {}
                Ok(false) => warn!(job_id = %id, "progress update matched no job"),
                Err(e) => warn!(job_id = %id, error = %e, "progress update failed"),
            }
        });
    }

    /// Declare how many items the job expects to process.
    ///
    /// Fire and forget. The last write wins, and the value is never
    /// validated against the counters.
    pub fn set_expected_total(&self, handle: &JobHandle, total: u64) {
        let store = Arc::clone(&self.store);
        let id = handle.id.clone();
        tokio::spawn(async move {
            match store.set_total(&id, total).await {
                Ok(true) => {}
                Ok(false) => warn!(job_id = %id, "total update matched no job"),
                Err(e) => warn!(job_id = %id, error = %e, "total update failed"),
            }
        });
    }

    /// Raise the advisory cancellation flag on a job.
    ///
    /// Idempotent, and valid on ended jobs: the flag records intent, it
    /// never rewrites the outcome. `NotFound` when the id matches no job.
    pub async fn request_cancel(&self, id: &str) -> JobResult<()> {
        if self.store.set_canceling(id).await? {
            info!(job_id = %id, "cancellation requested");
            Ok(())
        } else {
            Err(JobError::NotFound(id.to_string()))
        }
    }

    /// Fetch the current state of a job, with derived completion
    /// percentage. `NotFound` when the id matches no job.
    pub async fn get_status(&self, id: &str) -> JobResult<JobView> {
        let record = self
            .store
            .find(id)
            .await?
            .ok_or_else(|| JobError::NotFound(id.to_string()))?;
        Ok(JobView::from_record(record))
    }

    /// Finalize a job: set `ended`, the outcome status and the results
    /// payload. Counters and the cancellation flag are not part of this
    /// write, so a cancel racing finalization cannot clobber it.
    ///
    /// Exactly one `end` takes effect per job; a repeat is a logged
    /// no-op. A store failure here is logged as an error and swallowed:
    /// the record may be left `running`, and the caller has nothing
    /// useful to do about it.
    pub async fn end(&self, handle: &JobHandle, succeeded: bool, results: Option<serde_json::Value>) {
        let status = if succeeded {
            JobStatus::Completed
        } else {
            JobStatus::Failed
        };
        match self.store.finish(&handle.id, status, results).await {
            Ok(true) => {
                info!(job_id = %handle.id, status = status.as_db_str(), "job ended")
            }
            Ok(false) => {
                warn!(job_id = %handle.id, "end skipped: job missing or already ended")
            }
            Err(e) => {
                tracing::error!(job_id = %handle.id, error = %e, "failed to finalize job")
            }
        }
    }
}
