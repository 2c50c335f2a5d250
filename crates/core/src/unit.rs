// crates/core/src/unit.rs
//! Unit runner: supervise a single piece of work that reports its own
//! progress.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};

use futures_util::FutureExt;
use serde_json::Value;
use tracing::warn;

use crate::error::JobResult;
use crate::supervisor::Supervisor;
use crate::types::{JobHandle, JobOptions};

/// Progress surface handed to unit work.
///
/// Counter methods land on the same supervisor bookkeeping the batch
/// runner uses. Results set here are captured locally and written only
/// by the terminal update, and only when the work succeeds.
pub struct Reporting {
    supervisor: Supervisor,
    handle: JobHandle,
    results: Arc<Mutex<Option<Value>>>,
}

impl Reporting {
    /// Count `n` items as successfully processed.
    pub fn good(&self, n: u64) {
        self.supervisor.record_success(&self.handle, n);
    }

    /// Count `n` items as failed.
    pub fn bad(&self, n: u64) {
        self.supervisor.record_failure(&self.handle, n);
    }

    /// Declare the expected item total.
    pub fn set_total(&self, total: u64) {
        self.supervisor.set_expected_total(&self.handle, total);
    }

    /// Stage the results payload written when the job completes.
    /// Discarded if the work later fails.
    pub fn set_results(&self, results: Value) {
        *self
            .results
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(results);
    }

    /// Whether cancellation has been requested.
    ///
    /// Advisory: the engine never acts on the flag, so work that wants
    /// to stop early checks it at its own natural checkpoints. A failed
    /// check reads as not-canceled to keep the work running.
    pub async fn canceling(&self) -> bool {
        match self.supervisor.get_status(&self.handle.id).await {
            Ok(view) => view.record.canceling,
            Err(e) => {
                warn!(job_id = %self.handle.id, error = %e, "cancellation check failed");
                false
            }
        }
    }

    /// Id of the supervised job.
    pub fn job_id(&self) -> &str {
        &self.handle.id
    }
}

impl Supervisor {
    /// Run a single unit of work under supervision.
    ///
    /// Starts the job and returns the handle immediately; the work runs
    /// on a spawned task with a [`Reporting`] surface for counters,
    /// results and the advisory cancellation flag. The job ends
    /// `completed` when the work returns `Ok`, carrying any results the
    /// work staged; it ends `failed` with no results when the work
    /// returns `Err` or panics.
    pub async fn run_unit<F, Fut>(&self, work: F, options: JobOptions) -> JobResult<JobHandle>
    where
        F: FnOnce(Reporting) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let handle = self.start(options).await?;

        let sup = self.clone();
        let task_handle = handle.clone();
        tokio::spawn(async move {
            let results = Arc::new(Mutex::new(None));
            let reporting = Reporting {
                supervisor: sup.clone(),
                handle: task_handle.clone(),
                results: Arc::clone(&results),
            };

            // The closure is invoked inside the guard; a panic thrown
            // before the work future exists still fails the job.
            let outcome = AssertUnwindSafe(async move { work(reporting).await })
                .catch_unwind()
                .await;
            match outcome {
                Ok(Ok(())) => {
                    let results = results
                        .lock()
                        .unwrap_or_else(std::sync::PoisonError::into_inner)
                        .take();
                    sup.end(&task_handle, true, results).await;
                }
                Ok(Err(e)) => {
                    warn!(job_id = %task_handle.id, error = %e, "unit work failed");
                    sup.end(&task_handle, false, None).await;
                }
                Err(_) => {
                    tracing::error!(job_id = %task_handle.id, "unit work panicked");
                    sup.end(&task_handle, false, None).await;
                }
            }
        });

        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::types::{JobStatus, JobView};
    use serde_json::json;
    use std::time::Duration;

    fn supervisor() -> Supervisor {
        Supervisor::new(Arc::new(MemoryStore::new()))
    }

    async fn wait_until(
        sup: &Supervisor,
        id: &str,
        mut pred: impl FnMut(&JobView) -> bool,
    ) -> JobView {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        loop {
            let view = sup.get_status(id).await.expect("job exists");
            if pred(&view) {
                return view;
            }
            if tokio::time::Instant::now() > deadline {
                panic!("timed out waiting for job {id}");
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test]
    async fn test_unit_success_applies_staged_results() {
        let sup = supervisor();

        let handle = sup
            .run_unit(
                |reporting| async move {
                    reporting.set_total(2);
                    reporting.good(2);
                    reporting.set_results(json!({ "report": "done" }));
                    Ok(())
                },
                JobOptions::labeled("rebuild"),
            )
            .await
            .unwrap();

        let view = wait_until(&sup, &handle.id, |v| v.record.ended).await;
        assert_eq!(view.record.status, JobStatus::Completed);
        assert_eq!(view.record.results, Some(json!({ "report": "done" })));
        assert_eq!(view.record.good, 2);
        assert_eq!(view.record.total, Some(2));
        assert_eq!(view.percentage, 100.0);
    }

    #[tokio::test]
    async fn test_unit_failure_keeps_recorded_progress() {
        let sup = supervisor();

        let handle = sup
            .run_unit(
                |reporting| async move {
                    reporting.set_total(10);
                    reporting.good(5);
                    anyhow::bail!("upstream went away");
                },
                JobOptions::default(),
            )
            .await
            .unwrap();

        let view = wait_until(&sup, &handle.id, |v| v.record.ended).await;
        assert_eq!(view.record.status, JobStatus::Failed);
        assert_eq!(view.record.good, 5);
        assert_eq!(view.record.processed, 5);
        assert_eq!(view.record.total, Some(10));
        assert_eq!(view.percentage, 50.0);
    }

    #[tokio::test]
    async fn test_unit_failure_discards_staged_results() {
        let sup = supervisor();

        let handle = sup
            .run_unit(
                |reporting| async move {
                    reporting.set_results(json!({ "partial": true }));
                    anyhow::bail!("gave up after staging results");
                },
                JobOptions::default(),
            )
            .await
            .unwrap();

        let view = wait_until(&sup, &handle.id, |v| v.record.ended).await;
        assert_eq!(view.record.status, JobStatus::Failed);
        assert_eq!(view.record.results, None);
    }

    #[tokio::test]
    async fn test_unit_panic_fails_the_job() {
        let sup = supervisor();

        let handle = sup
            .run_unit(
                |_reporting| async move {
                    if true {
                        panic!("defective work");
                    }
                    Ok(())
                },
                JobOptions::default(),
            )
            .await
            .unwrap();

        let view = wait_until(&sup, &handle.id, |v| v.record.ended).await;
        assert_eq!(view.record.status, JobStatus::Failed);
        assert_eq!(view.record.results, None);
    }

    #[tokio::test]
    async fn test_unit_panic_while_building_the_future_fails_the_job() {
        let sup = supervisor();

        // The panic fires when the closure is called, before there is
        // any future to poll.
        let handle = sup
            .run_unit(
                |_reporting| {
                    if true {
                        panic!("refused to build the work future");
                    }
                    async move { Ok(()) }
                },
                JobOptions::default(),
            )
            .await
            .unwrap();

        let view = wait_until(&sup, &handle.id, |v| v.record.ended).await;
        assert_eq!(view.record.status, JobStatus::Failed);
        assert_eq!(view.record.results, None);
    }

    #[tokio::test]
    async fn test_unit_work_observes_cancellation() {
        let sup = supervisor();

        let handle = sup
            .run_unit(
                |reporting| async move {
                    // Cooperative loop: check the flag between steps
                    while !reporting.canceling().await {
                        tokio::time::sleep(Duration::from_millis(5)).await;
                    }
                    reporting.set_results(json!({ "stopped": "early" }));
                    Ok(())
                },
                JobOptions::default(),
            )
            .await
            .unwrap();

        sup.request_cancel(&handle.id).await.unwrap();

        let view = wait_until(&sup, &handle.id, |v| v.record.ended).await;
        assert!(view.record.canceling);
        // The work chose to stop and return Ok, so the job completed
        assert_eq!(view.record.status, JobStatus::Completed);
        assert_eq!(view.record.results, Some(json!({ "stopped": "early" })));
    }
}
