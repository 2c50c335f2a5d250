// crates/core/src/batch.rs
//! Batch runner: drive a list of item identifiers through a
//! caller-supplied change function under supervision.

use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures_util::stream::{self, StreamExt};
use futures_util::FutureExt;
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::JobResult;
use crate::supervisor::Supervisor;
use crate::types::{JobHandle, JobOptions};

impl Supervisor {
    /// Run a batch job over `ids`.
    ///
    /// Starts the job, declares `ids.len()` as the expected total and
    /// returns the handle immediately; the items are processed on a
    /// spawned task. Each item that resolves is counted as one success
    /// and its value stored in a results map keyed by the identifier;
    /// an item that fails or panics is counted as one failure and the
    /// batch moves on. When the whole list has been attempted the job
    /// ends `completed` carrying the results map. Only a defect in the
    /// runner itself ends the job `failed`, without results.
    ///
    /// Items are processed sequentially in input order unless
    /// `options.concurrency` is greater than one, in which case up to
    /// that many items run at once and completion order is unspecified.
    pub async fn run_batch<F, Fut>(
        &self,
        ids: Vec<String>,
        change: F,
        options: JobOptions,
    ) -> JobResult<JobHandle>
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        let handle = self.start(options).await?;
        self.set_expected_total(&handle, ids.len() as u64);

        let sup = self.clone();
        let task_handle = handle.clone();
        tokio::spawn(async move {
            let outcome = AssertUnwindSafe(sup.process_batch(&task_handle, ids, change))
                .catch_unwind()
                .await;
            match outcome {
                Ok(results) => sup.end(&task_handle, true, Some(results)).await,
                Err(_) => {
                    tracing::error!(job_id = %task_handle.id, "batch runner panicked");
                    sup.end(&task_handle, false, None).await;
                }
            }
        });

        Ok(handle)
    }

    async fn process_batch<F, Fut>(&self, handle: &JobHandle, ids: Vec<String>, change: F) -> Value
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        let concurrency = handle.options.concurrency.max(1);
        let mut results = Map::new();

        let mut outcomes = stream::iter(ids.into_iter().map(|item_id| {
            let sup = self.clone();
            let handle = handle.clone();
            let change = &change;
            async move {
                // change() is invoked inside the guard; a panic while
                // it builds the item future counts as one failed item.
                let outcome = AssertUnwindSafe(async { change(item_id.clone()).await })
                    .catch_unwind()
                    .await;
                match outcome {
                    Ok(Ok(value)) => {
                        sup.record_success(&handle, 1);
                        Some((item_id, value))
                    }
                    Ok(Err(e)) => {
                        sup.record_failure(&handle, 1);
                        warn!(job_id = %handle.id, item = %item_id, error = %e, "batch item failed");
                        None
                    }
                    Err(_) => {
                        sup.record_failure(&handle, 1);
                        warn!(job_id = %handle.id, item = %item_id, "batch item panicked");
                        None
                    }
                }
            }
        }))
        .buffer_unordered(concurrency);

        while let Some(outcome) = outcomes.next().await {
            if let Some((item_id, value)) = outcome {
                results.insert(item_id, value);
            }
        }

        Value::Object(results)
    }
}
