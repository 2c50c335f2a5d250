// crates/core/src/store.rs
//! Persistence boundary for job records.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreError;
use crate::types::{JobRecord, JobStatus};

/// Additive counter update applied to a job record.
///
/// `processed` is not part of the delta: implementations bump it by
/// `good + bad` inside the same write, which keeps the
/// `processed == good + bad` invariant true no matter how concurrent
/// updates interleave.
#[derive(Debug, Clone, Copy, Default)]
pub struct CounterDelta {
    pub good: u64,
    pub bad: u64,
}

impl CounterDelta {
    /// Delta counting `n` successful items.
    pub fn good(n: u64) -> Self {
        Self { good: n, bad: 0 }
    }

    /// Delta counting `n` failed items.
    pub fn bad(n: u64) -> Self {
        Self { good: 0, bad: n }
    }

    /// Number of items this delta accounts for.
    pub fn processed(&self) -> u64 {
        self.good + self.bad
    }
}

/// Storage backend for job records.
///
/// Each method must be a single atomic update on the addressed record;
/// the engine layers no lock on top. Methods that address a record by id
/// return `Ok(false)` when nothing matched rather than an error, leaving
/// the caller to decide whether the miss matters.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a freshly started record. Id collisions are an error.
    async fn insert(&self, record: &JobRecord) -> Result<(), StoreError>;

    /// Apply a counter delta. `processed` moves by `delta.processed()`
    /// in the same write.
    async fn increment(&self, id: &str, delta: CounterDelta) -> Result<bool, StoreError>;

    /// Set the expected item total. Last write wins; the value is never
    /// validated against the counters.
    async fn set_total(&self, id: &str, total: u64) -> Result<bool, StoreError>;

    /// Raise the advisory cancellation flag. Valid on ended jobs.
    async fn set_canceling(&self, id: &str) -> Result<bool, StoreError>;

    /// Terminal write: set `ended`, the final status and the results
    /// payload, touching nothing else. Returns `false` without writing
    /// when the record is already ended or missing, so the first outcome
    /// always wins.
    async fn finish(
        &self,
        id: &str,
        status: JobStatus,
        results: Option<Value>,
    ) -> Result<bool, StoreError>;

    /// Fetch a record by id.
    async fn find(&self, id: &str) -> Result<Option<JobRecord>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_constructors() {
        let delta = CounterDelta::good(3);
        assert_eq!(delta.good, 3);
        assert_eq!(delta.bad, 0);
        assert_eq!(delta.processed(), 3);

        let delta = CounterDelta::bad(2);
        assert_eq!(delta.good, 0);
        assert_eq!(delta.bad, 2);
        assert_eq!(delta.processed(), 2);

        assert_eq!(CounterDelta::default().processed(), 0);
    }
}
