// crates/core/src/memory.rs
//! In-memory job store for tests and single-process deployments.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreError;
use crate::store::{CounterDelta, JobStore};
use crate::types::{JobId, JobRecord, JobStatus};

/// [`JobStore`] backed by a `RwLock<HashMap>`.
///
/// Every mutation holds the write lock for the whole update, which makes
/// each store method atomic with respect to every other.
#[derive(Debug, Default)]
pub struct MemoryStore {
    jobs: RwLock<HashMap<JobId, JobRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_record<T>(
        &self,
        id: &str,
        f: impl FnOnce(&mut JobRecord) -> T,
    ) -> Result<Option<T>, StoreError> {
        let mut jobs = self
            .jobs
            .write()
            .map_err(|_| StoreError::backend("jobs map lock poisoned"))?;
        Ok(jobs.get_mut(id).map(f))
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn insert(&self, record: &JobRecord) -> Result<(), StoreError> {
        let mut jobs = self
            .jobs
            .write()
            .map_err(|_| StoreError::backend("jobs map lock poisoned"))?;
        if jobs.contains_key(&record.id) {
            return Err(StoreError::AlreadyExists(record.id.clone()));
        }
        jobs.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn increment(&self, id: &str, delta: CounterDelta) -> Result<bool, StoreError> {
        let matched = self.with_record(id, |record| {
            record.good += delta.good;
            record.bad += delta.bad;
            record.processed += delta.processed();
        })?;
        Ok(matched.is_some())
    }

    async fn set_total(&self, id: &str, total: u64) -> Result<bool, StoreError> {
        let matched = self.with_record(id, |record| record.total = Some(total))?;
        Ok(matched.is_some())
    }

    async fn set_canceling(&self, id: &str) -> Result<bool, StoreError> {
        let matched = self.with_record(id, |record| record.canceling = true)?;
        Ok(matched.is_some())
    }

    async fn finish(
        &self,
        id: &str,
        status: JobStatus,
        results: Option<Value>,
    ) -> Result<bool, StoreError> {
        let finished = self.with_record(id, |record| {
            if record.ended {
                return false;
            }
            record.ended = true;
            record.status = status;
            record.results = results;
            true
        })?;
        Ok(finished.unwrap_or(false))
    }

    async fn find(&self, id: &str) -> Result<Option<JobRecord>, StoreError> {
        let jobs = self
            .jobs
            .read()
            .map_err(|_| StoreError::backend("jobs map lock poisoned"))?;
        Ok(jobs.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str) -> JobRecord {
        JobRecord::new(id.to_string())
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let store = MemoryStore::new();
        store.insert(&record("j1")).await.unwrap();

        let found = store.find("j1").await.unwrap().expect("record exists");
        assert_eq!(found.id, "j1");
        assert_eq!(found.status, JobStatus::Running);

        assert!(store.find("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_an_error() {
        let store = MemoryStore::new();
        store.insert(&record("j1")).await.unwrap();

        let err = store.insert(&record("j1")).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(id) if id == "j1"));
    }

    #[tokio::test]
    async fn test_increment_moves_processed_with_counters() {
        let store = MemoryStore::new();
        store.insert(&record("j1")).await.unwrap();

        assert!(store.increment("j1", CounterDelta::good(2)).await.unwrap());
        assert!(store.increment("j1", CounterDelta::bad(1)).await.unwrap());

        let found = store.find("j1").await.unwrap().unwrap();
        assert_eq!(found.good, 2);
        assert_eq!(found.bad, 1);
        assert_eq!(found.processed, 3);
    }

    #[tokio::test]
    async fn test_update_on_missing_record_reports_no_match() {
        let store = MemoryStore::new();
        assert!(!store.increment("nope", CounterDelta::good(1)).await.unwrap());
        assert!(!store.set_total("nope", 10).await.unwrap());
        assert!(!store.set_canceling("nope").await.unwrap());
        assert!(!store
            .finish("nope", JobStatus::Completed, None)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_finish_takes_effect_once() {
        let store = MemoryStore::new();
        store.insert(&record("j1")).await.unwrap();

        assert!(store
            .finish("j1", JobStatus::Completed, Some(json!({"ok": true})))
            .await
            .unwrap());
        // Second finish is a no-op; the first outcome survives
        assert!(!store.finish("j1", JobStatus::Failed, None).await.unwrap());

        let found = store.find("j1").await.unwrap().unwrap();
        assert!(found.ended);
        assert_eq!(found.status, JobStatus::Completed);
        assert_eq!(found.results, Some(json!({"ok": true})));
    }

    #[tokio::test]
    async fn test_canceling_works_on_ended_jobs() {
        let store = MemoryStore::new();
        store.insert(&record("j1")).await.unwrap();
        store
            .finish("j1", JobStatus::Completed, None)
            .await
            .unwrap();

        assert!(store.set_canceling("j1").await.unwrap());

        let found = store.find("j1").await.unwrap().unwrap();
        assert!(found.canceling);
        assert!(found.ended);
        assert_eq!(found.status, JobStatus::Completed);
    }
}
