// crates/db/src/store.rs
// JobStore implementation: single-statement updates on the jobs table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::Row;

use jobwatch_core::{CounterDelta, JobRecord, JobStatus, JobStore, StoreError};

use crate::SqliteStore;

#[derive(Debug)]
struct JobRow {
    id: String,
    status: String,
    ended: i64,
    canceling: i64,
    good: i64,
    bad: i64,
    processed: i64,
    total: Option<i64>,
    created_at: String,
    results: Option<String>,
}

impl<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow> for JobRow {
    fn from_row(row: &'r sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            status: row.try_get("status")?,
            ended: row.try_get("ended")?,
            canceling: row.try_get("canceling")?,
            good: row.try_get("good")?,
            bad: row.try_get("bad")?,
            processed: row.try_get("processed")?,
            total: row.try_get("total")?,
            created_at: row.try_get("created_at")?,
            results: row.try_get("results")?,
        })
    }
}

impl JobRow {
    fn into_record(self) -> Result<JobRecord, StoreError> {
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(StoreError::backend)?
            .with_timezone(&Utc);
        let results = match self.results {
            Some(raw) => Some(serde_json::from_str(&raw).map_err(StoreError::backend)?),
            None => None,
        };
        Ok(JobRecord {
            id: self.id,
            status: JobStatus::from_db_str(&self.status),
            ended: self.ended != 0,
            canceling: self.canceling != 0,
            good: self.good as u64,
            bad: self.bad as u64,
            processed: self.processed as u64,
            total: self.total.map(|t| t as u64),
            created_at,
            results,
        })
    }
}

fn encode_results(results: Option<&Value>) -> Result<Option<String>, StoreError> {
    results
        .map(serde_json::to_string)
        .transpose()
        .map_err(StoreError::backend)
}

#[async_trait]
impl JobStore for SqliteStore {
    async fn insert(&self, record: &JobRecord) -> Result<(), StoreError> {
        let results = encode_results(record.results.as_ref())?;
        let outcome = sqlx::query(
            r#"
            INSERT INTO jobs (id, status, ended, canceling, good, bad, processed, total, created_at, results)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&record.id)
        .bind(record.status.as_db_str())
        .bind(record.ended as i64)
        .bind(record.canceling as i64)
        .bind(record.good as i64)
        .bind(record.bad as i64)
        .bind(record.processed as i64)
        .bind(record.total.map(|t| t as i64))
        .bind(record.created_at.to_rfc3339())
        .bind(results)
        .execute(self.pool())
        .await;

        match outcome {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(StoreError::AlreadyExists(record.id.clone()))
            }
            Err(e) => Err(StoreError::backend(e)),
        }
    }

    async fn increment(&self, id: &str, delta: CounterDelta) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE jobs SET
                good = good + ?2,
                bad = bad + ?3,
                processed = processed + ?4
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(delta.good as i64)
        .bind(delta.bad as i64)
        .bind(delta.processed() as i64)
        .execute(self.pool())
        .await
        .map_err(StoreError::backend)?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_total(&self, id: &str, total: u64) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE jobs SET total = ?2 WHERE id = ?1")
            .bind(id)
            .bind(total as i64)
            .execute(self.pool())
            .await
            .map_err(StoreError::backend)?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_canceling(&self, id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE jobs SET canceling = 1 WHERE id = ?1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(StoreError::backend)?;
        Ok(result.rows_affected() > 0)
    }

    async fn finish(
        &self,
        id: &str,
        status: JobStatus,
        results: Option<Value>,
    ) -> Result<bool, StoreError> {
        let results = encode_results(results.as_ref())?;
        // The ended guard makes the first outcome stick; a repeat matches
        // no row and writes nothing
        let result = sqlx::query(
            r#"
            UPDATE jobs SET
                ended = 1,
                status = ?2,
                results = ?3
            WHERE id = ?1 AND ended = 0
            "#,
        )
        .bind(id)
        .bind(status.as_db_str())
        .bind(results)
        .execute(self.pool())
        .await
        .map_err(StoreError::backend)?;
        Ok(result.rows_affected() > 0)
    }

    async fn find(&self, id: &str) -> Result<Option<JobRecord>, StoreError> {
        let row: Option<JobRow> = sqlx::query_as("SELECT * FROM jobs WHERE id = ?1")
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(StoreError::backend)?;
        row.map(JobRow::into_record).transpose()
    }
}
