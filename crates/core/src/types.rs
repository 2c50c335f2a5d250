// crates/core/src/types.rs
//! Types shared across the job supervision engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a supervised job. Opaque to the engine.
pub type JobId = String;

/// Lifecycle status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn from_db_str(s: &str) -> Self {
        match s {
            "completed" => JobStatus::Completed,
            "failed" => JobStatus::Failed,
            _ => JobStatus::Running,
        }
    }
}

/// Persistent state of a supervised job.
///
/// Counters are live: `good`, `bad` and `processed` move while the job
/// runs, with `processed == good + bad` at every point. `results` is
/// written exactly once, by the terminal update that also sets `ended`
/// and the final status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub id: JobId,
    pub status: JobStatus,
    pub ended: bool,
    /// Advisory cancellation flag. The engine records intent here and
    /// nothing more; supervised work checks it at its own checkpoints.
    pub canceling: bool,
    pub good: u64,
    pub bad: u64,
    pub processed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<serde_json::Value>,
}

impl JobRecord {
    /// Fresh record for a job that just started.
    pub fn new(id: JobId) -> Self {
        Self {
            id,
            status: JobStatus::Running,
            ended: false,
            canceling: false,
            good: 0,
            bad: 0,
            processed: 0,
            total: None,
            created_at: Utc::now(),
            results: None,
        }
    }
}

/// Point-in-time view of a job returned to pollers: the stored record
/// plus `percentage`, which is derived on read and never persisted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobView {
    #[serde(flatten)]
    pub record: JobRecord,
    pub percentage: f64,
}

impl JobView {
    /// Build a view from a stored record.
    ///
    /// An absent or zero `total` yields 0 rather than dividing by zero;
    /// otherwise the ratio is rounded to two decimal places.
    pub fn from_record(record: JobRecord) -> Self {
        let percentage = match record.total {
            Some(total) if total > 0 => {
                round2(record.processed as f64 / total as f64 * 100.0)
            }
            _ => 0.0,
        };
        Self { record, percentage }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Options accepted when starting a job.
#[derive(Debug, Clone)]
pub struct JobOptions {
    /// Human-readable label used in logs.
    pub label: Option<String>,
    /// Maximum number of batch items processed at once. 1 keeps strict
    /// input order.
    pub concurrency: usize,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            label: None,
            concurrency: 1,
        }
    }
}

impl JobOptions {
    pub fn labeled(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::default()
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }
}

/// Handle to a started job. Cloneable; any clone may report progress or
/// end the job.
#[derive(Debug, Clone)]
pub struct JobHandle {
    pub id: JobId,
    pub options: JobOptions,
}
