// crates/core/src/error.rs
use thiserror::Error;

use crate::types::JobId;

/// Error raised by a [`crate::JobStore`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A record with the same id already exists.
    #[error("job already exists: {0}")]
    AlreadyExists(JobId),

    /// The backing store failed.
    #[error("store backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl StoreError {
    /// Wrap any backend failure. Accepts concrete errors as well as
    /// plain strings.
    pub fn backend(err: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>) -> Self {
        StoreError::Backend(err.into())
    }
}

/// Error surfaced by the supervisor to its callers.
#[derive(Debug, Error)]
pub enum JobError {
    /// No job with the given id.
    #[error("job not found: {0}")]
    NotFound(JobId),

    /// The job store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result alias used across the engine.
pub type JobResult<T> = Result<T, JobError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_wraps_strings_and_errors() {
        let err = StoreError::backend("lock poisoned");
        assert_eq!(err.to_string(), "store backend error: lock poisoned");

        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err = StoreError::backend(io);
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_not_found_display() {
        let err = JobError::NotFound("abc123".to_string());
        assert_eq!(err.to_string(), "job not found: abc123");
    }

    #[test]
    fn test_store_error_converts_transparently() {
        let err: JobError = StoreError::AlreadyExists("j1".to_string()).into();
        assert_eq!(err.to_string(), "job already exists: j1");
        assert!(matches!(err, JobError::Store(_)));
    }
}
