// crates/core/src/lib.rs
//! Job supervision engine: run caller-supplied work outside the
//! request/response cycle, keep live progress counters in a store, and
//! support polling plus cooperative cancellation.
//!
//! [`Supervisor`] owns the lifecycle. [`Supervisor::run_batch`] drives a
//! list of item identifiers through a caller-supplied change function,
//! counting each item as it lands; [`Supervisor::run_unit`] supervises a
//! single unit of work that reports its own progress through
//! [`Reporting`]. Progress lives behind the [`JobStore`] trait:
//! [`MemoryStore`] keeps it in process, the companion db crate makes it
//! durable over SQLite.

mod batch;
mod error;
mod memory;
mod store;
mod supervisor;
mod types;
mod unit;

pub use error::{JobError, JobResult, StoreError};
pub use memory::MemoryStore;
pub use store::{CounterDelta, JobStore};
pub use supervisor::Supervisor;
pub use types::{JobHandle, JobId, JobOptions, JobRecord, JobStatus, JobView};
pub use unit::Reporting;
