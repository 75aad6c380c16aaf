//! Worker pool for block processing.
//!
//! - [`WorkerPool`] - Persistent threads consuming a bounded job queue
//! - [`JobHandle`] - The eventual result of one submitted job

mod handle;
mod workers;

pub use handle::{JobHandle, JobOutcome};
pub use workers::WorkerPool;
