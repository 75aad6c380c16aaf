//! One-shot result slots shared between a job and its submitter.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::{Condvar, Mutex};

use crate::error::JobFailure;

/// Outcome of a single job.
pub type JobOutcome = Result<Bytes, JobFailure>;

struct Slot {
    outcome: Mutex<Option<JobOutcome>>,
    resolved: Condvar,
}

/// Handle to the eventual result of a submitted job.
///
/// Returned by [`WorkerPool::submit`](super::WorkerPool::submit). The job's
/// outcome is stored exactly once; [`wait`](JobHandle::wait) consumes it.
pub struct JobHandle {
    slot: Arc<Slot>,
}

/// Write side of a [`JobHandle`], owned by the queued job.
pub(crate) struct Resolver {
    slot: Arc<Slot>,
    done: bool,
}

/// Creates a linked resolver/handle pair.
pub(crate) fn slot() -> (Resolver, JobHandle) {
    let slot = Arc::new(Slot {
        outcome: Mutex::new(None),
        resolved: Condvar::new(),
    });
    (
        Resolver {
            slot: Arc::clone(&slot),
            done: false,
        },
        JobHandle { slot },
    )
}

impl Resolver {
    /// Stores the outcome and wakes the waiting handle.
    pub(crate) fn resolve(mut self, outcome: JobOutcome) {
        self.store(outcome);
    }

    fn store(&mut self, outcome: JobOutcome) {
        self.done = true;
        *self.slot.outcome.lock() = Some(outcome);
        self.slot.resolved.notify_all();
    }
}

impl Drop for Resolver {
    fn drop(&mut self) {
        if !self.done {
            self.store(Err(JobFailure::Panic("job dropped before running".into())));
        }
    }
}

impl JobHandle {
    /// Blocks until the job has run and returns its outcome.
    pub fn wait(self) -> JobOutcome {
        let mut guard = self.slot.outcome.lock();
        loop {
            if let Some(outcome) = guard.take() {
                return outcome;
            }
            self.slot.resolved.wait(&mut guard);
        }
    }

    /// Returns true once the job has produced an outcome.
    pub fn is_resolved(&self) -> bool {
        self.slot.outcome.lock().is_some()
    }
}

impl fmt::Debug for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobHandle")
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_resolve_then_wait() {
        let (resolver, handle) = slot();
        assert!(!handle.is_resolved());
        resolver.resolve(Ok(Bytes::from_static(b"done")));
        assert!(handle.is_resolved());
        assert_eq!(handle.wait().unwrap(), Bytes::from_static(b"done"));
    }

    #[test]
    fn test_wait_blocks_until_resolved() {
        let (resolver, handle) = slot();
        let waiter = thread::spawn(move || handle.wait());

        thread::sleep(Duration::from_millis(20));
        assert!(!waiter.is_finished());

        resolver.resolve(Err(JobFailure::Panic("bad block".into())));
        let outcome = waiter.join().unwrap();
        assert!(matches!(outcome, Err(JobFailure::Panic(msg)) if msg == "bad block"));
    }

    #[test]
    fn test_dropped_resolver_fails_handle() {
        let (resolver, handle) = slot();
        drop(resolver);
        assert!(matches!(handle.wait(), Err(JobFailure::Panic(_))));
    }
}
