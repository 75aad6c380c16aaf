//! Fixed-size worker pool with a bounded job queue.

use std::collections::VecDeque;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use bytes::Bytes;
use parking_lot::{Condvar, Mutex};

use super::handle::{self, JobHandle, Resolver};
use crate::error::{BoxError, JobFailure, SigError};

type Task = Box<dyn FnOnce() -> Result<Bytes, BoxError> + Send + 'static>;

struct Job {
    task: Task,
    resolver: Resolver,
}

impl Job {
    /// Runs the task and stores whatever it produced, panics included.
    fn run(self) {
        let Job { task, resolver } = self;
        let outcome = match panic::catch_unwind(AssertUnwindSafe(task)) {
            Ok(Ok(bytes)) => Ok(bytes),
            Ok(Err(e)) => Err(JobFailure::Error(e)),
            Err(payload) => Err(JobFailure::from_panic(payload)),
        };
        resolver.resolve(outcome);
    }
}

struct Queue {
    jobs: VecDeque<Job>,
    closed: bool,
}

struct Shared {
    queue: Mutex<Queue>,
    job_ready: Condvar,
    slot_free: Condvar,
    capacity: usize,
}

/// A pool of persistent worker threads fed from a bounded queue.
///
/// [`submit`](WorkerPool::submit) blocks while `queue_capacity` jobs are
/// waiting, which pushes back on the producer. Jobs run outside any lock;
/// errors and panics are captured in the job's [`JobHandle`] and the worker
/// moves on to the next job.
///
/// # Example
///
/// ```
/// use blocksig::WorkerPool;
/// use bytes::Bytes;
///
/// let pool = WorkerPool::new(2, 4)?;
/// let handle = pool.submit(|| Ok(Bytes::from_static(b"done")))?;
/// assert_eq!(handle.wait().unwrap(), Bytes::from_static(b"done"));
/// pool.shutdown();
/// # Ok::<(), blocksig::SigError>(())
/// ```
pub struct WorkerPool {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    threads: usize,
}

impl WorkerPool {
    /// Spawns `threads` workers sharing a queue of `queue_capacity` jobs.
    pub fn new(threads: usize, queue_capacity: usize) -> Result<Self, SigError> {
        if threads == 0 {
            return Err(SigError::InvalidConfig {
                message: "thread count must be at least 1",
            });
        }
        if queue_capacity == 0 {
            return Err(SigError::InvalidConfig {
                message: "queue capacity must be at least 1",
            });
        }

        let pool = Self {
            shared: Arc::new(Shared {
                queue: Mutex::new(Queue {
                    jobs: VecDeque::with_capacity(queue_capacity),
                    closed: false,
                }),
                job_ready: Condvar::new(),
                slot_free: Condvar::new(),
                capacity: queue_capacity,
            }),
            workers: Mutex::new(Vec::with_capacity(threads)),
            threads,
        };

        for number in 0..threads {
            let shared = Arc::clone(&pool.shared);
            let spawned = thread::Builder::new()
                .name(format!("blocksig-worker-{number}"))
                .spawn(move || worker_loop(&shared));
            match spawned {
                Ok(worker) => pool.workers.lock().push(worker),
                Err(e) => {
                    // Dropping the pool joins whatever already started.
                    return Err(SigError::Spawn(e));
                }
            }
        }

        tracing::debug!(threads, queue_capacity, "worker pool started");
        Ok(pool)
    }

    /// Queues `task` and returns a handle to its result.
    ///
    /// Blocks while the queue is full. Fails with [`SigError::PoolClosed`]
    /// once [`shutdown`](WorkerPool::shutdown) has begun.
    pub fn submit<F>(&self, task: F) -> Result<JobHandle, SigError>
    where
        F: FnOnce() -> Result<Bytes, BoxError> + Send + 'static,
    {
        let mut queue = self.shared.queue.lock();
        while queue.jobs.len() >= self.shared.capacity && !queue.closed {
            self.shared.slot_free.wait(&mut queue);
        }
        if queue.closed {
            return Err(SigError::PoolClosed);
        }

        let (resolver, handle) = handle::slot();
        queue.jobs.push_back(Job {
            task: Box::new(task),
            resolver,
        });
        drop(queue);

        self.shared.job_ready.notify_one();
        Ok(handle)
    }

    /// Stops accepting jobs, runs everything already queued, and joins the
    /// workers.
    ///
    /// Calling it again is a no-op.
    pub fn shutdown(&self) {
        // Held across the joins so a concurrent caller waits for them too.
        let mut workers = self.workers.lock();
        self.shared.queue.lock().closed = true;
        self.shared.job_ready.notify_all();
        self.shared.slot_free.notify_all();
        if workers.is_empty() {
            return;
        }

        for worker in workers.drain(..) {
            if worker.join().is_err() {
                tracing::warn!("worker thread exited with a panic");
            }
        }
        tracing::debug!(threads = self.threads, "worker pool shut down");
    }

    /// Returns the number of worker threads.
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Returns the maximum number of waiting jobs.
    pub fn queue_capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Returns the number of jobs waiting for a worker.
    pub fn queued(&self) -> usize {
        self.shared.queue.lock().jobs.len()
    }

    /// Returns true once shutdown has begun.
    pub fn is_closed(&self) -> bool {
        self.shared.queue.lock().closed
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("threads", &self.threads)
            .field("queue_capacity", &self.shared.capacity)
            .field("queued", &self.queued())
            .finish()
    }
}

fn worker_loop(shared: &Shared) {
    loop {
        let job = {
            let mut queue = shared.queue.lock();
            loop {
                if let Some(job) = queue.jobs.pop_front() {
                    shared.slot_free.notify_one();
                    break job;
                }
                if queue.closed {
                    return;
                }
                shared.job_ready.wait(&mut queue);
            }
        };
        job.run();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            WorkerPool::new(0, 1),
            Err(SigError::InvalidConfig { .. })
        ));
        assert!(matches!(
            WorkerPool::new(1, 0),
            Err(SigError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_results_match_jobs() {
        let pool = WorkerPool::new(4, 2).unwrap();
        let handles: Vec<_> = (0..32u8)
            .map(|i| pool.submit(move || Ok(Bytes::from(vec![i; 3]))).unwrap())
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.wait().unwrap(), Bytes::from(vec![i as u8; 3]));
        }
    }

    #[test]
    fn test_error_captured_and_worker_survives() {
        let pool = WorkerPool::new(1, 1).unwrap();
        let failing = pool
            .submit(|| Err(Box::new(io::Error::other("bad block")) as BoxError))
            .unwrap();
        let next = pool.submit(|| Ok(Bytes::from_static(b"ok"))).unwrap();

        match failing.wait() {
            Err(JobFailure::Error(e)) => assert_eq!(e.to_string(), "bad block"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(next.wait().unwrap(), Bytes::from_static(b"ok"));
    }

    #[test]
    fn test_panic_captured_and_worker_survives() {
        let pool = WorkerPool::new(1, 1).unwrap();
        let panicking = pool.submit(|| panic!("job blew up")).unwrap();
        let next = pool.submit(|| Ok(Bytes::from_static(b"ok"))).unwrap();

        assert!(matches!(
            panicking.wait(),
            Err(JobFailure::Panic(msg)) if msg == "job blew up"
        ));
        assert_eq!(next.wait().unwrap(), Bytes::from_static(b"ok"));
    }

    #[test]
    fn test_submit_blocks_when_queue_full() {
        let pool = Arc::new(WorkerPool::new(1, 2).unwrap());
        let (started_tx, started_rx) = mpsc::channel();
        let (gate_tx, gate_rx) = mpsc::channel::<()>();

        // Occupy the only worker.
        let busy = pool
            .submit(move || {
                started_tx.send(()).unwrap();
                gate_rx.recv().unwrap();
                Ok(Bytes::new())
            })
            .unwrap();
        started_rx.recv().unwrap();

        let first = pool.submit(|| Ok(Bytes::from_static(b"1"))).unwrap();
        let second = pool.submit(|| Ok(Bytes::from_static(b"2"))).unwrap();
        assert_eq!(pool.queued(), 2);

        let (done_tx, done_rx) = mpsc::channel();
        let submitter = {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                let handle = pool.submit(|| Ok(Bytes::from_static(b"3"))).unwrap();
                done_tx.send(()).unwrap();
                handle
            })
        };

        assert_eq!(
            done_rx.recv_timeout(Duration::from_millis(100)),
            Err(mpsc::RecvTimeoutError::Timeout)
        );

        gate_tx.send(()).unwrap();
        done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        let third = submitter.join().unwrap();

        busy.wait().unwrap();
        assert_eq!(first.wait().unwrap(), Bytes::from_static(b"1"));
        assert_eq!(second.wait().unwrap(), Bytes::from_static(b"2"));
        assert_eq!(third.wait().unwrap(), Bytes::from_static(b"3"));
    }

    #[test]
    fn test_shutdown_drains_queue() {
        let pool = Arc::new(WorkerPool::new(1, 2).unwrap());
        let ran = Arc::new(AtomicUsize::new(0));
        let (started_tx, started_rx) = mpsc::channel();
        let (gate_tx, gate_rx) = mpsc::channel::<()>();

        pool.submit(move || {
            started_tx.send(()).unwrap();
            gate_rx.recv().unwrap();
            Ok(Bytes::new())
        })
        .unwrap();
        started_rx.recv().unwrap();

        let queued: Vec<_> = (0..2)
            .map(|_| {
                let ran = Arc::clone(&ran);
                pool.submit(move || {
                    ran.fetch_add(1, Ordering::SeqCst);
                    Ok(Bytes::new())
                })
                .unwrap()
            })
            .collect();
        assert_eq!(pool.queued(), 2);

        let closer = {
            let pool = Arc::clone(&pool);
            thread::spawn(move || pool.shutdown())
        };
        thread::sleep(Duration::from_millis(20));
        gate_tx.send(()).unwrap();
        closer.join().unwrap();

        assert_eq!(ran.load(Ordering::SeqCst), 2);
        for handle in queued {
            assert!(handle.is_resolved());
            handle.wait().unwrap();
        }
    }

    #[test]
    fn test_concurrent_shutdown_waits_for_queued_job() {
        let pool = Arc::new(WorkerPool::new(1, 1).unwrap());
        let finished = Arc::new(AtomicBool::new(false));
        let (started_tx, started_rx) = mpsc::channel();

        let flag = Arc::clone(&finished);
        pool.submit(move || {
            started_tx.send(()).unwrap();
            thread::sleep(Duration::from_millis(100));
            flag.store(true, Ordering::SeqCst);
            Ok(Bytes::new())
        })
        .unwrap();
        started_rx.recv().unwrap();

        let closers: Vec<_> = (0..2)
            .map(|_| {
                let pool = Arc::clone(&pool);
                let finished = Arc::clone(&finished);
                thread::spawn(move || {
                    pool.shutdown();
                    finished.load(Ordering::SeqCst)
                })
            })
            .collect();

        for closer in closers {
            assert!(closer.join().unwrap());
        }
    }

    #[test]
    fn test_submit_after_shutdown() {
        let pool = WorkerPool::new(2, 2).unwrap();
        pool.shutdown();
        pool.shutdown();
        assert!(pool.is_closed());
        assert!(matches!(
            pool.submit(|| Ok(Bytes::new())),
            Err(SigError::PoolClosed)
        ));
    }
}
