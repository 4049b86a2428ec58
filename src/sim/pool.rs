//! Physics Worker Pool
//!
//! A fixed-size Rayon pool that runs disjoint batches of work under a
//! fork-join barrier. The caller blocks until every batch has finished.
//! A panicking batch is caught and logged; its siblings still run.
//!
//! ## Shutdown
//!
//! The pool is drained with a bounded grace period: the Rayon handle is
//! dropped (which asks workers to stop once idle) and each worker reports
//! its exit. Workers that have not reported within the grace period are
//! abandoned so teardown never blocks indefinitely.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use tracing::{debug, error, warn};

/// How a pool shutdown ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShutdownStatus {
    /// Every worker exited within the grace period
    Graceful,
    /// Some workers did not quiesce and were abandoned
    Forced {
        /// Workers still running at the deadline
        stragglers: usize,
    },
    /// The pool had already been shut down
    AlreadyStopped,
}

/// Outcome of one fork-join dispatch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Batches submitted
    pub batches: usize,
    /// Batches that panicked
    pub failed: usize,
}

/// Worker count for this machine: available parallelism minus one, at least one.
pub fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get().saturating_sub(1))
        .unwrap_or(1)
        .max(1)
}

/// Fixed-size worker pool for batched physics.
pub struct WorkerPool {
    pool: Option<ThreadPool>,
    threads: usize,
    exits: Receiver<usize>,
    grace: Duration,
}

impl WorkerPool {
    /// Build a pool with `threads` workers (minimum one).
    pub fn new(threads: usize, grace: Duration) -> Result<Self, ThreadPoolBuildError> {
        let threads = threads.max(1);
        let (exit_tx, exits) = mpsc::channel();

        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("physics-worker-{i}"))
            .exit_handler(move |index| {
                // Receiver may already be gone if shutdown gave up waiting
                let _ = exit_tx.send(index);
            })
            .build()?;

        debug!(threads, "physics worker pool started");

        Ok(Self {
            pool: Some(pool),
            threads,
            exits,
            grace,
        })
    }

    /// Number of workers.
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// True until [`WorkerPool::shutdown`] has run.
    pub fn is_running(&self) -> bool {
        self.pool.is_some()
    }

    /// Split `items` into at most `threads` contiguous batches and run
    /// `work` on each, blocking until all are done.
    ///
    /// Item `i` always lands in batch `i / batch_size`. `work` receives the
    /// batch's starting index and its slice. After shutdown, batches run
    /// inline on the calling thread.
    pub fn run_batches<T, F>(&self, items: &mut [T], work: F) -> BatchReport
    where
        T: Send,
        F: Fn(usize, &mut [T]) + Sync,
    {
        if items.is_empty() {
            return BatchReport::default();
        }

        let batch_size = items.len() / self.threads + 1;
        let batches = items.len().div_ceil(batch_size);
        let work = &work;

        let failed = match &self.pool {
            Some(pool) => {
                let failed = AtomicUsize::new(0);
                let failed_ref = &failed;
                pool.scope(|scope| {
                    for (batch_index, batch) in items.chunks_mut(batch_size).enumerate() {
                        scope.spawn(move |_| {
                            if !run_guarded(batch_index, batch_size, batch, work) {
                                failed_ref.fetch_add(1, Ordering::Relaxed);
                            }
                        });
                    }
                });
                failed.into_inner()
            }
            None => items
                .chunks_mut(batch_size)
                .enumerate()
                .map(|(batch_index, batch)| run_guarded(batch_index, batch_size, batch, work))
                .filter(|ok| !ok)
                .count(),
        };

        BatchReport { batches, failed }
    }

    /// Stop the workers, waiting at most the configured grace period.
    pub fn shutdown(&mut self) -> ShutdownStatus {
        let Some(pool) = self.pool.take() else {
            return ShutdownStatus::AlreadyStopped;
        };

        drop(pool);

        let deadline = Instant::now() + self.grace;
        let mut exited = 0;
        while exited < self.threads {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.exits.recv_timeout(remaining) {
                Ok(_) => exited += 1,
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        if exited < self.threads {
            let stragglers = self.threads - exited;
            warn!(stragglers, grace_ms = self.grace.as_millis() as u64, "physics workers did not quiesce, abandoning them");
            ShutdownStatus::Forced { stragglers }
        } else {
            debug!(threads = self.threads, "physics worker pool stopped");
            ShutdownStatus::Graceful
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if self.pool.is_some() {
            self.shutdown();
        }
    }
}

/// Run one batch, converting a panic into a logged failure.
fn run_guarded<T, F>(batch_index: usize, batch_size: usize, batch: &mut [T], work: &F) -> bool
where
    F: Fn(usize, &mut [T]),
{
    let start = batch_index * batch_size;
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| work(start, batch)));
    if outcome.is_err() {
        error!(batch = batch_index, start, len = batch.len(), "physics batch panicked");
        return false;
    }
    true
}
