//! Fixed-size pool of worker threads draining one shared task queue.
//!
//! Tasks leave the queue in submission order, but several workers drain it at
//! once, so completion order is not guaranteed. A worker holds the queue lock
//! only while popping a task and the store lock only while writing a result,
//! never both at the same time.

mod task;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use extcall_config::ShutdownPolicy;
use tracing::{debug, error, info, warn};

use crate::error::DispatchError;
use crate::store::ResultStore;
use crate::ticket::Ticket;

pub use self::task::Task;

/// Tracing target for worker pool operations.
pub(crate) const POOL_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::pool");

/// Outcome of shutting the pool down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Tasks executed over the pool's lifetime.
    pub completed: u64,
    /// Queued tasks removed without running.
    pub cancelled: u64,
}

#[derive(Default)]
struct Queue {
    tasks: VecDeque<Task>,
    closing: bool,
}

struct Shared {
    queue: Mutex<Queue>,
    available: Condvar,
    store: Arc<ResultStore>,
    submitted: AtomicU64,
    completed: AtomicU64,
    cancelled: AtomicU64,
}

impl Shared {
    fn lock_queue(&self) -> Result<MutexGuard<'_, Queue>, DispatchError> {
        self.queue
            .lock()
            .map_err(|_| DispatchError::internal("worker pool queue lock poisoned"))
    }

    fn next_task(&self) -> Option<Task> {
        let mut queue = self.lock_queue().ok()?;
        loop {
            if let Some(task) = queue.tasks.pop_front() {
                return Some(task);
            }
            if queue.closing {
                return None;
            }
            queue = self.available.wait(queue).ok()?;
        }
    }

    fn execute(&self, task: &Task) {
        let outcome = task.run();
        match (task.ticket(), outcome) {
            (Some(ticket), Ok(payload)) => self.record(ticket, payload),
            (Some(ticket), Err(failure)) => {
                debug!(
                    target: POOL_TARGET,
                    protocol = task.protocol_name(),
                    %ticket,
                    error = %failure,
                    "async task failed"
                );
                self.record(ticket, failure.to_reply());
            }
            (None, Ok(_)) => {}
            (None, Err(failure)) => warn!(
                target: POOL_TARGET,
                protocol = task.protocol_name(),
                error = %failure,
                "oneway task failed"
            ),
        }
        self.completed.fetch_add(1, Ordering::SeqCst);
    }

    fn record(&self, ticket: Ticket, payload: String) {
        if let Err(error) = self.store.store(ticket, payload) {
            warn!(target: POOL_TARGET, %ticket, %error, "result could not be recorded");
        }
    }

    fn cancel(&self, tasks: Vec<Task>) {
        for task in tasks {
            match task.ticket() {
                Some(ticket) => self.record(ticket, DispatchError::PoolShuttingDown.to_reply()),
                None => warn!(
                    target: POOL_TARGET,
                    protocol = task.protocol_name(),
                    "oneway task cancelled at shutdown"
                ),
            }
            self.cancelled.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Fixed set of named worker threads executing queued [`Task`]s.
///
/// Results of ticketed tasks are written to the shared [`ResultStore`]; a
/// failing or panicking protocol produces an `ERROR:` payload and the worker
/// moves on to the next task.
pub struct WorkerPool {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    report: Mutex<Option<ShutdownReport>>,
}

impl WorkerPool {
    /// Spawns `size` workers writing into `store`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Internal`] when `size` is zero or a thread
    /// cannot be spawned; workers already started are joined first.
    pub fn start(size: usize, store: Arc<ResultStore>) -> Result<Self, DispatchError> {
        if size == 0 {
            return Err(DispatchError::internal(
                "worker pool needs at least one thread",
            ));
        }
        let shared = Arc::new(Shared {
            queue: Mutex::new(Queue::default()),
            available: Condvar::new(),
            store,
            submitted: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            cancelled: AtomicU64::new(0),
        });

        let mut workers = Vec::with_capacity(size);
        for index in 0..size {
            let worker_shared = Arc::clone(&shared);
            let spawned = thread::Builder::new()
                .name(format!("extcall-worker-{index}"))
                .spawn(move || run_worker(&worker_shared));
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(source) => {
                    let pool = Self::from_parts(shared, workers);
                    if let Err(error) = pool.shutdown(ShutdownPolicy::Cancel) {
                        warn!(target: POOL_TARGET, %error, "partial pool teardown failed");
                    }
                    return Err(DispatchError::internal(format!(
                        "failed to spawn worker thread: {source}"
                    )));
                }
            }
        }
        info!(target: POOL_TARGET, workers = size, "worker pool started");
        Ok(Self::from_parts(shared, workers))
    }

    fn from_parts(shared: Arc<Shared>, workers: Vec<JoinHandle<()>>) -> Self {
        Self {
            shared,
            workers: Mutex::new(workers),
            report: Mutex::new(None),
        }
    }

    /// Queues a task for execution.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::PoolShuttingDown`] once shutdown has begun.
    pub fn submit(&self, task: Task) -> Result<(), DispatchError> {
        let mut queue = self.shared.lock_queue()?;
        if queue.closing {
            return Err(DispatchError::PoolShuttingDown);
        }
        queue.tasks.push_back(task);
        self.shared.submitted.fetch_add(1, Ordering::SeqCst);
        drop(queue);
        self.shared.available.notify_one();
        Ok(())
    }

    /// Stops accepting work, settles queued tasks per `policy`, and joins
    /// every worker.
    ///
    /// Calling it again returns the first report unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Internal`] if a pool lock is poisoned.
    pub fn shutdown(&self, policy: ShutdownPolicy) -> Result<ShutdownReport, DispatchError> {
        let mut report = self
            .report
            .lock()
            .map_err(|_| DispatchError::internal("worker pool report lock poisoned"))?;
        if let Some(existing) = *report {
            return Ok(existing);
        }

        let cancelled = {
            let mut queue = self.shared.lock_queue()?;
            queue.closing = true;
            match policy {
                ShutdownPolicy::Drain => Vec::new(),
                ShutdownPolicy::Cancel => queue.tasks.drain(..).collect(),
            }
        };
        self.shared.available.notify_all();
        info!(
            target: POOL_TARGET,
            %policy,
            cancelled = cancelled.len(),
            "worker pool shutting down"
        );
        self.shared.cancel(cancelled);

        let handles = std::mem::take(
            &mut *self
                .workers
                .lock()
                .map_err(|_| DispatchError::internal("worker pool handle lock poisoned"))?,
        );
        for handle in handles {
            let name = handle.thread().name().unwrap_or("worker").to_owned();
            if handle.join().is_err() {
                error!(target: POOL_TARGET, worker = %name, "worker thread panicked");
            }
        }

        let finished = ShutdownReport {
            completed: self.completed(),
            cancelled: self.cancelled(),
        };
        info!(
            target: POOL_TARGET,
            completed = finished.completed,
            cancelled = finished.cancelled,
            "worker pool stopped"
        );
        *report = Some(finished);
        Ok(finished)
    }

    /// Tasks accepted by [`WorkerPool::submit`].
    #[must_use]
    pub fn submitted(&self) -> u64 {
        self.shared.submitted.load(Ordering::SeqCst)
    }

    /// Tasks that have finished executing, successfully or not.
    #[must_use]
    pub fn completed(&self) -> u64 {
        self.shared.completed.load(Ordering::SeqCst)
    }

    /// Tasks removed from the queue at shutdown without running.
    #[must_use]
    pub fn cancelled(&self) -> u64 {
        self.shared.cancelled.load(Ordering::SeqCst)
    }

    /// Tasks waiting for a worker.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.shared
            .lock_queue()
            .map_or(0, |queue| queue.tasks.len())
    }

    /// Returns `true` once shutdown has begun.
    #[must_use]
    pub fn is_closing(&self) -> bool {
        self.shared.lock_queue().map_or(true, |queue| queue.closing)
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("submitted", &self.submitted())
            .field("completed", &self.completed())
            .field("cancelled", &self.cancelled())
            .field("queued", &self.queued())
            .finish_non_exhaustive()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if let Err(error) = self.shutdown(ShutdownPolicy::Drain) {
            warn!(target: POOL_TARGET, %error, "worker pool shutdown on drop failed");
        }
    }
}

fn run_worker(shared: &Shared) {
    let name = thread::current().name().unwrap_or("worker").to_owned();
    debug!(target: POOL_TARGET, worker = %name, "worker started");
    while let Some(task) = shared.next_task() {
        shared.execute(&task);
    }
    debug!(target: POOL_TARGET, worker = %name, "worker stopped");
}

#[cfg(test)]
mod tests;
