//! Scheduling of dispatch work.
//!
//! # Responsibilities
//! - Decide which thread runs a request's adaptation + dispatch
//! - Bound concurrency when a worker pool is configured
//! - Surface scheduling failures so the caller can still answer the request
//!
//! # Design Decisions
//! - [`InlineExecutor`] runs the job on the calling thread; `apply` only
//!   returns after the job finished
//! - [`WorkerPool`] queues jobs on the runtime and runs them with
//!   `spawn_blocking`, holding a semaphore permit for the duration. Dispatchers
//!   are blocking code, so they never run on async worker threads.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;

use crate::config::{SchedulingMode, WorkerPoolConfig};

/// A unit of dispatch work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Why a job could not be scheduled.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("worker pool is shut down")]
    Closed,

    #[error("no tokio runtime available for the worker pool")]
    NoRuntime,
}

/// Something that runs dispatch jobs.
pub trait Executor: Send + Sync {
    /// Schedule `job`. A rejected job is dropped without running.
    fn execute(&self, job: Job) -> Result<(), ScheduleError>;

    /// Stop accepting jobs. Jobs already running finish; queued jobs are dropped.
    fn shutdown(&self) {}
}

/// Runs every job on the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineExecutor;

impl Executor for InlineExecutor {
    fn execute(&self, job: Job) -> Result<(), ScheduleError> {
        job();
        Ok(())
    }
}

/// Counters describing the pool's current load.
#[derive(Debug, Default)]
pub struct WorkerPoolMetrics {
    queued: AtomicUsize,
    active: AtomicUsize,
    completed: AtomicUsize,
}

impl WorkerPoolMetrics {
    /// Jobs accepted but not yet running.
    pub fn queued(&self) -> usize {
        self.queued.load(Ordering::Relaxed)
    }

    /// Jobs currently running.
    pub fn active(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    /// Jobs that ran to completion (including ones that panicked).
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    fn record_enqueue(&self) {
        self.queued.fetch_add(1, Ordering::Relaxed);
    }

    fn record_start(&self) {
        self.queued.fetch_sub(1, Ordering::Relaxed);
        self.active.fetch_add(1, Ordering::Relaxed);
    }

    fn record_dropped(&self) {
        self.queued.fetch_sub(1, Ordering::Relaxed);
    }

    fn record_completion(&self) {
        self.active.fetch_sub(1, Ordering::Relaxed);
        self.completed.fetch_add(1, Ordering::Relaxed);
    }
}

/// Fixed-size pool of blocking workers on a tokio runtime.
pub struct WorkerPool {
    handle: Handle,
    permits: Arc<Semaphore>,
    size: usize,
    metrics: Arc<WorkerPoolMetrics>,
}

impl WorkerPool {
    /// Create a pool on the current runtime.
    pub fn new(size: usize) -> Result<Self, ScheduleError> {
        let handle = Handle::try_current().map_err(|_| ScheduleError::NoRuntime)?;
        Ok(Self::with_handle(handle, size))
    }

    /// Create a pool on an explicit runtime handle. A size of zero is
    /// treated as one.
    pub fn with_handle(handle: Handle, size: usize) -> Self {
        let size = size.max(1);
        tracing::info!(workers = size, "Worker pool created");
        Self {
            handle,
            permits: Arc::new(Semaphore::new(size)),
            size,
            metrics: Arc::new(WorkerPoolMetrics::default()),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn metrics(&self) -> &WorkerPoolMetrics {
        &self.metrics
    }

    /// Stop accepting jobs. Jobs still queued are dropped without running.
    pub fn shutdown(&self) {
        tracing::info!(
            queued = self.metrics.queued(),
            active = self.metrics.active(),
            "Worker pool shutting down"
        );
        self.permits.close();
    }

    pub fn is_shutdown(&self) -> bool {
        self.permits.is_closed()
    }
}

impl Executor for WorkerPool {
    fn execute(&self, job: Job) -> Result<(), ScheduleError> {
        if self.permits.is_closed() {
            return Err(ScheduleError::Closed);
        }

        self.metrics.record_enqueue();
        let permits = Arc::clone(&self.permits);
        let metrics = Arc::clone(&self.metrics);

        self.handle.spawn(async move {
            let permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    metrics.record_dropped();
                    tracing::debug!("Worker pool closed before job started");
                    return;
                }
            };

            metrics.record_start();
            let result = tokio::task::spawn_blocking(job).await;
            drop(permit);
            metrics.record_completion();

            if let Err(e) = result {
                tracing::error!(error = %e, "Worker job failed");
            }
        });

        Ok(())
    }

    fn shutdown(&self) {
        WorkerPool::shutdown(self);
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("size", &self.size)
            .field("closed", &self.permits.is_closed())
            .field("metrics", &self.metrics)
            .finish()
    }
}

/// Build the executor described by `config`.
pub fn from_config(config: &WorkerPoolConfig) -> Result<Arc<dyn Executor>, ScheduleError> {
    match config.mode {
        SchedulingMode::Inline => Ok(Arc::new(InlineExecutor)),
        SchedulingMode::Pool => Ok(Arc::new(WorkerPool::new(config.size)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_inline_runs_on_calling_thread() {
        let caller = std::thread::current().id();
        let (tx, rx) = mpsc::channel();
        InlineExecutor
            .execute(Box::new(move || tx.send(std::thread::current().id()).unwrap()))
            .unwrap();
        assert_eq!(rx.try_recv().unwrap(), caller);
    }

    #[test]
    fn test_pool_requires_runtime() {
        assert!(matches!(WorkerPool::new(2), Err(ScheduleError::NoRuntime)));
    }

    #[tokio::test]
    async fn test_pool_runs_jobs() {
        let pool = WorkerPool::new(2).unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel();
        pool.execute(Box::new(move || {
            let _ = tx.send(42);
        }))
        .unwrap();

        assert_eq!(rx.await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_pool_rejects_after_shutdown() {
        let pool = WorkerPool::new(1).unwrap();
        pool.shutdown();
        assert!(pool.is_shutdown());
        assert!(matches!(
            pool.execute(Box::new(|| {})),
            Err(ScheduleError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_zero_size_is_one() {
        let pool = WorkerPool::new(0).unwrap();
        assert_eq!(pool.size(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_metrics_track_completion() {
        let pool = WorkerPool::new(1).unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel();
        pool.execute(Box::new(move || {
            std::thread::sleep(Duration::from_millis(10));
            let _ = tx.send(());
        }))
        .unwrap();
        rx.await.unwrap();

        // completion is recorded just after the job returns
        for _ in 0..50 {
            if pool.metrics().completed() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(pool.metrics().completed(), 1);
        assert_eq!(pool.metrics().active(), 0);
        assert_eq!(pool.metrics().queued(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_through_trait_object() {
        let executor = from_config(&WorkerPoolConfig {
            mode: SchedulingMode::Pool,
            size: 2,
        })
        .unwrap();

        executor.shutdown();
        assert!(matches!(
            executor.execute(Box::new(|| {})),
            Err(ScheduleError::Closed)
        ));
    }
}
