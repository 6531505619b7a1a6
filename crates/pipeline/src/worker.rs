//! Pool of long-lived tasks that pull jobs from the queue and run them.
//!
//! Each task loops `dequeue -> execute` until the pool's
//! [`CancellationToken`] fires. While a job runs, a heartbeat extends its
//! lease; if the heartbeat finds the lease gone the execution is dropped
//! without writing anything, since another worker owns the job now.

use std::sync::Arc;
use std::time::Duration;

use reelforge_core::job::CANCELLED_MESSAGE;
use reelforge_queue::{JobQueue, Lease, QueueError};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::error::PipelineError;
use crate::executor::PipelineExecutor;

/// Error stored on jobs that failed for a reason other than cancellation.
pub const GENERIC_FAILURE_MESSAGE: &str = "Episode generation failed";

/// Default number of concurrent worker tasks.
pub const DEFAULT_WORKER_CONCURRENCY: usize = 2;

/// Pause after a failed dequeue before trying again.
const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Number of jobs processed at the same time.
    pub concurrency: usize,
    /// How often a running job's lease is extended.
    pub heartbeat_interval: Duration,
    pub retry_backoff: Duration,
}

impl WorkerConfig {
    /// Heartbeat every third of the lease so two missed beats still leave
    /// the lease alive.
    pub fn for_lease(concurrency: usize, lease_duration: Duration) -> Self {
        Self {
            concurrency: concurrency.max(1),
            heartbeat_interval: (lease_duration / 3).max(Duration::from_millis(10)),
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }
}

/// Bounded set of workers sharing one queue and one executor.
pub struct WorkerPool {
    queue: Arc<dyn JobQueue>,
    executor: Arc<PipelineExecutor>,
    config: WorkerConfig,
}

impl WorkerPool {
    pub fn new(
        queue: Arc<dyn JobQueue>,
        executor: Arc<PipelineExecutor>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            queue,
            executor,
            config,
        }
    }

    /// Run all workers until `cancel` fires and every worker has stopped.
    ///
    /// A job interrupted by shutdown is not written to; its lease expires
    /// and the queue hands it to another worker.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        tracing::info!(
            concurrency = self.config.concurrency,
            heartbeat_ms = self.config.heartbeat_interval.as_millis() as u64,
            "Worker pool started",
        );

        let mut workers = JoinSet::new();
        for worker_id in 0..self.config.concurrency {
            let pool = Arc::clone(&self);
            let cancel = cancel.clone();
            workers.spawn(async move { pool.worker_loop(worker_id, cancel).await });
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Worker task terminated abnormally");
            }
        }
        tracing::info!("Worker pool stopped");
    }

    async fn worker_loop(&self, worker_id: usize, cancel: CancellationToken) {
        loop {
            let claimed = tokio::select! {
                _ = cancel.cancelled() => break,
                claimed = self.queue.dequeue() => claimed,
            };

            match claimed {
                Ok(lease) => {
                    tracing::info!(
                        worker_id,
                        job_id = %lease.job_id,
                        attempt = lease.attempt,
                        "Job claimed by worker",
                    );
                    self.process(&lease, &cancel).await;
                }
                Err(e) => {
                    tracing::error!(worker_id, error = %e, "Failed to dequeue job");
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(self.config.retry_backoff) => {}
                    }
                }
            }
        }
        tracing::debug!(worker_id, "Worker stopped");
    }

    /// Run one job with its heartbeat and record the terminal state.
    async fn process(&self, lease: &Lease, cancel: &CancellationToken) {
        let result = tokio::select! {
            result = self.executor.run(lease) => result,
            lost = self.keep_alive(lease) => Err(lost),
            _ = cancel.cancelled() => {
                tracing::warn!(
                    job_id = %lease.job_id,
                    "Shutdown interrupted a running job; it will be redelivered",
                );
                return;
            }
        };

        match result {
            Ok(episode) => {
                tracing::info!(
                    job_id = %lease.job_id,
                    scenes = episode.scenes.len(),
                    "Job completed",
                );
            }
            Err(err) if !err.fails_job() => {
                tracing::warn!(job_id = %lease.job_id, error = %err, "Abandoning job");
            }
            Err(err) => {
                let message = match err {
                    PipelineError::Cancelled => CANCELLED_MESSAGE,
                    _ => GENERIC_FAILURE_MESSAGE,
                };
                tracing::error!(job_id = %lease.job_id, error = %err, "Job failed");
                if let Err(e) = self.queue.fail(lease, message).await {
                    tracing::warn!(job_id = %lease.job_id, error = %e, "Failed to record job failure");
                }
            }
        }
    }

    /// Extend the lease until it is lost. Transient heartbeat errors are
    /// retried on the next tick.
    async fn keep_alive(&self, lease: &Lease) -> PipelineError {
        let mut ticker = tokio::time::interval(self.config.heartbeat_interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match self.queue.heartbeat(lease).await {
                Ok(()) => {}
                Err(QueueError::LeaseLost(id)) => return PipelineError::LeaseLost(id),
                Err(e) => {
                    tracing::warn!(job_id = %lease.job_id, error = %e, "Heartbeat failed");
                }
            }
        }
    }
}
