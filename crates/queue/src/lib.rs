//! Durable mailbox between the submission path and the worker pool.
//!
//! [`JobQueue`] is the only structure shared across workers. Delivery is
//! at-least-once: a claimed job carries a [`Lease`] that must be renewed
//! while the pipeline runs, and a job whose lease expires is handed to the
//! next worker. Every write made by a worker is fenced by its lease token,
//! so at most one executor can mutate a job at any time.
//!
//! Two backends are provided:
//!
//! - [`MemoryJobQueue`] for single-process deployments and tests.
//! - [`PgJobQueue`] backed by PostgreSQL (`FOR UPDATE SKIP LOCKED`).

pub mod config;
pub mod error;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use reelforge_core::episode::Episode;
use reelforge_core::job::{Job, JobView};
use reelforge_core::types::JobId;
use uuid::Uuid;

pub use config::QueueConfig;
pub use error::QueueError;
pub use memory::MemoryJobQueue;
pub use postgres::PgJobQueue;

/// Error message stored on jobs that were redelivered too many times.
pub const ATTEMPTS_EXHAUSTED_MESSAGE: &str = "delivery attempts exhausted";

/// Proof of ownership handed to the worker that claimed a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lease {
    pub job_id: JobId,
    /// Fencing token; replaced on every claim.
    pub token: Uuid,
    pub prompt: String,
    /// 1 on first delivery, incremented on every redelivery.
    pub attempt: u32,
}

/// What a cancellation request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The job had not started and is now failed.
    Cancelled,
    /// The job is running; its executor stops at the next scene boundary.
    Requested,
}

/// Queue operations shared by the submission path, status reads and workers.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Create a queued job for an already validated prompt.
    async fn enqueue(&self, prompt: &str) -> Result<Job, QueueError>;

    /// Wait until a job can be claimed and claim it.
    ///
    /// Claimable jobs are queued jobs and active jobs whose lease expired.
    /// A job that already used all of its delivery attempts is failed
    /// instead of being handed out.
    async fn dequeue(&self) -> Result<Lease, QueueError>;

    /// Consistent snapshot of a job.
    async fn get_status(&self, id: JobId) -> Result<JobView, QueueError>;

    /// Extend the lease of a running job.
    async fn heartbeat(&self, lease: &Lease) -> Result<(), QueueError>;

    /// Record progress. Values lower than the stored progress are ignored.
    async fn report_progress(&self, lease: &Lease, progress: u8) -> Result<(), QueueError>;

    /// Store the episode, set progress to 100 and mark the job completed.
    async fn complete(&self, lease: &Lease, episode: &Episode) -> Result<(), QueueError>;

    /// Mark the job failed with an error description.
    async fn fail(&self, lease: &Lease, error: &str) -> Result<(), QueueError>;

    /// Ask for a job to be cancelled.
    async fn request_cancel(&self, id: JobId) -> Result<CancelOutcome, QueueError>;

    async fn is_cancel_requested(&self, id: JobId) -> Result<bool, QueueError>;
}
