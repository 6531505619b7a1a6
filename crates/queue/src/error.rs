use reelforge_core::job::JobStatus;
use reelforge_core::types::JobId;

/// Errors from the queue substrate.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// No job with this id exists (never created or evicted).
    #[error("Job not found: {0}")]
    NotFound(JobId),

    /// The caller's lease was superseded or the job is no longer active.
    #[error("Lease lost for job {0}")]
    LeaseLost(JobId),

    /// The job already reached a terminal state.
    #[error("Job {0} is already finished")]
    AlreadyTerminal(JobId),

    /// A write would break the `queued -> active -> terminal` lifecycle.
    #[error("Job {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: JobId,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored row could not be mapped back to the domain model.
    #[error("Corrupt job record: {0}")]
    Corrupt(String),
}

impl QueueError {
    /// Whether the error reflects the substrate being unavailable, as
    /// opposed to a statement about one particular job.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            QueueError::Database(_) | QueueError::Migration(_) | QueueError::Corrupt(_)
        )
    }
}
