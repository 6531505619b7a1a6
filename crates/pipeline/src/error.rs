use reelforge_core::types::JobId;
use reelforge_queue::QueueError;

/// Conditions that stop a pipeline run. Provider failures are never
/// represented here; they degrade into fallbacks instead.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Queue error: {0}")]
    Queue(QueueError),

    /// Another worker owns the job now; nothing may be written to it.
    #[error("Lease lost for job {0}")]
    LeaseLost(JobId),

    #[error("Job was cancelled")]
    Cancelled,
}

impl From<QueueError> for PipelineError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::LeaseLost(id) => PipelineError::LeaseLost(id),
            other => PipelineError::Queue(other),
        }
    }
}

impl PipelineError {
    /// Whether the job should be marked failed by the worker that ran it.
    pub fn fails_job(&self) -> bool {
        !matches!(self, PipelineError::LeaseLost(_))
    }
}
