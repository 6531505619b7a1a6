//! Submission and status services.
//!
//! Handlers stay thin: they translate HTTP into calls on these services,
//! which own prompt validation and talk to the [`JobQueue`].

use std::sync::Arc;

use reelforge_core::job::{validate_prompt, JobView};
use reelforge_core::types::JobId;
use reelforge_queue::{CancelOutcome, JobQueue};

use crate::error::AppResult;

/// Accepts new episode requests and cancellation requests.
pub struct SubmissionService {
    queue: Arc<dyn JobQueue>,
}

impl SubmissionService {
    pub fn new(queue: Arc<dyn JobQueue>) -> Self {
        Self { queue }
    }

    /// Validate `prompt` and enqueue a job for it.
    ///
    /// The job is readable through [`StatusService::get_job`] as soon as
    /// this returns. Nothing is created when validation fails.
    pub async fn submit(&self, prompt: &str) -> AppResult<JobId> {
        let prompt = validate_prompt(prompt)?;
        let job = self.queue.enqueue(prompt).await?;
        tracing::info!(job_id = %job.id, prompt_chars = prompt.chars().count(), "Job submitted");
        Ok(job.id)
    }

    /// Cancel a queued job, or ask a running job to stop.
    pub async fn cancel(&self, id: JobId) -> AppResult<CancelOutcome> {
        let outcome = self.queue.request_cancel(id).await?;
        tracing::info!(job_id = %id, ?outcome, "Cancellation requested");
        Ok(outcome)
    }
}

/// Read-only access to job snapshots.
pub struct StatusService {
    queue: Arc<dyn JobQueue>,
}

impl StatusService {
    pub fn new(queue: Arc<dyn JobQueue>) -> Self {
        Self { queue }
    }

    pub async fn get_job(&self, id: JobId) -> AppResult<JobView> {
        Ok(self.queue.get_status(id).await?)
    }
}
