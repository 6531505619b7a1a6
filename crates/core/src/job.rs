//! Job record, lifecycle status and the read-only view served to pollers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::episode::Episode;
use crate::error::CoreError;
use crate::progress::PROGRESS_QUEUED;
use crate::types::{JobId, Timestamp};

/// Longest prompt accepted for submission, in characters.
pub const MAX_PROMPT_CHARS: usize = 2000;

/// Error message stored on jobs that were cancelled on request.
pub const CANCELLED_MESSAGE: &str = "cancelled";

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Job lifecycle status.
///
/// `Queued -> Active -> (Completed | Failed)`. Terminal states never
/// transition again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Active,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Active => "active",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Whether the state machine permits moving from `self` to `next`.
    ///
    /// `Active -> Active` is allowed: a redelivered job is re-claimed
    /// without leaving the active state.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        match (self, next) {
            (JobStatus::Queued, JobStatus::Active) => true,
            (JobStatus::Queued, JobStatus::Failed) => true,
            (JobStatus::Active, JobStatus::Active) => true,
            (JobStatus::Active, JobStatus::Completed) => true,
            (JobStatus::Active, JobStatus::Failed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(JobStatus::Queued),
            "active" => Ok(JobStatus::Active),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(CoreError::Internal(format!("Unknown job status '{other}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Job record
// ---------------------------------------------------------------------------

/// A prompt-to-episode generation request and its lifecycle state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Job {
    pub id: JobId,
    pub prompt: String,
    pub status: JobStatus,
    pub progress: u8,
    pub result: Option<Episode>,
    pub error: Option<String>,
    /// Number of times the job has been handed to a worker.
    pub attempts: u32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Job {
    /// Create a fresh queued job for an already validated prompt.
    pub fn new(prompt: impl Into<String>) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: JobId::new(),
            prompt: prompt.into(),
            status: JobStatus::Queued,
            progress: PROGRESS_QUEUED,
            result: None,
            error: None,
            attempts: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn view(&self) -> JobView {
        JobView {
            id: self.id,
            status: self.status,
            progress: self.progress,
            result: self.result.clone(),
            error: self.error.clone(),
        }
    }
}

/// Read-only snapshot of a job exposed to polling clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobView {
    pub id: JobId,
    #[serde(rename = "state")]
    pub status: JobStatus,
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Episode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a submitted prompt and return its trimmed form.
pub fn validate_prompt(prompt: &str) -> Result<&str, CoreError> {
    let trimmed = prompt.trim();
    if trimmed.is_empty() {
        return Err(CoreError::InvalidInput("Prompt missing".to_string()));
    }
    let chars = trimmed.chars().count();
    if chars > MAX_PROMPT_CHARS {
        return Err(CoreError::InvalidInput(format!(
            "Prompt is {chars} characters long; the limit is {MAX_PROMPT_CHARS}"
        )));
    }
    Ok(trimmed)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
