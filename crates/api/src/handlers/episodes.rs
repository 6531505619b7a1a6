//! Handlers for episode submission and job polling.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use reelforge_core::job::JobView;
use reelforge_core::types::JobId;
use reelforge_queue::CancelOutcome;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Body of `POST /api/generate-episode`. A missing `prompt` is treated as
/// an empty one.
#[derive(Debug, Deserialize)]
pub struct GenerateEpisodeRequest {
    #[serde(default)]
    pub prompt: String,
}

/// Acknowledgement returned for accepted submissions and cancellations.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobAccepted {
    pub job_id: JobId,
    pub message: &'static str,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse a job id from the path. Malformed ids cannot name a job, so they
/// are reported as not found rather than as a bad request.
fn parse_job_id(raw: &str) -> AppResult<JobId> {
    raw.parse()
        .map_err(|_| AppError::NotFound(format!("Job {raw}")))
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

/// POST /api/generate-episode
///
/// Validate the prompt and enqueue a job. Returns 202 with the job id;
/// generation continues in the background.
pub async fn generate_episode(
    State(state): State<AppState>,
    body: Result<Json<GenerateEpisodeRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(input) = body.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    let job_id = state.submissions.submit(&input.prompt).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(JobAccepted {
            job_id,
            message: "Episode generation started",
        }),
    ))
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// GET /api/job/{id}
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<JobView>> {
    let id = parse_job_id(&id)?;
    let view = state.status.get_job(id).await?;
    Ok(Json(view))
}

// ---------------------------------------------------------------------------
// Cancel
// ---------------------------------------------------------------------------

/// POST /api/job/{id}/cancel
///
/// 202 when the job was cancelled or will stop at its next scene, 409 when
/// it already finished.
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let job_id = parse_job_id(&id)?;
    let message = match state.submissions.cancel(job_id).await? {
        CancelOutcome::Cancelled => "Job cancelled",
        CancelOutcome::Requested => "Cancellation requested",
    };

    Ok((StatusCode::ACCEPTED, Json(JobAccepted { job_id, message })))
}
