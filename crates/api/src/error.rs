use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use reelforge_core::error::CoreError;
use reelforge_queue::QueueError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] and [`QueueError`] and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `reelforge_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// An error from the job queue.
    #[error(transparent)]
    Queue(#[from] QueueError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A path that does not name any job (including malformed ids).
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::InvalidInput(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    internal()
                }
            },

            // --- Queue errors ---
            AppError::Queue(err) => classify_queue_error(err),

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("{what} not found"),
            ),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Classify a queue error into an HTTP status, error code, and message.
///
/// - `NotFound` maps to 404.
/// - `AlreadyTerminal` maps to 409.
/// - Everything else maps to 500 with a sanitized message.
fn classify_queue_error(err: &QueueError) -> (StatusCode, &'static str, String) {
    match err {
        QueueError::NotFound(id) => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("Job {id} not found"),
        ),
        QueueError::AlreadyTerminal(id) => (
            StatusCode::CONFLICT,
            "CONFLICT",
            format!("Job {id} has already finished"),
        ),
        other => {
            tracing::error!(error = %other, "Queue error");
            internal()
        }
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}
