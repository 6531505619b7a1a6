//! Route definitions for episode generation jobs.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::episodes;
use crate::state::AppState;

/// Episode routes, mounted under `/api`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/generate-episode", post(episodes::generate_episode))
        .route("/job/{id}", get(episodes::get_job))
        .route("/job/{id}/cancel", post(episodes::cancel_job))
}
