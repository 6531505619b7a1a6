pub mod episodes;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// ```text
/// /generate-episode                  submit a prompt (POST)
/// /job/{id}                          poll job status (GET)
/// /job/{id}/cancel                   cancel a job (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().merge(episodes::router())
}
