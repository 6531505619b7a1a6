#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use reelforge_queue::{JobQueue, MemoryJobQueue};
use tower::ServiceExt;

use reelforge_api::config::ServerConfig;
use reelforge_api::router::build_app_router;
use reelforge_api::state::AppState;

/// Build a test `ServerConfig` with safe defaults.
///
/// No embedded workers: tests drive the queue directly.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        embedded_workers: 0,
    }
}

/// Build the full application router on top of `queue`.
pub fn build_test_app(queue: Arc<dyn JobQueue>) -> Router {
    build_app_router(AppState::new(queue), &test_config())
}

/// Application backed by a fresh in-memory queue, plus a handle to that queue.
pub fn memory_app() -> (Router, Arc<MemoryJobQueue>) {
    let queue = Arc::new(MemoryJobQueue::default());
    (build_test_app(queue.clone()), queue)
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    post_raw(app, uri, body.to_string()).await
}

pub async fn post_raw(app: Router, uri: &str, body: String) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn post_empty(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}
