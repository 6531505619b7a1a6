use std::sync::Arc;

use reelforge_queue::JobQueue;

use crate::services::{StatusService, SubmissionService};

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    pub submissions: Arc<SubmissionService>,
    pub status: Arc<StatusService>,
}

impl AppState {
    /// Build both services on top of one shared queue.
    pub fn new(queue: Arc<dyn JobQueue>) -> Self {
        Self {
            submissions: Arc::new(SubmissionService::new(Arc::clone(&queue))),
            status: Arc::new(StatusService::new(queue)),
        }
    }
}
