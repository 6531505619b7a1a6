//! Standalone worker process.
//!
//! Runs a [`reelforge_pipeline::WorkerPool`] against the PostgreSQL queue so
//! job execution can scale separately from the API servers.

pub mod config;
