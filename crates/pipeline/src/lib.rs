//! Episode generation pipeline (script -> per-scene media -> finalize).
//!
//! - [`PipelineExecutor`] runs the three stages for one claimed job and
//!   reports progress through the queue.
//! - [`Outcome`] tags every provider call as produced or degraded, so
//!   provider failures are compensated at the stage boundary instead of
//!   failing the job.
//! - [`WorkerPool`] runs a bounded number of executors against a
//!   [`reelforge_queue::JobQueue`], keeping each job's lease alive.

pub mod config;
pub mod error;
pub mod executor;
pub mod outcome;
pub mod worker;

pub use config::{FallbackPolicy, PipelineConfig};
pub use error::PipelineError;
pub use executor::PipelineExecutor;
pub use outcome::Outcome;
pub use worker::{WorkerConfig, WorkerPool};
