//! Reelforge domain core.
//!
//! Pure domain logic shared by the queue backends, the pipeline executor and
//! the HTTP server: job and episode models, the error taxonomy, script
//! segmentation and progress arithmetic. Nothing in this crate performs I/O.

pub mod episode;
pub mod error;
pub mod job;
pub mod progress;
pub mod script;
pub mod types;
