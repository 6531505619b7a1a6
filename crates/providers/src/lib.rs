//! Capability adapters for the generative providers.
//!
//! Each capability ([`TextGenerator`], [`ImageGenerator`],
//! [`VoiceSynthesizer`]) is a narrow async trait with one HTTP adapter per
//! upstream provider. Adapters report failures as [`ProviderError`] and
//! never substitute fallback values themselves; fallback is the pipeline's
//! policy.

pub mod capability;
pub mod config;
pub mod elevenlabs;
pub mod error;
mod http;
pub mod openai;
pub mod stability;

pub use capability::{ImageGenerator, Providers, TextGenerator, VoiceSynthesizer};
pub use config::ProviderConfig;
pub use error::ProviderError;
