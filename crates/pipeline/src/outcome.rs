//! Tagged result of a provider call after the fallback policy is applied.

use std::future::Future;
use std::time::Duration;

use reelforge_providers::ProviderError;

/// What a stage got from a provider call.
#[derive(Debug)]
pub enum Outcome<T> {
    /// The provider returned a usable value.
    Produced(T),
    /// The provider failed and a fallback value stands in.
    Degraded { fallback: T, cause: ProviderError },
}

impl<T> Outcome<T> {
    /// Apply a fallback to a provider result.
    pub fn from_result(result: Result<T, ProviderError>, fallback: impl FnOnce() -> T) -> Self {
        match result {
            Ok(value) => Outcome::Produced(value),
            Err(cause) => Outcome::Degraded {
                fallback: fallback(),
                cause,
            },
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Outcome::Degraded { .. })
    }

    pub fn value(&self) -> &T {
        match self {
            Outcome::Produced(value) => value,
            Outcome::Degraded { fallback, .. } => fallback,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Outcome::Produced(value) => value,
            Outcome::Degraded { fallback, .. } => fallback,
        }
    }
}

/// Run a provider call under its own time budget.
///
/// An elapsed budget is reported as [`ProviderError::Timeout`], the same
/// way any other provider failure is reported.
pub async fn with_timeout<T, F>(budget: Duration, call: F) -> Result<T, ProviderError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    match tokio::time::timeout(budget, call).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout),
    }
}
