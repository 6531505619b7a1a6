/// Errors from a single provider call.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider returned a non-2xx status code.
    #[error("Provider API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The response arrived but did not carry the expected payload.
    #[error("Malformed provider response: {0}")]
    Malformed(String),

    /// The call did not finish within its time budget.
    #[error("Provider call timed out")]
    Timeout,

    /// No credentials were configured for the provider.
    #[error("Provider not configured: {0} is not set")]
    NotConfigured(&'static str),
}
