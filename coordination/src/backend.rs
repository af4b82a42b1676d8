//! Backend capability — one prompt in, generated text out.
//!
//! Every text-generation provider (fast single-shot model, ensemble panel
//! member, test stub) implements [`TextBackend`]. Implementations perform a
//! single outbound call and never retry; retry and fallback decisions belong
//! to the caller ([`crate::race`], [`crate::ensemble`]).

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

/// Failure of a single backend invocation.
///
/// These are always absorbed by the layer above: the ensemble counts them as
/// "no contribution" and the decomposer/reflector fall back to fixed output.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// Transport failure (DNS, connect, TLS, reset, client-side timeout).
    #[error("[{provider}] network error: {message}")]
    Network { provider: String, message: String },

    /// The provider answered with a non-success HTTP status.
    #[error("[{provider}] HTTP {status}: {body}")]
    Status {
        provider: String,
        status: u16,
        body: String,
    },

    /// The response body could not be decoded.
    #[error("[{provider}] undecodable response: {message}")]
    Decode { provider: String, message: String },

    /// The response decoded but carried no generated text.
    #[error("[{provider}] response had no content")]
    MissingContent { provider: String },
}

impl ProviderError {
    /// Name of the provider that produced this error.
    pub fn provider(&self) -> &str {
        match self {
            Self::Network { provider, .. }
            | Self::Status { provider, .. }
            | Self::Decode { provider, .. }
            | Self::MissingContent { provider } => provider,
        }
    }

    pub fn network(provider: impl Into<String>, message: impl ToString) -> Self {
        Self::Network {
            provider: provider.into(),
            message: message.to_string(),
        }
    }

    pub fn decode(provider: impl Into<String>, message: impl ToString) -> Self {
        Self::Decode {
            provider: provider.into(),
            message: message.to_string(),
        }
    }

    pub fn missing_content(provider: impl Into<String>) -> Self {
        Self::MissingContent {
            provider: provider.into(),
        }
    }
}

/// A text-generation backend.
#[async_trait]
pub trait TextBackend: Send + Sync {
    /// Stable provider tag used in logs and in `EnsembleOutcome::source_backend`.
    fn name(&self) -> &str;

    /// Generate text for `prompt` under the given system instruction.
    async fn generate(&self, prompt: &str, system: &str) -> Result<String, ProviderError>;
}

/// Shared reference to a backend. Backends are handed to spawned tasks, so
/// they must be `'static` behind an `Arc`.
pub type SharedBackend = Arc<dyn TextBackend>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_name_is_extracted_from_every_variant() {
        let errs = [
            ProviderError::network("groq", "connection reset"),
            ProviderError::Status {
                provider: "groq".into(),
                status: 429,
                body: "slow down".into(),
            },
            ProviderError::decode("groq", "expected value"),
            ProviderError::missing_content("groq"),
        ];
        for err in errs {
            assert_eq!(err.provider(), "groq");
        }
    }

    #[test]
    fn status_error_display_includes_code() {
        let err = ProviderError::Status {
            provider: "openai".into(),
            status: 503,
            body: "overloaded".into(),
        };
        assert_eq!(err.to_string(), "[openai] HTTP 503: overloaded");
    }
}
