//! Ensemble resolution — one prompt, many backends, first quorum wins.
//!
//! ```text
//! EnsembleResolver::compete(prompt, system)
//!   ├─ spawn with_deadline(backend_i.generate(..), per_provider_timeout) × N
//!   ├─ collect non-empty successes in arrival order
//!   └─ resolve on the first of:
//!        quorum reached          → longest of the first Q          (Quorum)
//!        ceiling elapsed         → longest accumulated so far      (Partial)
//!        every participant done  → longest accumulated so far      (Partial)
//!        nothing accumulated     → synthetic "timed out", `none`   (Unavailable)
//! ```
//!
//! Selection is quorum-first, quality-among-quorum: responses are never
//! compared for agreement, the longest content simply wins (first arrival on
//! ties). The resolver never fails on a non-empty panel.

mod resolver;
mod selection;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use resolver::EnsembleResolver;
pub use selection::{select_longest, Candidate};

/// Provider tag reported when no backend contributed.
pub const NO_PROVIDER: &str = "none";

/// Content reported when no backend contributed.
pub const TIMED_OUT_CONTENT: &str =
    "All providers timed out or failed before producing a response.";

/// Default deadline applied to each participant.
pub const DEFAULT_PER_PROVIDER_TIMEOUT: Duration = Duration::from_secs(15);
/// Default global ceiling for one ensemble call.
pub const DEFAULT_CEILING: Duration = Duration::from_secs(20);
/// Default majority threshold (4 of up to 6 providers).
pub const DEFAULT_QUORUM: usize = 4;

/// Timing and threshold policy for one ensemble call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnsembleSettings {
    /// Deadline for each individual provider.
    pub per_provider_timeout: Duration,
    /// Successful responses needed to resolve early.
    pub quorum: usize,
    /// Upper bound on the whole call, regardless of quorum.
    pub ceiling: Duration,
}

impl Default for EnsembleSettings {
    fn default() -> Self {
        Self {
            per_provider_timeout: DEFAULT_PER_PROVIDER_TIMEOUT,
            quorum: DEFAULT_QUORUM,
            ceiling: DEFAULT_CEILING,
        }
    }
}

impl EnsembleSettings {
    pub fn validate(&self) -> Result<(), String> {
        if self.quorum == 0 {
            return Err("quorum must be >= 1".to_string());
        }
        if self.per_provider_timeout.is_zero() {
            return Err("per_provider_timeout must be > 0".to_string());
        }
        if self.ceiling.is_zero() {
            return Err("ceiling must be > 0".to_string());
        }
        Ok(())
    }
}

/// How an ensemble call resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionLevel {
    /// Quorum reached.
    Quorum,
    /// Resolved below quorum with at least one response.
    Partial,
    /// Nothing arrived; synthetic fallback content.
    Unavailable,
}

impl std::fmt::Display for ResolutionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Quorum => write!(f, "quorum"),
            Self::Partial => write!(f, "partial"),
            Self::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// Result of one ensemble call. Consumed immediately by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnsembleOutcome {
    pub content: String,
    pub source_backend: String,
    /// Latency of the selected response, measured from dispatch.
    pub latency_ms: u64,
    /// Number of successful responses accumulated at resolution time.
    pub responders: usize,
    pub level: ResolutionLevel,
}

impl EnsembleOutcome {
    /// Synthetic outcome used when no provider contributed.
    pub fn unavailable(elapsed: Duration) -> Self {
        Self {
            content: TIMED_OUT_CONTENT.to_string(),
            source_backend: NO_PROVIDER.to_string(),
            latency_ms: elapsed.as_millis() as u64,
            responders: 0,
            level: ResolutionLevel::Unavailable,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        self.level == ResolutionLevel::Unavailable
    }
}

/// Errors an ensemble call can raise. Provider failures are never surfaced
/// here; they are absorbed into the outcome.
#[derive(Debug, Error)]
pub enum EnsembleError {
    #[error("ensemble panel is empty")]
    EmptyPanel,

    #[error("invalid ensemble settings: {0}")]
    InvalidSettings(String),
}

/// The seam callers depend on to resolve a prompt through an ensemble.
///
/// [`EnsembleResolver`](crate::EnsembleResolver) never returns an error; an
/// empty panel degrades to the synthetic outcome like any other total failure.
#[async_trait]
pub trait Compete: Send + Sync {
    async fn compete(&self, prompt: &str, system: &str) -> Result<EnsembleOutcome, EnsembleError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_validate() {
        let settings = EnsembleSettings::default();
        settings.validate().expect("defaults should be valid");
        assert_eq!(settings.quorum, 4);
        assert_eq!(settings.per_provider_timeout, Duration::from_secs(15));
        assert_eq!(settings.ceiling, Duration::from_secs(20));
    }

    #[test]
    fn zero_quorum_rejected() {
        let settings = EnsembleSettings {
            quorum: 0,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn unavailable_outcome_is_tagged_none() {
        let outcome = EnsembleOutcome::unavailable(Duration::from_millis(20_000));
        assert_eq!(outcome.source_backend, NO_PROVIDER);
        assert_eq!(outcome.latency_ms, 20_000);
        assert!(outcome.is_synthetic());
    }

    #[test]
    fn outcome_serializes_camel_case() {
        let outcome = EnsembleOutcome {
            content: "x".into(),
            source_backend: "groq".into(),
            latency_ms: 12,
            responders: 1,
            level: ResolutionLevel::Partial,
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["sourceBackend"], "groq");
        assert_eq!(json["latencyMs"], 12);
        assert_eq!(json["level"], "partial");
    }
}
