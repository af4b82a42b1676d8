//! Error taxonomy for an orchestration run.
//!
//! Most failures are absorbed inside the pipeline and never reach this type:
//!
//! | Scope          | Raised by                  | Handling                           |
//! |----------------|----------------------------|------------------------------------|
//! | Provider       | one backend call           | absorbed by the ensemble           |
//! | Decomposition  | malformed plan output      | replaced by the default plan       |
//! | Subtask        | an ensemble call erroring  | recorded as a `failed` result      |
//! | Run            | anything before decompose  | surfaced as the failure payload    |

use std::fmt;

use coordination::{EnsembleError, ProviderError};
use thiserror::Error;

/// Where in the pipeline an error belongs, and therefore how far it travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorScope {
    Provider,
    Decomposition,
    Subtask,
    Run,
}

impl ErrorScope {
    /// Whether errors of this scope abort the whole run.
    pub fn aborts_run(self) -> bool {
        matches!(self, Self::Run)
    }
}

impl fmt::Display for ErrorScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Provider => write!(f, "provider"),
            Self::Decomposition => write!(f, "decomposition"),
            Self::Subtask => write!(f, "subtask"),
            Self::Run => write!(f, "run"),
        }
    }
}

#[derive(Debug, Error)]
pub enum OrchestrationError {
    /// The inbound request cannot be processed as given.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    /// The decomposer's output was not a usable subtask array.
    #[error("decomposition parse failure: {0}")]
    ParseFailure(String),

    #[error("subtask {id} failed: {source}")]
    SubtaskExecution {
        id: u32,
        #[source]
        source: EnsembleError,
    },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl OrchestrationError {
    pub fn scope(&self) -> ErrorScope {
        match self {
            Self::Provider(_) => ErrorScope::Provider,
            Self::ParseFailure(_) => ErrorScope::Decomposition,
            Self::SubtaskExecution { .. } => ErrorScope::Subtask,
            Self::InvalidRequest(_) | Self::Configuration(_) | Self::Internal(_) => {
                ErrorScope::Run
            }
        }
    }

    /// Caller-side fault, as opposed to a failure inside the service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidRequest(_))
    }
}
