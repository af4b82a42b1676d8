//! Goal orchestration pipeline.
//!
//! ```text
//! RunRequest
//!   └─ Orchestrator::run
//!        ├─ Decomposer::decompose   fast backend, default plan on failure
//!        ├─ Scheduler::execute      independent ∥, then dependent in order
//!        ├─ final_output            highest-id result
//!        └─ Reflector::reflect      templated when all succeeded
//! ```

pub mod decomposer;
pub mod errors;
pub mod orchestrator;
pub mod reflector;
pub mod scheduler;
pub mod types;

pub use decomposer::{default_plan, Decomposer};
pub use errors::{ErrorScope, OrchestrationError};
pub use orchestrator::Orchestrator;
pub use reflector::Reflector;
pub use scheduler::Scheduler;
pub use types::{
    CompletedOutputs, FailurePayload, HistoryMessage, Reflection, RunRequest, RunResponse,
    RunSummary, Subtask, SubtaskResult, SubtaskStatus,
};
