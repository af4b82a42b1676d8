//! Goal orchestration over a racing ensemble of text-generation providers.
//!
//! A goal is decomposed into a bounded set of subtasks, each subtask is
//! resolved by racing a panel of providers (see [`coordination::ensemble`]),
//! and a short reflection closes the run.
//!
//! # Modules
//!
//! | Module      | Purpose                                                    |
//! |-------------|------------------------------------------------------------|
//! | `config`    | `OrchestratorConfig`: defaults, env overrides, TOML        |
//! | `providers` | HTTPS backends, static provider registry, credentials      |
//! | `pipeline`  | decomposer, scheduler, reflector, orchestrator             |
//! | `prompts`   | system instructions and prompt builders                    |
//! | `server`    | axum router: `/health`, `/v1/orchestrate`                  |

pub mod config;
pub mod pipeline;
pub mod prompts;
pub mod providers;
pub mod server;

pub use config::OrchestratorConfig;
pub use pipeline::{OrchestrationError, Orchestrator, RunRequest, RunResponse};
pub use providers::{Credentials, ProviderKind};
