//! Orchestrator: decompose → execute → reflect → assemble.

use std::sync::Arc;

use coordination::{Compete, EnsembleResolver, SharedBackend};
use tokio::time::Instant;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use super::decomposer::Decomposer;
use super::errors::OrchestrationError;
use super::reflector::Reflector;
use super::scheduler::Scheduler;
use super::types::{RunRequest, RunResponse, RunSummary, Subtask, SubtaskResult};
use crate::config::OrchestratorConfig;
use crate::providers::{Credentials, ProviderSet};

pub struct Orchestrator {
    config: OrchestratorConfig,
    decomposer: Decomposer,
    scheduler: Scheduler,
    reflector: Reflector,
}

impl Orchestrator {
    /// Wire the pipeline around an explicit fast backend and ensemble.
    pub fn new(
        config: OrchestratorConfig,
        fast: SharedBackend,
        competition: Arc<dyn Compete>,
    ) -> Self {
        let decomposer = Decomposer::new(fast.clone(), config.max_subtasks, config.fast_timeout());
        let scheduler = Scheduler::new(competition, config.context_separator.clone());
        let reflector = Reflector::new(fast, config.fast_timeout(), config.reflection_max_chars);
        Self {
            config,
            decomposer,
            scheduler,
            reflector,
        }
    }

    /// Build real provider backends from per-request credentials.
    pub fn from_credentials(
        config: OrchestratorConfig,
        credentials: &Credentials,
        http: &reqwest::Client,
    ) -> Result<Self, OrchestrationError> {
        config.validate().map_err(OrchestrationError::Configuration)?;
        let providers = ProviderSet::from_credentials(credentials, &config, http)?;
        let resolver = EnsembleResolver::new(providers.panel, config.ensemble_settings())
            .map_err(|e| OrchestrationError::Configuration(e.to_string()))?;
        Ok(Self::new(config, providers.fast, Arc::new(resolver)))
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub async fn run(&self, request: &RunRequest) -> Result<RunResponse, OrchestrationError> {
        let goal = request.goal.trim();
        if goal.is_empty() {
            return Err(OrchestrationError::InvalidRequest(
                "goal must not be empty".to_string(),
            ));
        }

        let run_id = Uuid::new_v4();
        let span = info_span!(
            "run",
            %run_id,
            user_id = request.user_id.as_deref().unwrap_or("-"),
            conversation_id = request.conversation_id.as_deref().unwrap_or("-")
        );

        async {
            let started = Instant::now();
            info!(goal_len = goal.len(), "run started");

            let decomposition = self.decomposer.decompose(goal, &request.history).await;
            let results = self.scheduler.execute(&decomposition, goal).await;
            let output = final_output(&decomposition, &results);
            let reflection = self.reflector.reflect(goal, &results).await;

            let completed = results.iter().filter(|r| r.is_success()).count();
            let total_time_ms = started.elapsed().as_millis() as u64;
            info!(
                total = decomposition.len(),
                completed,
                total_time_ms,
                "run finished"
            );

            Ok(RunResponse {
                output,
                summary: RunSummary {
                    total_subtasks: decomposition.len(),
                    completed_subtasks: completed,
                    total_time_ms,
                    decomposition,
                },
                subtask_results: results,
                lessons_learned: reflection.lessons,
                reflection: reflection.reflection,
            })
        }
        .instrument(span)
        .await
    }
}

/// Output of the highest-id subtask in the decomposition. When that subtask
/// has no result, every recorded output concatenated.
pub fn final_output(decomposition: &[Subtask], results: &[SubtaskResult]) -> String {
    let last = decomposition
        .iter()
        .map(|s| s.id)
        .max()
        .and_then(|id| results.iter().find(|r| r.id == id));
    match last {
        Some(result) => result.output.clone(),
        None => results
            .iter()
            .map(|r| r.output.as_str())
            .collect::<Vec<_>>()
            .join("\n\n"),
    }
}
