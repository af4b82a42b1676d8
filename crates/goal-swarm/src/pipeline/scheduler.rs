//! Dependency scheduler: independent subtasks concurrently, then dependent
//! subtasks one at a time in array order.
//!
//! ```text
//! subtasks ─┬─ independent ──▶ join_all(compete…) ──▶ record outputs
//!           │                                              │
//!           └─ dependent ──▶ for each, in array order: ◀───┘
//!                              gather dep outputs → compete → record
//! ```
//!
//! Dependent subtasks are NOT topologically sorted. A dependency whose output
//! is not yet recorded (it failed, or it appears later in the array) is treated
//! as absent context.

use std::sync::Arc;

use coordination::{Compete, NO_PROVIDER};
use futures::future::join_all;
use tokio::time::Instant;
use tracing::{info, info_span, warn, Instrument};

use super::errors::OrchestrationError;
use super::types::{CompletedOutputs, Subtask, SubtaskResult, SubtaskStatus};
use crate::prompts;

pub struct Scheduler {
    competition: Arc<dyn Compete>,
    separator: String,
}

impl Scheduler {
    pub fn new(competition: Arc<dyn Compete>, separator: impl Into<String>) -> Self {
        Self {
            competition,
            separator: separator.into(),
        }
    }

    /// Run every subtask once. Results come back independent-first, each
    /// partition in its original order.
    pub async fn execute(&self, subtasks: &[Subtask], goal: &str) -> Vec<SubtaskResult> {
        let (independent, dependent): (Vec<&Subtask>, Vec<&Subtask>) =
            subtasks.iter().partition(|s| s.is_independent());

        info!(
            independent = independent.len(),
            dependent = dependent.len(),
            "scheduling subtasks"
        );

        let mut completed = CompletedOutputs::new();
        let mut results = Vec::with_capacity(subtasks.len());

        let batch = independent.iter().map(|subtask| {
            let prompt = prompts::subtask_prompt(goal, subtask);
            self.run_one(subtask, prompt, prompts::SUBTASK_SYSTEM)
        });
        for result in join_all(batch).await {
            record(&mut completed, &result);
            results.push(result);
        }

        for subtask in dependent {
            let context = self.gather_context(subtask, &completed);
            let prompt = prompts::synthesis_prompt(goal, subtask, &context);
            let result = self
                .run_one(subtask, prompt, prompts::SYNTHESIS_SYSTEM)
                .await;
            record(&mut completed, &result);
            results.push(result);
        }

        results
    }

    /// Join the recorded outputs of `subtask`'s dependencies in list order.
    pub fn gather_context(&self, subtask: &Subtask, completed: &CompletedOutputs) -> String {
        let mut parts = Vec::with_capacity(subtask.dependencies.len());
        for dep in &subtask.dependencies {
            match completed.get(dep) {
                Some(output) => parts.push(output.as_str()),
                None => warn!(
                    subtask_id = subtask.id,
                    dependency = dep,
                    "dependency output unavailable, continuing without it"
                ),
            }
        }
        parts.join(&self.separator)
    }

    async fn run_one(&self, subtask: &Subtask, prompt: String, system: &str) -> SubtaskResult {
        let span = info_span!("subtask", subtask_id = subtask.id, title = %subtask.title);
        async {
            let started = Instant::now();
            match self.competition.compete(&prompt, system).await {
                Ok(outcome) => {
                    info!(
                        provider = %outcome.source_backend,
                        latency_ms = outcome.latency_ms,
                        level = %outcome.level,
                        "subtask resolved"
                    );
                    SubtaskResult {
                        id: subtask.id,
                        title: subtask.title.clone(),
                        output: outcome.content,
                        source_backend: outcome.source_backend,
                        latency_ms: outcome.latency_ms,
                        status: SubtaskStatus::Success,
                    }
                }
                Err(source) => {
                    let err = OrchestrationError::SubtaskExecution {
                        id: subtask.id,
                        source,
                    };
                    warn!(error = %err, scope = %err.scope(), "subtask failed");
                    SubtaskResult {
                        id: subtask.id,
                        title: subtask.title.clone(),
                        output: err.to_string(),
                        source_backend: NO_PROVIDER.to_string(),
                        latency_ms: started.elapsed().as_millis() as u64,
                        status: SubtaskStatus::Failed,
                    }
                }
            }
        }
        .instrument(span)
        .await
    }
}

fn record(completed: &mut CompletedOutputs, result: &SubtaskResult) {
    if result.is_success() {
        completed.insert(result.id, result.output.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    use async_trait::async_trait;
    use coordination::{EnsembleError, EnsembleOutcome, ResolutionLevel};

    /// Replies with the first keyword found in the prompt, or errors on "FAIL".
    /// Records every prompt it sees.
    #[derive(Default)]
    struct KeywordCompete {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Compete for KeywordCompete {
        async fn compete(
            &self,
            prompt: &str,
            _system: &str,
        ) -> Result<EnsembleOutcome, EnsembleError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            if prompt.contains("FAIL") {
                return Err(EnsembleError::EmptyPanel);
            }
            let content = if prompt.contains("Results from previous steps") {
                prompt.to_string()
            } else if prompt.contains("Research") {
                "A".to_string()
            } else {
                "B".to_string()
            };
            Ok(EnsembleOutcome {
                content,
                source_backend: "stub".into(),
                latency_ms: 5,
                responders: 1,
                level: ResolutionLevel::Quorum,
            })
        }
    }

    fn subtask(id: u32, title: &str, deps: &[u32]) -> Subtask {
        Subtask {
            id,
            title: title.into(),
            description: format!("{title} description"),
            dependencies: deps.to_vec(),
        }
    }

    fn scheduler(stub: Arc<KeywordCompete>) -> Scheduler {
        Scheduler::new(stub, "\n\n---\n\n")
    }

    #[test]
    fn context_joins_dependencies_in_list_order() {
        let sched = scheduler(Arc::default());
        let mut completed = CompletedOutputs::new();
        completed.insert(1, "A".to_string());
        completed.insert(2, "B".to_string());

        let ctx = sched.gather_context(&subtask(3, "Synthesize", &[1, 2]), &completed);
        assert_eq!(ctx, "A\n\n---\n\nB");

        let ctx = sched.gather_context(&subtask(3, "Synthesize", &[2, 1]), &completed);
        assert_eq!(ctx, "B\n\n---\n\nA");
    }

    #[test]
    fn missing_dependency_is_absent_context() {
        let sched = scheduler(Arc::default());
        let mut completed = CompletedOutputs::new();
        completed.insert(2, "B".to_string());
        let ctx = sched.gather_context(&subtask(3, "Synthesize", &[1, 2]), &completed);
        assert_eq!(ctx, "B");
    }

    #[tokio::test]
    async fn synthesis_prompt_carries_dependency_outputs() {
        let stub = Arc::new(KeywordCompete::default());
        let results = scheduler(stub.clone())
            .execute(
                &[
                    subtask(1, "Research", &[]),
                    subtask(2, "Draft", &[]),
                    subtask(3, "Synthesize", &[1, 2]),
                ],
                "Plan a product launch",
            )
            .await;

        assert_eq!(results.len(), 3);
        assert!(results.iter().all(SubtaskResult::is_success));
        let synthesis = &results[2];
        assert_eq!(synthesis.id, 3);
        assert!(synthesis.output.contains("A\n\n---\n\nB"));
    }

    #[tokio::test]
    async fn results_are_independent_then_dependent() {
        let stub = Arc::new(KeywordCompete::default());
        let results = scheduler(stub)
            .execute(
                &[
                    subtask(1, "Research", &[]),
                    subtask(2, "Outline", &[1]),
                    subtask(3, "Draft", &[]),
                    subtask(4, "Synthesize", &[2, 3]),
                ],
                "goal",
            )
            .await;
        let order: Vec<u32> = results.iter().map(|r| r.id).collect();
        assert_eq!(order, vec![1, 3, 2, 4]);
    }

    #[tokio::test]
    async fn failed_subtask_does_not_halt_siblings() {
        let stub = Arc::new(KeywordCompete::default());
        let results = scheduler(stub)
            .execute(
                &[
                    subtask(1, "Research", &[]),
                    subtask(2, "FAIL step", &[]),
                    subtask(3, "Synthesize", &[1, 2]),
                ],
                "goal",
            )
            .await;

        assert_eq!(results[1].status, SubtaskStatus::Failed);
        assert_eq!(results[1].source_backend, "none");
        assert!(results[1].output.contains("subtask 2 failed"));
        assert!(results[2].is_success());
        // Only the successful dependency reaches the synthesis context.
        assert!(results[2].output.contains("A"));
        assert!(!results[2].output.contains("---"));
    }

    #[tokio::test]
    async fn dependent_order_is_array_order_not_topological() {
        let stub = Arc::new(KeywordCompete::default());
        let results = scheduler(stub.clone())
            .execute(
                &[
                    subtask(1, "Research", &[]),
                    subtask(2, "Synthesize", &[1, 3]),
                    subtask(3, "Review", &[1]),
                ],
                "goal",
            )
            .await;

        let order: Vec<u32> = results.iter().map(|r| r.id).collect();
        assert_eq!(order, vec![1, 2, 3]);
        // Subtask 3 had not run when subtask 2 was scheduled.
        let prompts = stub.prompts.lock().unwrap();
        assert!(prompts[1].contains("Current step: Synthesize"));
        assert!(!prompts[1].contains("Current step: Review"));
    }
}
