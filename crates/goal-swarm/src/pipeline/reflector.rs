//! Reflector: closing note for a run.
//!
//! When every subtask succeeded the note is templated locally and no backend
//! is called. Otherwise one fast call asks for an improvement note.

use std::time::Duration;

use coordination::{with_deadline, Raced, SharedBackend, NO_PROVIDER};
use tracing::{debug, warn};

use super::types::{Reflection, SubtaskResult};
use crate::prompts;

pub const SUCCESS_LESSONS: [&str; 2] = [
    "Breaking the goal into focused subtasks kept each step tractable.",
    "Racing several providers produced timely answers for every step.",
];

pub const FAILURE_LESSONS: [&str; 2] = [
    "Retry failed subtasks once providers recover.",
    "Simplify the plan when subtasks repeatedly fail.",
];

pub const FALLBACK_REFLECTION: &str =
    "Some subtasks did not complete; retrying them or simplifying the plan may help.";

pub struct Reflector {
    backend: SharedBackend,
    deadline: Duration,
    max_chars: usize,
}

impl Reflector {
    pub fn new(backend: SharedBackend, deadline: Duration, max_chars: usize) -> Self {
        Self {
            backend,
            deadline,
            max_chars,
        }
    }

    pub async fn reflect(&self, goal: &str, results: &[SubtaskResult]) -> Reflection {
        if results.iter().all(SubtaskResult::is_success) {
            debug!("all subtasks succeeded, skipping reflection call");
            return Reflection {
                reflection: success_summary(results),
                lessons: SUCCESS_LESSONS.iter().map(|s| s.to_string()).collect(),
            };
        }

        let failures: Vec<&str> = results
            .iter()
            .filter(|r| !r.is_success())
            .map(|r| r.title.as_str())
            .collect();
        let completed = results.len() - failures.len();
        let prompt = prompts::reflection_prompt(goal, completed, results.len(), &failures);

        let backend = self.backend.clone();
        let call = async move { backend.generate(&prompt, prompts::REFLECTOR_SYSTEM).await };

        let reflection = match with_deadline(call, self.deadline).await {
            Raced::Finished(Ok(text)) => truncate_chars(text.trim(), self.max_chars),
            Raced::Finished(Err(e)) => {
                warn!(provider = e.provider(), error = %e, "reflection call failed");
                FALLBACK_REFLECTION.to_string()
            }
            Raced::TimedOut => {
                warn!(provider = self.backend.name(), "reflection call timed out");
                FALLBACK_REFLECTION.to_string()
            }
            Raced::Aborted(reason) => {
                warn!(reason = %reason, "reflection call aborted");
                FALLBACK_REFLECTION.to_string()
            }
        };

        Reflection {
            reflection,
            lessons: FAILURE_LESSONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// "Completed N subtasks using P1, P2." Providers in first-appearance order,
/// without the synthetic tag.
fn success_summary(results: &[SubtaskResult]) -> String {
    let mut providers: Vec<&str> = Vec::new();
    for result in results {
        let name = result.source_backend.as_str();
        if name != NO_PROVIDER && !providers.contains(&name) {
            providers.push(name);
        }
    }

    let noun = if results.len() == 1 { "subtask" } else { "subtasks" };
    if providers.is_empty() {
        format!("Completed {} {noun}.", results.len())
    } else {
        format!(
            "Completed {} {noun} using {}.",
            results.len(),
            providers.join(", ")
        )
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use async_trait::async_trait;
    use coordination::{ProviderError, TextBackend};
    use mockall::mock;

    use crate::pipeline::types::SubtaskStatus;

    mock! {
        pub Backend {}

        #[async_trait]
        impl TextBackend for Backend {
            fn name(&self) -> &str;
            async fn generate(&self, prompt: &str, system: &str) -> Result<String, ProviderError>;
        }
    }

    fn result(id: u32, provider: &str, status: SubtaskStatus) -> SubtaskResult {
        SubtaskResult {
            id,
            title: format!("step {id}"),
            output: "out".into(),
            source_backend: provider.into(),
            latency_ms: 1,
            status,
        }
    }

    fn reflector(mock: MockBackend) -> Reflector {
        Reflector::new(Arc::new(mock), Duration::from_secs(15), 200)
    }

    #[tokio::test]
    async fn all_success_never_calls_backend() {
        let mut mock = MockBackend::new();
        mock.expect_generate().times(0);
        mock.expect_name().return_const("groq".to_string());

        let results = vec![
            result(1, "openai", SubtaskStatus::Success),
            result(2, "anthropic", SubtaskStatus::Success),
            result(3, "openai", SubtaskStatus::Success),
        ];
        let reflection = reflector(mock).reflect("goal", &results).await;

        assert_eq!(
            reflection.reflection,
            "Completed 3 subtasks using openai, anthropic."
        );
        assert_eq!(reflection.lessons.len(), 2);
    }

    #[test]
    fn synthetic_provider_is_excluded_from_summary() {
        let results = vec![
            result(1, "none", SubtaskStatus::Success),
            result(2, "gemini", SubtaskStatus::Success),
        ];
        assert_eq!(success_summary(&results), "Completed 2 subtasks using gemini.");
        assert_eq!(
            success_summary(&[result(1, "none", SubtaskStatus::Success)]),
            "Completed 1 subtask."
        );
    }

    #[tokio::test]
    async fn failure_path_truncates_note() {
        let mut mock = MockBackend::new();
        mock.expect_name().return_const("groq".to_string());
        mock.expect_generate()
            .times(1)
            .withf(|prompt, _| prompt.contains("1 of 2") && prompt.contains("- step 2"))
            .returning(|_, _| Ok("é".repeat(500)));

        let results = vec![
            result(1, "openai", SubtaskStatus::Success),
            result(2, "none", SubtaskStatus::Failed),
        ];
        let reflection = reflector(mock).reflect("goal", &results).await;

        assert_eq!(reflection.reflection.chars().count(), 200);
        assert_eq!(
            reflection.lessons,
            FAILURE_LESSONS.iter().map(|s| s.to_string()).collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn failure_path_falls_back_on_provider_error() {
        let mut mock = MockBackend::new();
        mock.expect_name().return_const("groq".to_string());
        mock.expect_generate()
            .times(1)
            .returning(|_, _| Err(ProviderError::missing_content("groq")));

        let results = vec![result(1, "none", SubtaskStatus::Failed)];
        let reflection = reflector(mock).reflect("goal", &results).await;
        assert_eq!(reflection.reflection, FALLBACK_REFLECTION);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("hi", 200), "hi");
    }
}
