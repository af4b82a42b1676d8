//! Decomposer: one fast backend call turning a goal into a bounded subtask list.
//!
//! ```text
//! goal ──▶ fast backend (deadline) ──▶ extract [..] ──▶ parse ──▶ truncate to K
//!                 │                          │            │          │
//!                 └── timeout / error ───────┴── malformed┴──────────┴─▶ default plan
//! ```
//!
//! Parsing is lenient per entry; a response with no usable array, or with
//! repeated ids among the kept entries, falls back to [`default_plan`].

use std::collections::HashSet;
use std::time::Duration;

use coordination::{with_deadline, Raced, SharedBackend};
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::errors::OrchestrationError;
use super::types::{HistoryMessage, Subtask};
use crate::prompts;

/// Lenient wire shape for one decomposed entry.
#[derive(Debug, Deserialize)]
struct RawSubtask {
    #[serde(default)]
    id: Option<u32>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    dependencies: Vec<u32>,
}

pub struct Decomposer {
    backend: SharedBackend,
    max_subtasks: usize,
    deadline: Duration,
}

impl Decomposer {
    pub fn new(backend: SharedBackend, max_subtasks: usize, deadline: Duration) -> Self {
        Self {
            backend,
            max_subtasks,
            deadline,
        }
    }

    /// Decompose `goal`. Never fails: any problem yields the default plan.
    pub async fn decompose(&self, goal: &str, history: &[HistoryMessage]) -> Vec<Subtask> {
        let prompt = prompts::decomposition_prompt(goal, history, self.max_subtasks);
        let backend = self.backend.clone();
        let call = async move {
            backend
                .generate(&prompt, prompts::DECOMPOSER_SYSTEM)
                .await
        };

        let raw = match with_deadline(call, self.deadline).await {
            Raced::Finished(Ok(text)) => text,
            Raced::Finished(Err(e)) => {
                warn!(provider = e.provider(), error = %e, "decomposer call failed, using default plan");
                return default_plan();
            }
            Raced::TimedOut => {
                warn!(
                    provider = self.backend.name(),
                    deadline_ms = self.deadline.as_millis() as u64,
                    "decomposer call timed out, using default plan"
                );
                return default_plan();
            }
            Raced::Aborted(reason) => {
                warn!(reason = %reason, "decomposer call aborted, using default plan");
                return default_plan();
            }
        };

        match parse_subtasks(&raw, self.max_subtasks) {
            Ok(subtasks) => {
                info!(count = subtasks.len(), "goal decomposed");
                subtasks
            }
            Err(e) => {
                warn!(error = %e, "decomposition unusable, using default plan");
                debug!(raw = %raw, "raw decomposer output");
                default_plan()
            }
        }
    }
}

/// Three-step plan used whenever decomposition output is unusable.
pub fn default_plan() -> Vec<Subtask> {
    vec![
        Subtask {
            id: 1,
            title: "Analyze & Plan".to_string(),
            description: "Analyze the goal and outline an approach.".to_string(),
            dependencies: vec![],
        },
        Subtask {
            id: 2,
            title: "Execute".to_string(),
            description: "Carry out the core work the goal requires.".to_string(),
            dependencies: vec![],
        },
        Subtask {
            id: 3,
            title: "Synthesize".to_string(),
            description: "Combine the analysis and execution into a final answer.".to_string(),
            dependencies: vec![1, 2],
        },
    ]
}

/// Parse free-form backend output into at most `max` subtasks.
pub fn parse_subtasks(raw: &str, max: usize) -> Result<Vec<Subtask>, OrchestrationError> {
    let json = extract_json_array(raw).ok_or_else(|| {
        OrchestrationError::ParseFailure("no JSON array in response".to_string())
    })?;

    let entries: Vec<RawSubtask> = serde_json::from_str(json)
        .map_err(|e| OrchestrationError::ParseFailure(e.to_string()))?;

    if entries.is_empty() {
        return Err(OrchestrationError::ParseFailure(
            "decomposition array is empty".to_string(),
        ));
    }

    let subtasks: Vec<Subtask> = entries
        .into_iter()
        .take(max)
        .enumerate()
        .map(|(idx, raw)| {
            let position = idx as u32 + 1;
            Subtask {
                id: raw.id.unwrap_or(position),
                title: raw
                    .title
                    .filter(|t| !t.trim().is_empty())
                    .unwrap_or_else(|| format!("Subtask {position}")),
                description: raw.description.unwrap_or_default(),
                dependencies: raw.dependencies,
            }
        })
        .collect();

    // Ids must be unique: results and dependency context are keyed by id.
    let mut ids = HashSet::new();
    if let Some(dup) = subtasks.iter().find(|s| !ids.insert(s.id)) {
        return Err(OrchestrationError::ParseFailure(format!(
            "duplicate subtask id {}",
            dup.id
        )));
    }

    Ok(normalize_dependencies(subtasks))
}

/// Drop self-references, unknown ids and duplicates, keeping first-seen order.
fn normalize_dependencies(mut subtasks: Vec<Subtask>) -> Vec<Subtask> {
    let known: HashSet<u32> = subtasks.iter().map(|s| s.id).collect();
    for subtask in &mut subtasks {
        let mut seen = HashSet::new();
        let id = subtask.id;
        subtask
            .dependencies
            .retain(|dep| *dep != id && known.contains(dep) && seen.insert(*dep));
    }
    subtasks
}

/// First `[` through last `]`, after stripping markdown fences.
fn extract_json_array(raw: &str) -> Option<&str> {
    let stripped = raw
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let start = stripped.find('[')?;
    let end = stripped.rfind(']')?;
    (start < end).then(|| &stripped[start..=end])
}
