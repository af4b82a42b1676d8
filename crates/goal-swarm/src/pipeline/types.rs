//! Data model for one orchestration run.
//!
//! All wire-facing types serialize with camelCase field names.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::providers::Credentials;

/// One unit of decomposed work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    pub id: u32,
    pub title: String,
    pub description: String,
    pub dependencies: Vec<u32>,
}

impl Subtask {
    pub fn is_independent(&self) -> bool {
        self.dependencies.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtaskStatus {
    Success,
    Failed,
}

/// Outcome of one subtask. Created once by the scheduler, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtaskResult {
    pub id: u32,
    pub title: String,
    /// Generated text, or the error message when `status` is `Failed`.
    pub output: String,
    pub source_backend: String,
    pub latency_ms: u64,
    pub status: SubtaskStatus,
}

impl SubtaskResult {
    pub fn is_success(&self) -> bool {
        self.status == SubtaskStatus::Success
    }
}

/// Outputs of successfully completed subtasks, keyed by subtask id.
pub type CompletedOutputs = HashMap<u32, String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reflection {
    pub reflection: String,
    pub lessons: Vec<String>,
}

/// One prior turn of the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub role: String,
    pub content: String,
}

/// Inbound run request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    pub goal: String,
    #[serde(default)]
    pub history: Vec<HistoryMessage>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub credentials: Credentials,
}

impl RunRequest {
    pub fn new(goal: impl Into<String>) -> Self {
        Self {
            goal: goal.into(),
            ..Self::default()
        }
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub total_subtasks: usize,
    pub completed_subtasks: usize,
    pub total_time_ms: u64,
    pub decomposition: Vec<Subtask>,
}

/// Successful run response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResponse {
    pub output: String,
    pub summary: RunSummary,
    pub subtask_results: Vec<SubtaskResult>,
    pub lessons_learned: Vec<String>,
    pub reflection: String,
}

/// Body returned when a run aborts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailurePayload {
    pub error: String,
    pub message: String,
    pub fallback: bool,
}

impl FailurePayload {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: "processing failed".to_string(),
            message: message.into(),
            fallback: true,
        }
    }
}
