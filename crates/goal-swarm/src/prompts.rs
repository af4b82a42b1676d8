//! System instructions and prompt builders for each pipeline stage.
//!
//! Prompt versioning: bump `PROMPT_VERSION` whenever instruction content
//! changes so traces can be tied to the wording that produced them.

use crate::pipeline::types::{HistoryMessage, Subtask};

/// Prompt version. Bump on any instruction change.
pub const PROMPT_VERSION: &str = "1.2.0";

/// Number of trailing conversation turns carried into the decomposition prompt.
pub const HISTORY_TURNS: usize = 6;

pub const DECOMPOSER_SYSTEM: &str = "\
You are a planning engine. You break a goal into a short ordered list of \
subtasks that together accomplish it. You respond with a JSON array only, \
no prose and no markdown.";

pub const SUBTASK_SYSTEM: &str = "\
You are a focused expert completing one step of a larger plan. Answer the step \
directly and completely. Do not restate the goal or describe other steps.";

pub const SYNTHESIS_SYSTEM: &str = "\
You are a synthesis expert. You combine the results of earlier steps into one \
coherent, well-structured answer to the overall goal. Keep what is useful, \
resolve contradictions, and drop repetition.";

pub const REFLECTOR_SYSTEM: &str = "\
You review a partially failed multi-step run and suggest, in one or two \
sentences, how the plan could be improved next time.";

/// Decomposition request for `goal`, asking for exactly `max_subtasks` entries.
pub fn decomposition_prompt(goal: &str, history: &[HistoryMessage], max_subtasks: usize) -> String {
    let mut prompt = String::new();

    let recent = &history[history.len().saturating_sub(HISTORY_TURNS)..];
    if !recent.is_empty() {
        prompt.push_str("Conversation so far:\n");
        for turn in recent {
            prompt.push_str(&format!("{}: {}\n", turn.role, turn.content));
        }
        prompt.push('\n');
    }

    prompt.push_str(&format!(
        "Goal: {goal}\n\n\
         Break this goal into exactly {max_subtasks} subtasks. The last subtask must \
         synthesize the results of the earlier ones into the final answer.\n\n\
         Respond with a JSON array where each element has:\n\
         - \"id\": integer starting at 1\n\
         - \"title\": short name\n\
         - \"description\": what this subtask must produce\n\
         - \"dependencies\": array of ids this subtask needs (empty if none)\n\n\
         Example: [{{\"id\": 1, \"title\": \"Research\", \"description\": \"...\", \"dependencies\": []}}]"
    ));
    prompt
}

/// Prompt for a subtask with no dependencies.
pub fn subtask_prompt(goal: &str, subtask: &Subtask) -> String {
    format!(
        "Overall goal: {goal}\n\nCurrent step: {}\n{}\n\nComplete this step.",
        subtask.title, subtask.description
    )
}

/// Prompt for a dependent subtask, carrying the joined outputs of its
/// dependencies as context.
pub fn synthesis_prompt(goal: &str, subtask: &Subtask, context: &str) -> String {
    format!(
        "Overall goal: {goal}\n\nCurrent step: {}\n{}\n\n\
         Results from previous steps:\n{context}\n\n\
         Using these results, complete this step.",
        subtask.title, subtask.description
    )
}

/// Improvement-note request for a run with failed subtasks.
pub fn reflection_prompt(goal: &str, completed: usize, total: usize, failures: &[&str]) -> String {
    let mut prompt = format!(
        "Goal: {goal}\n{completed} of {total} subtasks succeeded.\n\nFailed subtasks:\n"
    );
    for title in failures {
        prompt.push_str(&format!("- {title}\n"));
    }
    prompt.push_str("\nIn at most two sentences, how could this plan be improved?");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step() -> Subtask {
        Subtask {
            id: 3,
            title: "Synthesize".into(),
            description: "Combine results".into(),
            dependencies: vec![1, 2],
        }
    }

    #[test]
    fn decomposition_prompt_names_count() {
        let prompt = decomposition_prompt("Ship it", &[], 5);
        assert!(prompt.contains("Goal: Ship it"));
        assert!(prompt.contains("exactly 5 subtasks"));
        assert!(!prompt.contains("Conversation so far"));
    }

    #[test]
    fn decomposition_prompt_keeps_only_recent_history() {
        let history: Vec<HistoryMessage> = (0..10)
            .map(|i| HistoryMessage {
                role: "user".into(),
                content: format!("turn-{i}"),
            })
            .collect();
        let prompt = decomposition_prompt("g", &history, 5);
        assert!(!prompt.contains("turn-3"));
        for i in 4..10 {
            assert!(prompt.contains(&format!("turn-{i}")));
        }
    }

    #[test]
    fn synthesis_prompt_embeds_context() {
        let prompt = synthesis_prompt("Launch", &step(), "A\n\n---\n\nB");
        assert!(prompt.contains("Launch"));
        assert!(prompt.contains("Synthesize"));
        assert!(prompt.contains("A\n\n---\n\nB"));
    }

    #[test]
    fn reflection_prompt_lists_failures() {
        let prompt = reflection_prompt("g", 1, 3, &["Draft", "Review"]);
        assert!(prompt.contains("1 of 3"));
        assert!(prompt.contains("- Draft\n"));
        assert!(prompt.contains("- Review\n"));
    }
}
