//! Prompt assembly for the compression summarizer.
//!
//! Every LLM-backed strategy sends: an instruction message, the messages to
//! compress, the fixed end marker, an optional character budget (current-round
//! compression only), and — last, to exploit recency — an optional plan-aware
//! hint built from the attached plan notebook.

use crate::plan::{Plan, PlanState};

/// Display name used for messages synthesized by the compression engine.
pub const COMPRESSION_AGENT_NAME: &str = "auto_context";

/// Fixed marker terminating the message list inside a compression prompt.
pub const COMPRESSION_MESSAGE_LIST_END: &str =
    "Above is the message list that needs to be compressed.";

/// Default instruction for S1: previous-round tool-invocation compression.
pub const DEFAULT_PREVIOUS_ROUND_TOOL_PROMPT: &str = "\
You are compressing a sequence of tool invocations from an earlier part of the \
conversation. Produce a compact summary that preserves, for every call: the tool \
name, the arguments that matter, and the key points of its result. Keep full \
detail for calls that wrote or mutated state (file writes, updates, deletions, \
submissions); read-only calls may be aggregated. Do not invent calls that did \
not happen.";

/// Default instruction for S4: summarize previous conversation rounds.
pub const DEFAULT_PREVIOUS_ROUND_SUMMARY_PROMPT: &str = "\
Summarize the following conversation round into a short account of what was \
asked and what was concluded. Never mention tools or APIs. Preserve file paths, \
identifiers, error codes, and the outcome of any write operation verbatim.";

/// Default instruction for S5: summarize current-round large messages.
pub const DEFAULT_CURRENT_ROUND_LARGE_PROMPT: &str = "\
Condense the following oversized message while keeping every fact needed to \
continue the task: names, paths, identifiers, numbers, error text, and \
conclusions. Drop repetition and boilerplate.";

/// Default instruction for S6: compress the current-round tool run.
pub const DEFAULT_CURRENT_ROUND_COMPRESS_PROMPT: &str = "\
Compress the in-progress work below into a brief running account: what has been \
attempted, what succeeded, what failed, and what remains. Preserve tool names, \
arguments of write operations, file paths, and identifiers so the work can \
continue seamlessly.";

/// Caller-supplied prompt overrides; blank or absent fields fall back to the
/// defaults above.
#[derive(Debug, Clone, Default)]
pub struct CustomPrompts {
    pub previous_round_tool: Option<String>,
    pub previous_round_summary: Option<String>,
    pub current_round_large: Option<String>,
    pub current_round_compress: Option<String>,
}

impl CustomPrompts {
    pub(crate) fn resolve<'a>(custom: &'a Option<String>, default: &'a str) -> &'a str {
        match custom {
            Some(text) if !text.trim().is_empty() => text,
            _ => default,
        }
    }

    pub fn previous_round_tool(&self) -> &str {
        Self::resolve(&self.previous_round_tool, DEFAULT_PREVIOUS_ROUND_TOOL_PROMPT)
    }

    pub fn previous_round_summary(&self) -> &str {
        Self::resolve(
            &self.previous_round_summary,
            DEFAULT_PREVIOUS_ROUND_SUMMARY_PROMPT,
        )
    }

    pub fn current_round_large(&self) -> &str {
        Self::resolve(&self.current_round_large, DEFAULT_CURRENT_ROUND_LARGE_PROMPT)
    }

    pub fn current_round_compress(&self) -> &str {
        Self::resolve(
            &self.current_round_compress,
            DEFAULT_CURRENT_ROUND_COMPRESS_PROMPT,
        )
    }
}

/// Footer embedded in every compressed message so the model can retrieve the
/// originals through the `context_reload` tool.
pub fn offload_hint(uuid: &str) -> String {
    format!(
        "[The original content has been offloaded. working_context_offload_uuid: {uuid}. \
Call the `context_reload` tool with this uuid if you need the original messages.]"
    )
}

/// Character-budget requirement appended after the end marker for S6.
pub fn char_budget_requirement(target_chars: usize) -> String {
    format!(
        "Requirement: the compressed output must stay within approximately {target_chars} characters."
    )
}

/// Renders the plan-aware hint sent as the final prompt message when a plan
/// notebook with an active plan is attached.
pub fn plan_aware_hint(plan: &Plan) -> String {
    let mut body = String::new();
    body.push_str(&format!("Active plan: {} [{}]\n", plan.name, plan.state));
    body.push_str(&format!("Description: {}\n", plan.description));
    body.push_str(&format!("Expected outcome: {}\n", plan.expected_outcome));
    body.push_str("Subtasks:\n");
    for (i, subtask) in plan.subtasks.iter().enumerate() {
        let marker = match subtask.state {
            PlanState::InProgress => " <- current focus",
            PlanState::Done => " (done)",
            _ => "",
        };
        body.push_str(&format!(
            "  {}. [{}] {}{}\n",
            i + 1,
            subtask.state,
            subtask.name,
            marker
        ));
        if subtask.state == PlanState::Done {
            if let Some(outcome) = &subtask.outcome {
                body.push_str(&format!("     outcome: {}\n", outcome));
            }
        }
    }
    body.push_str(
        "When compressing, prioritize information aligned with this plan and preserve \
the context of the in-progress subtask.",
    );
    format!("<plan_aware_hint>\n{body}\n</plan_aware_hint>")
}
