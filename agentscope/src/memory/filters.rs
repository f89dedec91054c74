//! Message-list filters used when assembling compression prompts.

use std::collections::HashSet;

use once_cell::sync::Lazy;

use crate::message::{Msg, MsgRole};

/// Tool names belonging to the plan notebook; their call/result churn distracts
/// the summarizer and is filtered out of compression prompts.
static PLAN_TOOL_NAMES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "create_plan",
        "update_plan_info",
        "revise_current_plan",
        "update_subtask_state",
        "finish_subtask",
        "view_subtasks",
        "get_subtask_count",
        "finish_plan",
        "view_historical_plans",
        "recover_historical_plan",
    ])
});

/// Removes assistant messages whose every tool-use targets a plan tool, plus
/// the TOOL messages answering those calls.
///
/// Assistant messages without tool-use blocks are kept; a message mixing plan
/// and non-plan calls is kept as well (only pure plan churn is dropped).
pub fn filter_plan_related_tool_calls(msgs: &[Msg]) -> Vec<Msg> {
    let mut removed_call_ids: HashSet<String> = HashSet::new();
    let mut kept: Vec<&Msg> = Vec::with_capacity(msgs.len());

    for msg in msgs {
        if msg.role() == MsgRole::Assistant && msg.has_tool_use() {
            let all_plan = msg
                .content()
                .iter()
                .filter_map(|b| match b {
                    crate::message::ContentBlock::ToolUse { name, .. } => Some(name.as_str()),
                    _ => None,
                })
                .all(|name| PLAN_TOOL_NAMES.contains(name));
            if all_plan {
                for id in msg.tool_use_ids() {
                    removed_call_ids.insert(id.to_string());
                }
                continue;
            }
        }
        kept.push(msg);
    }

    kept.into_iter()
        .filter(|msg| {
            if msg.role() != MsgRole::Tool {
                return true;
            }
            let result_ids = msg.tool_result_ids();
            if result_ids.is_empty() {
                return true;
            }
            !result_ids.iter().any(|id| removed_call_ids.contains(*id))
        })
        .cloned()
        .collect()
}
