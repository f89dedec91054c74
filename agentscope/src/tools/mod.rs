//! Tools shipped by the core for LLM use.
//!
//! Only one: `context_reload`, which retrieves originals that compression
//! moved into the offload store. Errors never cross the tool boundary; they
//! come back as a single text message.

use std::sync::Arc;

use serde_json::json;

use crate::memory::OffloadStore;
use crate::message::{Msg, MsgRole};

/// Tool name the offload hint points the model at.
pub const TOOL_CONTEXT_RELOAD: &str = "context_reload";
/// Input field carrying the offload UUID.
pub const WORKING_CONTEXT_OFFLOAD_UUID_PARAM: &str = "working_context_offload_uuid";

/// Reloads offloaded originals by UUID.
///
/// Bound to a specific memory's offload store at construction
/// (see `AutoContextMemory::offload_store`); there is no global registry.
pub struct ContextReloadTool {
    offload: Arc<OffloadStore>,
}

impl ContextReloadTool {
    pub fn new(offload: Arc<OffloadStore>) -> Self {
        Self { offload }
    }

    pub fn name(&self) -> &'static str {
        TOOL_CONTEXT_RELOAD
    }

    /// JSON description of the tool for registration with an LLM transport.
    pub fn spec(&self) -> serde_json::Value {
        json!({
            "name": TOOL_CONTEXT_RELOAD,
            "description": "Reload conversation content that was offloaded during context compression.",
            "parameters": {
                "type": "object",
                "properties": {
                    WORKING_CONTEXT_OFFLOAD_UUID_PARAM: {
                        "type": "string",
                        "description": "The working_context_offload_uuid embedded in a compressed message."
                    }
                },
                "required": [WORKING_CONTEXT_OFFLOAD_UUID_PARAM]
            }
        })
    }

    /// Looks up the UUID named in `input` and returns the offloaded messages.
    /// Every failure mode yields a single text message instead of an error.
    pub fn call(&self, input: &serde_json::Value) -> Vec<Msg> {
        let uuid = input
            .get(WORKING_CONTEXT_OFFLOAD_UUID_PARAM)
            .and_then(|v| v.as_str())
            .unwrap_or("");
        if uuid.is_empty() {
            return vec![error_msg(format!(
                "context_reload requires a non-empty {WORKING_CONTEXT_OFFLOAD_UUID_PARAM}"
            ))];
        }
        if !self.offload.contains(uuid) {
            return vec![error_msg(format!(
                "no offloaded context found for {WORKING_CONTEXT_OFFLOAD_UUID_PARAM}: {uuid}"
            ))];
        }
        self.offload.get(uuid)
    }
}

fn error_msg(text: String) -> Msg {
    Msg::new(
        MsgRole::Tool,
        TOOL_CONTEXT_RELOAD,
        vec![crate::message::ContentBlock::text(text)],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool_with_entry() -> ContextReloadTool {
        let store = Arc::new(OffloadStore::new());
        store.insert(
            "u-1",
            vec![Msg::user("u", "original one"), Msg::assistant("a", "original two")],
        );
        ContextReloadTool::new(store)
    }

    #[test]
    fn reloads_offloaded_messages_by_uuid() {
        let tool = tool_with_entry();
        let out = tool.call(&json!({ WORKING_CONTEXT_OFFLOAD_UUID_PARAM: "u-1" }));
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].text_content(), "original one");
    }

    #[test]
    fn missing_uuid_yields_single_error_message() {
        let tool = tool_with_entry();
        let out = tool.call(&json!({}));
        assert_eq!(out.len(), 1);
        assert!(out[0].text_content().contains("non-empty"));

        let out = tool.call(&json!({ WORKING_CONTEXT_OFFLOAD_UUID_PARAM: "" }));
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn unknown_uuid_yields_single_error_message() {
        let tool = tool_with_entry();
        let out = tool.call(&json!({ WORKING_CONTEXT_OFFLOAD_UUID_PARAM: "nope" }));
        assert_eq!(out.len(), 1);
        assert!(out[0].text_content().contains("nope"));
    }

    #[test]
    fn spec_names_the_tool_and_required_param() {
        let tool = tool_with_entry();
        let spec = tool.spec();
        assert_eq!(spec["name"], TOOL_CONTEXT_RELOAD);
        assert_eq!(spec["parameters"]["required"][0], WORKING_CONTEXT_OFFLOAD_UUID_PARAM);
    }
}
