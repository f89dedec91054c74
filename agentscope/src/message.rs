//! Conversational message model: roles, typed content blocks, and metadata.
//!
//! A [`Msg`] is immutable and identity-bearing: the id is assigned at
//! construction and never changes. Content is an ordered list of
//! [`ContentBlock`]s (text, tool-use, tool-result, plus opaque media blocks).
//! Metadata carries reserved keys used by the auto-context memory
//! (`_compress_meta`, `_chat_usage`); everything else is caller-defined.
//!
//! **Interaction**: messages are appended to memories, threaded through
//! pipelines, and broadcast by `MsgHub`. Copies handed downstream must not be
//! mutated; all "modifiers" here consume `self` and return a new value.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata key holding compression bookkeeping (`offloaduuid`,
/// `compressed_current_round`).
pub const COMPRESS_META_KEY: &str = "_compress_meta";
/// Sub-key under [`COMPRESS_META_KEY`] pointing into the offload store.
pub const OFFLOAD_UUID_KEY: &str = "offloaduuid";
/// Sub-key under [`COMPRESS_META_KEY`] marking a synthetic assistant message
/// produced by current-round compression.
pub const COMPRESSED_CURRENT_ROUND_KEY: &str = "compressed_current_round";
/// Metadata key holding the token-usage record of the LLM call that produced
/// the message.
pub const CHAT_USAGE_KEY: &str = "_chat_usage";

/// Role of a message in the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MsgRole {
    System,
    User,
    Assistant,
    Tool,
}

impl MsgRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MsgRole::System => "system",
            MsgRole::User => "user",
            MsgRole::Assistant => "assistant",
            MsgRole::Tool => "tool",
        }
    }
}

impl fmt::Display for MsgRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token usage of one LLM call: input tokens, output tokens, wall time in seconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub time: f64,
}

/// Typed fragment of a message.
///
/// The serialization tag `type` is preserved on the wire so persistence
/// round-trips reconstruct the correct variant. Image and audio blocks are
/// opaque to this core: their payloads pass through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain text.
    Text { text: String },
    /// A tool invocation issued by an assistant; `id` pairs it with a later
    /// [`ContentBlock::ToolResult`].
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    /// The result of a tool invocation, matched to a ToolUse by `id`.
    /// Output is a sequence of text blocks.
    ToolResult {
        id: String,
        name: String,
        output: Vec<ContentBlock>,
    },
    /// Opaque image payload.
    Image { source: serde_json::Value },
    /// Opaque audio payload.
    Audio { source: serde_json::Value },
}

impl ContentBlock {
    /// Creates a text block.
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    /// Creates a tool-use block.
    pub fn tool_use(
        id: impl Into<String>,
        name: impl Into<String>,
        input: serde_json::Value,
    ) -> Self {
        ContentBlock::ToolUse {
            id: id.into(),
            name: name.into(),
            input,
        }
    }

    /// Creates a tool-result block whose output is a single text block.
    pub fn tool_result(
        id: impl Into<String>,
        name: impl Into<String>,
        output_text: impl Into<String>,
    ) -> Self {
        ContentBlock::ToolResult {
            id: id.into(),
            name: name.into(),
            output: vec![ContentBlock::text(output_text)],
        }
    }
}

/// An immutable conversational message.
///
/// Construct with the role shorthands ([`Msg::user`], [`Msg::assistant`],
/// [`Msg::system`]) for plain text, or [`Msg::new`] for block content.
/// Metadata modifiers consume `self` and return the updated message so shared
/// copies are never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Msg {
    id: String,
    role: MsgRole,
    name: String,
    content: Vec<ContentBlock>,
    #[serde(default)]
    metadata: serde_json::Map<String, serde_json::Value>,
}

impl Msg {
    /// Creates a message with an explicit block list. A fresh id is assigned.
    pub fn new(role: MsgRole, name: impl Into<String>, content: Vec<ContentBlock>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            name: name.into(),
            content,
            metadata: serde_json::Map::new(),
        }
    }

    /// Creates a plain-text USER message.
    pub fn user(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(MsgRole::User, name, vec![ContentBlock::text(text)])
    }

    /// Creates a plain-text ASSISTANT message.
    pub fn assistant(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(MsgRole::Assistant, name, vec![ContentBlock::text(text)])
    }

    /// Creates a plain-text SYSTEM message.
    pub fn system(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(MsgRole::System, name, vec![ContentBlock::text(text)])
    }

    /// Creates a TOOL message carrying one tool-result block.
    pub fn tool_result(
        name: impl Into<String>,
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        output_text: impl Into<String>,
    ) -> Self {
        Self::new(
            MsgRole::Tool,
            name,
            vec![ContentBlock::tool_result(call_id, tool_name, output_text)],
        )
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn role(&self) -> MsgRole {
        self.role
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content(&self) -> &[ContentBlock] {
        &self.content
    }

    pub fn metadata(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.metadata
    }

    /// Concatenated text of all text blocks, including tool-result output text.
    /// Used by compression strategies to measure payload size.
    pub fn text_content(&self) -> String {
        fn collect(blocks: &[ContentBlock], out: &mut String) {
            for block in blocks {
                match block {
                    ContentBlock::Text { text } => out.push_str(text),
                    ContentBlock::ToolResult { output, .. } => collect(output, out),
                    _ => {}
                }
            }
        }
        let mut out = String::new();
        collect(&self.content, &mut out);
        out
    }

    /// True if any block is a tool-use.
    pub fn has_tool_use(&self) -> bool {
        self.content
            .iter()
            .any(|b| matches!(b, ContentBlock::ToolUse { .. }))
    }

    /// True if any block is a tool-result.
    pub fn has_tool_result(&self) -> bool {
        self.content
            .iter()
            .any(|b| matches!(b, ContentBlock::ToolResult { .. }))
    }

    /// True if the message is tool-related (contains a tool-use or tool-result).
    pub fn is_tool_message(&self) -> bool {
        self.has_tool_use() || self.has_tool_result()
    }

    /// Ids of all tool-use blocks in this message.
    pub fn tool_use_ids(&self) -> Vec<&str> {
        self.content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::ToolUse { id, .. } => Some(id.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Ids of all tool-result blocks in this message.
    pub fn tool_result_ids(&self) -> Vec<&str> {
        self.content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::ToolResult { id, .. } => Some(id.as_str()),
                _ => None,
            })
            .collect()
    }

    /// A final assistant response: ASSISTANT role, no tool-use or tool-result
    /// blocks, and not a current-round compression artifact.
    pub fn is_final_assistant_response(&self) -> bool {
        self.role == MsgRole::Assistant
            && !self.has_tool_use()
            && !self.has_tool_result()
            && !self.is_compressed_current_round()
    }

    /// Sets a metadata entry, returning the updated message.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    fn compress_meta(&self) -> Option<&serde_json::Map<String, serde_json::Value>> {
        self.metadata.get(COMPRESS_META_KEY).and_then(|v| v.as_object())
    }

    fn with_compress_meta(mut self, key: &str, value: serde_json::Value) -> Self {
        let meta = self
            .metadata
            .entry(COMPRESS_META_KEY.to_string())
            .or_insert_with(|| serde_json::Value::Object(serde_json::Map::new()));
        if let Some(obj) = meta.as_object_mut() {
            obj.insert(key.to_string(), value);
        }
        self
    }

    /// The offload-store UUID embedded by a compression strategy, if any.
    pub fn offload_uuid(&self) -> Option<String> {
        self.compress_meta()
            .and_then(|m| m.get(OFFLOAD_UUID_KEY))
            .and_then(|v| v.as_str())
            .map(str::to_owned)
    }

    /// Marks this message as the compressed replacement of an offloaded range.
    pub fn with_offload_uuid(self, uuid: impl Into<String>) -> Self {
        self.with_compress_meta(OFFLOAD_UUID_KEY, serde_json::Value::String(uuid.into()))
    }

    /// True for synthetic assistant messages produced by current-round
    /// compression; such messages are never counted as final responses.
    pub fn is_compressed_current_round(&self) -> bool {
        self.compress_meta()
            .and_then(|m| m.get(COMPRESSED_CURRENT_ROUND_KEY))
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    /// Marks this message as a current-round compression artifact.
    pub fn mark_compressed_current_round(self) -> Self {
        self.with_compress_meta(COMPRESSED_CURRENT_ROUND_KEY, serde_json::Value::Bool(true))
    }

    /// Token-usage record attached to this message, if any.
    pub fn chat_usage(&self) -> Option<ChatUsage> {
        self.metadata
            .get(CHAT_USAGE_KEY)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Attaches a token-usage record.
    pub fn with_chat_usage(self, usage: &ChatUsage) -> Self {
        match serde_json::to_value(usage) {
            Ok(v) => self.with_metadata(CHAT_USAGE_KEY, v),
            Err(_) => self,
        }
    }
}
