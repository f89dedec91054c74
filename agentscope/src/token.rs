//! Deterministic character-based token estimation for messages.
//!
//! Used only by the auto-context memory to decide whether the working store
//! crossed its token budget; this is not a billing counter. The calibration is
//! language-agnostic: a flat characters-per-token ratio plus fixed per-message
//! and per-block overheads.

use crate::message::{ContentBlock, Msg};

/// Calibrated characters-per-token ratio.
pub const CHARS_PER_TOKEN: f64 = 2.5;

/// Fixed per-message overhead (role/name framing, separators).
const MESSAGE_OVERHEAD: u64 = 5;
/// Fixed overhead of a tool-use block (ids, framing, argument syntax).
const TOOL_USE_OVERHEAD: u64 = 10;
/// Fixed overhead of a tool-result block.
const TOOL_RESULT_OVERHEAD: u64 = 8;

/// Estimated tokens of a piece of text: `ceil(chars / CHARS_PER_TOKEN)`.
pub fn estimate_text(text: &str) -> u64 {
    let chars = text.chars().count() as u64;
    // ceil(chars / 2.5) computed in integers: ceil(2 * chars / 5).
    (chars * 2 + 4) / 5
}

/// Estimated tokens of one content block.
pub fn estimate_block(block: &ContentBlock) -> u64 {
    match block {
        ContentBlock::Text { text } => estimate_text(text),
        ContentBlock::ToolUse { id, name, input } => {
            let input_json = serde_json::to_string(input).unwrap_or_default();
            TOOL_USE_OVERHEAD + estimate_text(name) + estimate_text(id) + estimate_text(&input_json)
        }
        ContentBlock::ToolResult { id, name, output } => {
            TOOL_RESULT_OVERHEAD
                + estimate_text(name)
                + estimate_text(id)
                + output.iter().map(estimate_block).sum::<u64>()
        }
        ContentBlock::Image { source } | ContentBlock::Audio { source } => {
            let source_json = serde_json::to_string(source).unwrap_or_default();
            estimate_text(&source_json)
        }
    }
}

/// Estimated tokens of one message: fixed overhead plus role, name, and blocks.
pub fn estimate_message(msg: &Msg) -> u64 {
    MESSAGE_OVERHEAD
        + estimate_text(msg.role().as_str())
        + estimate_text(msg.name())
        + msg.content().iter().map(estimate_block).sum::<u64>()
}

/// Estimated tokens of a message sequence.
pub fn estimate_messages(msgs: &[Msg]) -> u64 {
    msgs.iter().map(estimate_message).sum()
}
