//! Append-only record of compression actions, for observability and tests.

use std::fmt;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which compression strategy produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompressionEventType {
    /// S1: previous-round tool-invocation compression.
    ToolInvocationCompress,
    /// S2: large-payload offload with tail protection.
    LargePayloadOffload,
    /// S3: large-payload offload without tail protection.
    LargePayloadOffloadUnprotected,
    /// S4: previous conversation rounds summarized.
    PreviousRoundSummary,
    /// S5: current-round large messages summarized.
    CurrentRoundLargeMessageCompress,
    /// S6: current-round tool run compressed into a synthetic assistant message.
    CurrentRoundMessageCompress,
}

impl CompressionEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompressionEventType::ToolInvocationCompress => "TOOL_INVOCATION_COMPRESS",
            CompressionEventType::LargePayloadOffload => "LARGE_PAYLOAD_OFFLOAD",
            CompressionEventType::LargePayloadOffloadUnprotected => {
                "LARGE_PAYLOAD_OFFLOAD_UNPROTECTED"
            }
            CompressionEventType::PreviousRoundSummary => "PREVIOUS_ROUND_SUMMARY",
            CompressionEventType::CurrentRoundLargeMessageCompress => {
                "CURRENT_ROUND_LARGE_MESSAGE_COMPRESS"
            }
            CompressionEventType::CurrentRoundMessageCompress => "CURRENT_ROUND_MESSAGE_COMPRESS",
        }
    }
}

impl fmt::Display for CompressionEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One compression action on the working store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionEvent {
    pub event_type: CompressionEventType,
    pub timestamp: DateTime<Utc>,
    /// Number of working-store messages replaced by this action.
    pub compressed_message_count: usize,
    /// Id of the message immediately before the replaced range, if any.
    pub previous_message_id: Option<String>,
    /// Id of the message immediately after the replaced range, if any.
    pub next_message_id: Option<String>,
    /// Id of the replacement message.
    pub compressed_message_id: Option<String>,
    /// Strategy-specific details (e.g. the offload UUID).
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl CompressionEvent {
    pub fn new(event_type: CompressionEventType, compressed_message_count: usize) -> Self {
        Self {
            event_type,
            timestamp: Utc::now(),
            compressed_message_count,
            previous_message_id: None,
            next_message_id: None,
            compressed_message_id: None,
            metadata: serde_json::Map::new(),
        }
    }

    pub fn with_neighbors(
        mut self,
        previous_message_id: Option<String>,
        next_message_id: Option<String>,
    ) -> Self {
        self.previous_message_id = previous_message_id;
        self.next_message_id = next_message_id;
        self
    }

    pub fn with_compressed_message_id(mut self, id: impl Into<String>) -> Self {
        self.compressed_message_id = Some(id.into());
        self
    }

    pub fn with_offload_uuid(mut self, uuid: &str) -> Self {
        self.metadata.insert(
            "offload_uuid".to_string(),
            serde_json::Value::String(uuid.to_string()),
        );
        self
    }
}

/// Append-only event log.
#[derive(Default)]
pub struct CompressionEventLog {
    events: Mutex<Vec<CompressionEvent>>,
}

impl CompressionEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: CompressionEvent) {
        tracing::debug!(
            event = %event.event_type,
            count = event.compressed_message_count,
            "compression event"
        );
        self.events.lock().expect("event log lock").push(event);
    }

    pub fn snapshot(&self) -> Vec<CompressionEvent> {
        self.events.lock().expect("event log lock").clone()
    }

    pub fn clear(&self) {
        self.events.lock().expect("event log lock").clear();
    }
}
