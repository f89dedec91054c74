//! Agent memories: a plain in-memory store and the auto-context compression
//! engine.
//!
//! [`Memory`] is the narrow surface agents use to record conversation
//! history. [`InMemoryMemory`] appends and snapshots; [`AutoContextMemory`]
//! additionally keeps the LLM's rolling context under message and token
//! budgets by running the six-strategy compression pipeline.

mod auto_context;
mod events;
mod filters;
mod offload;
pub mod prompts;

pub use auto_context::{
    AutoContextConfig, AutoContextMemory, AutoContextMemoryBuilder, OFFLOAD_CONTEXT_SUB_KEY,
    ORIGINAL_MESSAGES_SUB_KEY, WORKING_MESSAGES_SUB_KEY,
};
pub use events::{CompressionEvent, CompressionEventLog, CompressionEventType};
pub use filters::filter_plan_related_tool_calls;
pub use offload::OffloadStore;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::AgentError;
use crate::message::Msg;

/// Conversation memory owned by one agent.
#[async_trait]
pub trait Memory: Send + Sync {
    /// Appends one message.
    async fn add(&self, msg: Msg) -> Result<(), AgentError>;

    /// Snapshot of the messages the agent should reason over. For
    /// [`AutoContextMemory`] this triggers compression first when a threshold
    /// is reached.
    async fn messages(&self) -> Result<Vec<Msg>, AgentError>;

    /// Number of messages currently visible.
    async fn size(&self) -> usize;

    /// Deletes the message at `index`; returns false when out of range.
    async fn delete(&self, index: usize) -> Result<bool, AgentError>;

    /// Removes all messages.
    async fn clear(&self) -> Result<(), AgentError>;
}

/// Plain ordered message store. Not persistent, no compression.
#[derive(Default)]
pub struct InMemoryMemory {
    messages: Mutex<Vec<Msg>>,
}

impl InMemoryMemory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Memory for InMemoryMemory {
    async fn add(&self, msg: Msg) -> Result<(), AgentError> {
        self.messages.lock().await.push(msg);
        Ok(())
    }

    async fn messages(&self) -> Result<Vec<Msg>, AgentError> {
        Ok(self.messages.lock().await.clone())
    }

    async fn size(&self) -> usize {
        self.messages.lock().await.len()
    }

    async fn delete(&self, index: usize) -> Result<bool, AgentError> {
        let mut messages = self.messages.lock().await;
        if index < messages.len() {
            messages.remove(index);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn clear(&self) -> Result<(), AgentError> {
        self.messages.lock().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_memory_appends_in_order() {
        let memory = InMemoryMemory::new();
        memory.add(Msg::user("u", "one")).await.unwrap();
        memory.add(Msg::assistant("a", "two")).await.unwrap();
        let msgs = memory.messages().await.unwrap();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].text_content(), "one");
        assert_eq!(memory.size().await, 2);
    }

    #[tokio::test]
    async fn delete_and_clear() {
        let memory = InMemoryMemory::new();
        memory.add(Msg::user("u", "one")).await.unwrap();
        memory.add(Msg::user("u", "two")).await.unwrap();
        assert!(memory.delete(0).await.unwrap());
        assert!(!memory.delete(5).await.unwrap());
        assert_eq!(memory.messages().await.unwrap()[0].text_content(), "two");
        memory.clear().await.unwrap();
        assert_eq!(memory.size().await, 0);
    }
}
