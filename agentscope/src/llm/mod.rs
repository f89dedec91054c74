//! LLM client abstraction used by agents and the auto-context summarizer.
//!
//! The memory engine drives compression through the same model the agent
//! reasons with: it builds a prompt message list and calls
//! [`LlmClient::invoke`]. Streaming transports fold their chunk sequence into
//! one final [`LlmResponse`]; the default [`LlmClient::invoke_stream`] emits
//! the whole content as a single chunk.

mod mock;

pub use mock::MockLlm;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::AgentError;
use crate::message::{ChatUsage, Msg};

/// One streamed fragment of assistant output.
#[derive(Debug, Clone)]
pub struct MessageChunk {
    pub content: String,
}

/// Response from one LLM completion.
///
/// **Interaction**: returned by [`LlmClient::invoke`]; the auto-context memory
/// uses `content` as the compression summary and may attach `usage` to the
/// produced message as `_chat_usage` metadata.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// Assistant output text.
    pub content: String,
    /// Token usage of this call, when the transport reports it.
    pub usage: Option<ChatUsage>,
}

/// LLM client: given a message list, returns the assistant's reply.
///
/// Implementations wrap a transport adapter (out of scope here) or a mock.
/// The auto-context memory treats any `Err` as "strategy did not apply" and
/// moves on; it never unwinds the compression pass on model failure.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Invokes one completion over the given messages.
    async fn invoke(&self, messages: &[Msg]) -> Result<LlmResponse, AgentError>;

    /// Streaming variant: when `chunk_tx` is set, implementations send content
    /// fragments as they arrive and still return the folded final response.
    ///
    /// Default implementation calls [`LlmClient::invoke`] and sends the full
    /// content as one chunk.
    async fn invoke_stream(
        &self,
        messages: &[Msg],
        chunk_tx: Option<mpsc::Sender<MessageChunk>>,
    ) -> Result<LlmResponse, AgentError> {
        let response = self.invoke(messages).await?;
        if let Some(tx) = chunk_tx {
            if !response.content.is_empty() {
                let _ = tx
                    .send(MessageChunk {
                        content: response.content.clone(),
                    })
                    .await;
            }
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubLlm {
        content: String,
    }

    #[async_trait]
    impl LlmClient for StubLlm {
        async fn invoke(&self, _messages: &[Msg]) -> Result<LlmResponse, AgentError> {
            Ok(LlmResponse {
                content: self.content.clone(),
                usage: None,
            })
        }
    }

    #[tokio::test]
    async fn default_invoke_stream_sends_single_chunk() {
        let llm = StubLlm {
            content: "hello".to_string(),
        };
        let (tx, mut rx) = mpsc::channel(2);
        let resp = llm.invoke_stream(&[], Some(tx)).await.unwrap();
        assert_eq!(resp.content, "hello");
        let chunk = rx.recv().await.expect("one chunk");
        assert_eq!(chunk.content, "hello");
    }

    #[tokio::test]
    async fn default_invoke_stream_skips_chunk_for_empty_content() {
        let llm = StubLlm {
            content: String::new(),
        };
        let (tx, mut rx) = mpsc::channel(2);
        let resp = llm.invoke_stream(&[], Some(tx)).await.unwrap();
        assert!(resp.content.is_empty());
        assert!(rx.try_recv().is_err());
    }
}
