//! Mock LLM for tests and demos: fixed or scripted replies, optional failure,
//! and a call counter so tests can assert invocation counts.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::AgentError;
use crate::llm::{LlmClient, LlmResponse};
use crate::message::Msg;

/// Mock LLM client.
///
/// - [`MockLlm::with_reply`]: always returns the same content.
/// - [`MockLlm::with_replies`]: returns scripted replies in order, then repeats
///   the last one.
/// - [`MockLlm::failing`]: every call fails with `AgentError::ModelFailed`.
///
/// `call_count` counts every invocation, including failing ones.
pub struct MockLlm {
    scripted: Mutex<VecDeque<String>>,
    fallback: String,
    failure: Option<String>,
    calls: AtomicUsize,
}

impl MockLlm {
    /// A mock that always returns `reply`.
    pub fn with_reply(reply: impl Into<String>) -> Self {
        Self {
            scripted: Mutex::new(VecDeque::new()),
            fallback: reply.into(),
            failure: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// A mock that returns `replies` in order; once exhausted, it keeps
    /// returning the last entry.
    pub fn with_replies(replies: Vec<String>) -> Self {
        let fallback = replies.last().cloned().unwrap_or_default();
        Self {
            scripted: Mutex::new(replies.into()),
            fallback,
            failure: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// A mock whose every call fails with the given message.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            scripted: Mutex::new(VecDeque::new()),
            fallback: String::new(),
            failure: Some(message.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of `invoke` calls so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn invoke(&self, _messages: &[Msg]) -> Result<LlmResponse, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.failure {
            return Err(AgentError::ModelFailed(message.clone()));
        }
        let content = {
            let mut scripted = self.scripted.lock().expect("mock llm lock");
            scripted.pop_front().unwrap_or_else(|| self.fallback.clone())
        };
        Ok(LlmResponse {
            content,
            usage: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn with_reply_returns_fixed_content_and_counts_calls() {
        let llm = MockLlm::with_reply("fixed");
        assert_eq!(llm.call_count(), 0);
        let out = llm.invoke(&[]).await.unwrap();
        assert_eq!(out.content, "fixed");
        let out = llm.invoke(&[Msg::user("u", "again")]).await.unwrap();
        assert_eq!(out.content, "fixed");
        assert_eq!(llm.call_count(), 2);
    }

    #[tokio::test]
    async fn with_replies_plays_script_then_repeats_last() {
        let llm = MockLlm::with_replies(vec!["one".into(), "two".into()]);
        assert_eq!(llm.invoke(&[]).await.unwrap().content, "one");
        assert_eq!(llm.invoke(&[]).await.unwrap().content, "two");
        assert_eq!(llm.invoke(&[]).await.unwrap().content, "two");
    }

    #[tokio::test]
    async fn failing_returns_model_failed_and_counts_the_call() {
        let llm = MockLlm::failing("boom");
        let err = llm.invoke(&[]).await.unwrap_err();
        assert!(matches!(err, AgentError::ModelFailed(_)));
        assert!(err.to_string().contains("boom"));
        assert_eq!(llm.call_count(), 1);
    }
}
