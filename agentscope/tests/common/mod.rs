//! Shared fixtures for integration tests: LLM-backed agents, a slow agent for
//! cancellation tests, and a prompt-recording LLM.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use agentscope::{
    Agent, AgentError, AgentRef, InMemoryMemory, LlmClient, LlmResponse, Memory, MockLlm, Msg,
    SubscriberRegistry,
};

/// Agent that reasons with a [`MockLlm`]: appends the input to its memory,
/// invokes the model over the whole context, records and broadcasts the reply.
pub struct LlmAgent {
    name: String,
    id: String,
    llm: Arc<MockLlm>,
    memory: Arc<dyn Memory>,
    subscribers: SubscriberRegistry,
}

impl LlmAgent {
    pub fn new(name: &str, llm: Arc<MockLlm>) -> Arc<Self> {
        Self::with_memory(name, llm, Arc::new(InMemoryMemory::new()))
    }

    pub fn with_memory(name: &str, llm: Arc<MockLlm>, memory: Arc<dyn Memory>) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            id: uuid::Uuid::new_v4().to_string(),
            llm,
            memory,
            subscribers: SubscriberRegistry::new(),
        })
    }

    pub fn llm(&self) -> &MockLlm {
        &self.llm
    }

    pub async fn memory_len(&self) -> usize {
        self.memory.size().await
    }

    pub async fn memory_messages(&self) -> Vec<Msg> {
        self.memory.messages().await.expect("memory snapshot")
    }
}

#[async_trait]
impl Agent for LlmAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn subscribers(&self) -> &SubscriberRegistry {
        &self.subscribers
    }

    async fn call(&self, input: Option<Msg>) -> Result<Msg, AgentError> {
        if let Some(input) = input {
            self.memory.add(input).await?;
        }
        let context = self.memory.messages().await?;
        let response = self.llm.invoke(&context).await?;
        let reply = Msg::assistant(self.name.clone(), response.content);
        self.memory.add(reply.clone()).await?;
        self.subscribers.broadcast(&reply).await?;
        Ok(reply)
    }

    async fn observe(&self, msg: Msg) -> Result<(), AgentError> {
        self.memory.add(msg).await
    }
}

/// Agent that sleeps before answering; used for cancellation and
/// virtual-time scheduling tests.
pub struct SlowAgent {
    name: String,
    id: String,
    delay: Duration,
    subscribers: SubscriberRegistry,
}

impl SlowAgent {
    pub fn new(name: &str, delay: Duration) -> AgentRef {
        Arc::new(Self {
            name: name.to_string(),
            id: uuid::Uuid::new_v4().to_string(),
            delay,
            subscribers: SubscriberRegistry::new(),
        })
    }
}

#[async_trait]
impl Agent for SlowAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn subscribers(&self) -> &SubscriberRegistry {
        &self.subscribers
    }

    async fn call(&self, _input: Option<Msg>) -> Result<Msg, AgentError> {
        tokio::time::sleep(self.delay).await;
        Ok(Msg::assistant(self.name.clone(), "done"))
    }

    async fn observe(&self, _msg: Msg) -> Result<(), AgentError> {
        Ok(())
    }
}

/// LLM that records every prompt it receives and answers with a fixed reply.
pub struct RecordingLlm {
    reply: String,
    prompts: Mutex<Vec<Vec<Msg>>>,
}

impl RecordingLlm {
    pub fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn prompts(&self) -> Vec<Vec<Msg>> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for RecordingLlm {
    async fn invoke(&self, messages: &[Msg]) -> Result<LlmResponse, AgentError> {
        self.prompts.lock().unwrap().push(messages.to_vec());
        Ok(LlmResponse {
            content: self.reply.clone(),
            usage: None,
        })
    }
}
