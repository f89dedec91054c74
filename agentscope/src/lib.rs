//! # AgentScope core
//!
//! The systems core of a multi-agent LLM framework: pipeline execution,
//! a multi-agent message hub, and an auto-context memory that keeps a rolling
//! conversation under message and token budgets.
//!
//! ## Design principles
//!
//! - **Agents as handles**: pipelines and hubs depend only on the narrow
//!   [`Agent`] capability trait and hold agents via [`AgentRef`]; subscriber
//!   sets live inside each agent, indexed by hub name, and hold weak handles
//!   so mutual subscriptions never leak.
//! - **Builders copy state**: every configurable component ([`SequentialPipeline`],
//!   [`FanoutPipeline`], [`MsgHub`], [`AutoContextMemory`]) is built from a
//!   builder whose later mutations cannot affect already-built objects.
//! - **Compression never loses data**: originals are moved into the
//!   [`OffloadStore`] before the working store changes, and the `context_reload`
//!   tool ([`ContextReloadTool`]) brings them back on demand.
//!
//! ## Main modules
//!
//! - [`message`]: [`Msg`], [`MsgRole`], [`ContentBlock`], [`ChatUsage`].
//! - [`agent`]: the [`Agent`] capability trait and [`SubscriberRegistry`].
//! - [`pipeline`]: [`SequentialPipeline`], [`FanoutPipeline`], [`Scheduler`]
//!   with [`TokioScheduler`] and [`ImmediateScheduler`].
//! - [`hub`]: [`MsgHub`] and the scoped runner [`with_msg_hub`].
//! - [`memory`]: [`Memory`], [`InMemoryMemory`], [`AutoContextMemory`] with its
//!   six-strategy compression pipeline, [`OffloadStore`], [`CompressionEvent`].
//! - [`plan`]: [`PlanNotebook`] read/write surface with the ordered subtask
//!   state machine.
//! - [`llm`]: [`LlmClient`] trait, [`MockLlm`].
//! - [`session`]: [`SessionStore`] persistence collaborator.
//! - [`tools`]: the [`ContextReloadTool`].
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use agentscope::{AutoContextConfig, AutoContextMemory, MockLlm, Msg};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let memory = AutoContextMemory::builder()
//!     .llm(Arc::new(MockLlm::with_reply("compressed summary")))
//!     .config(AutoContextConfig { msg_threshold: 20, ..Default::default() })
//!     .build()
//!     .unwrap();
//! memory.add_message(Msg::user("user", "hello")).await;
//! let context = memory.get_messages().await; // compresses when over budget
//! # let _ = context;
//! # }
//! ```

pub mod agent;
pub mod error;
pub mod hub;
pub mod llm;
pub mod memory;
pub mod message;
pub mod pipeline;
pub mod plan;
pub mod session;
pub mod token;
pub mod tools;

pub use agent::{Agent, AgentRef, SubscriberRegistry};
pub use error::{AgentError, CompositeAgentError, PlanError, SessionError};
pub use hub::{with_msg_hub, MsgHub, MsgHubBuilder};
pub use llm::{LlmClient, LlmResponse, MessageChunk, MockLlm};
pub use memory::{
    filter_plan_related_tool_calls, AutoContextConfig, AutoContextMemory, AutoContextMemoryBuilder,
    CompressionEvent, CompressionEventLog, CompressionEventType, InMemoryMemory, Memory,
    OffloadStore, OFFLOAD_CONTEXT_SUB_KEY, ORIGINAL_MESSAGES_SUB_KEY, WORKING_MESSAGES_SUB_KEY,
};
pub use message::{ChatUsage, ContentBlock, Msg, MsgRole};
pub use pipeline::{
    FanoutPipeline, FanoutPipelineBuilder, ImmediateScheduler, ScheduledTask, Scheduler,
    SequentialPipeline, SequentialPipelineBuilder, TokioScheduler,
};
pub use plan::{Plan, PlanNotebook, PlanState, ReviseAction, SubTask};
pub use session::{InMemorySession, SessionStore};
pub use tools::{ContextReloadTool, TOOL_CONTEXT_RELOAD, WORKING_CONTEXT_OFFLOAD_UUID_PARAM};
