//! Error types for agents, pipelines, plans, and session persistence.
//!
//! `AgentError` is the single error surfaced by `Agent::call`, pipelines, and the
//! auto-context memory. Fan-out pipelines aggregate per-agent failures into
//! `CompositeAgentError`; sequential pipelines propagate the first cause verbatim.

use std::fmt;

use thiserror::Error;

/// Agent execution error.
///
/// Returned by `Agent::call` / `Agent::observe` and propagated unchanged by
/// sequential pipelines. Fan-out pipelines wrap one or more of these into
/// [`CompositeAgentError`].
#[derive(Debug, Error)]
pub enum AgentError {
    /// A step failed with a message (tool error, broken invariant, agent logic).
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// The LLM call backing an agent or a compression strategy failed.
    #[error("model call failed: {0}")]
    ModelFailed(String),

    /// A configuration or argument was invalid (e.g. a hub with no participants).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// One or more agents of a fan-out pipeline failed.
    #[error(transparent)]
    Composite(#[from] CompositeAgentError),

    /// The task was cancelled before completion (scheduler abort).
    #[error("task cancelled")]
    Cancelled,
}

/// Aggregate failure of a fan-out pipeline: the ordered, non-empty list of
/// per-agent errors observed during one execution.
///
/// The `Display` message concatenates every cause's message, so any individual
/// cause text can be found as a substring of the composite message.
#[derive(Debug)]
pub struct CompositeAgentError {
    causes: Vec<AgentError>,
}

impl CompositeAgentError {
    /// Wraps the observed per-agent errors. `causes` must be non-empty.
    pub fn new(causes: Vec<AgentError>) -> Self {
        debug_assert!(!causes.is_empty(), "composite error requires causes");
        Self { causes }
    }

    /// The observed errors, in the order they were collected.
    pub fn causes(&self) -> &[AgentError] {
        &self.causes
    }
}

impl fmt::Display for CompositeAgentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} agent(s) failed: ", self.causes.len())?;
        for (i, cause) in self.causes.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", cause)?;
        }
        Ok(())
    }
}

impl std::error::Error for CompositeAgentError {}

/// Plan notebook error: invalid state transitions and out-of-range subtasks.
#[derive(Debug, Error)]
pub enum PlanError {
    /// The requested subtask state change violates the ordered state machine.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// A subtask index was outside the current plan's subtask list.
    #[error("subtask index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// An operation required an active plan but none is set.
    #[error("no active plan")]
    NoActivePlan,

    /// `create_plan` was called while a plan is still active.
    #[error("a plan is already active: {0}")]
    PlanAlreadyActive(String),
}

/// Session persistence error. Missing keys are not errors (they yield `None`);
/// only serialization problems surface here.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
