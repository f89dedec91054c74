//! Sequential pipeline: each agent sees the previous agent's output.

use std::sync::Arc;

use crate::agent::AgentRef;
use crate::error::AgentError;
use crate::message::Msg;

/// Builder for [`SequentialPipeline`]. Setters are idempotent; `build` copies
/// the collected state, so later builder mutations do not affect built
/// pipelines.
#[derive(Default)]
pub struct SequentialPipelineBuilder {
    agents: Vec<AgentRef>,
}

impl SequentialPipelineBuilder {
    pub fn new() -> Self {
        Self { agents: Vec::new() }
    }

    /// Appends one agent.
    pub fn add(mut self, agent: AgentRef) -> Self {
        self.agents.push(agent);
        self
    }

    /// Appends a batch of agents, preserving order.
    pub fn add_all(mut self, agents: impl IntoIterator<Item = AgentRef>) -> Self {
        self.agents.extend(agents);
        self
    }

    pub fn build(&self) -> SequentialPipeline {
        SequentialPipeline {
            agents: Arc::from(self.agents.as_slice()),
        }
    }
}

/// Executes agents left to right: `Mᵢ = Aᵢ.call(Mᵢ₋₁)`.
///
/// - An empty pipeline returns the input unchanged.
/// - Any agent failure aborts the pipeline and surfaces the cause verbatim
///   (no composite wrapping).
pub struct SequentialPipeline {
    agents: Arc<[AgentRef]>,
}

impl SequentialPipeline {
    pub fn builder() -> SequentialPipelineBuilder {
        SequentialPipelineBuilder::new()
    }

    /// Number of agents in the chain.
    pub fn size(&self) -> usize {
        self.agents.len()
    }

    /// The chained agents, in execution order.
    pub fn agents(&self) -> &[AgentRef] {
        &self.agents
    }

    /// Runs the chain on the caller's execution context.
    pub async fn execute(&self, input: Option<Msg>) -> Result<Option<Msg>, AgentError> {
        let mut current = input;
        for agent in self.agents.iter() {
            current = Some(agent.call(current).await?);
        }
        Ok(current)
    }
}
