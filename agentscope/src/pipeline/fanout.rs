//! Fan-out pipeline: the same input against many agents, sequentially or
//! concurrently, with composite failure aggregation.

use std::sync::Arc;

use futures::future::join_all;

use crate::agent::AgentRef;
use crate::error::{AgentError, CompositeAgentError};
use crate::message::Msg;
use crate::pipeline::scheduler::{Scheduler, TokioScheduler};

/// Builder for [`FanoutPipeline`].
///
/// Agents are kept in insertion order and deduplicated by id. `concurrent`
/// defaults to true; `scheduler(None)` means "use the default parallel
/// scheduler". `build` copies the collected state.
pub struct FanoutPipelineBuilder {
    agents: Vec<AgentRef>,
    concurrent: bool,
    scheduler: Option<Arc<dyn Scheduler>>,
}

impl Default for FanoutPipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FanoutPipelineBuilder {
    pub fn new() -> Self {
        Self {
            agents: Vec::new(),
            concurrent: true,
            scheduler: None,
        }
    }

    /// Adds one agent; a second add of the same agent id is a no-op.
    pub fn add(mut self, agent: AgentRef) -> Self {
        if !self.agents.iter().any(|a| a.id() == agent.id()) {
            self.agents.push(agent);
        }
        self
    }

    /// Adds a batch of agents, preserving order and skipping duplicates.
    pub fn add_all(mut self, agents: impl IntoIterator<Item = AgentRef>) -> Self {
        for agent in agents {
            self = self.add(agent);
        }
        self
    }

    /// Toggles concurrent mode (may be called repeatedly before `build`).
    pub fn concurrent(mut self, enabled: bool) -> Self {
        self.concurrent = enabled;
        self
    }

    /// Sets the scheduler used in concurrent mode; `None` selects the default.
    pub fn scheduler(mut self, scheduler: Option<Arc<dyn Scheduler>>) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn build(&self) -> FanoutPipeline {
        FanoutPipeline {
            agents: Arc::from(self.agents.as_slice()),
            concurrent: self.concurrent,
            scheduler: self
                .scheduler
                .clone()
                .unwrap_or_else(|| Arc::new(TokioScheduler::new())),
        }
    }
}

/// Executes every agent with the same input.
///
/// - Sequential mode: insertion order, single-threaded on the caller; the
///   scheduler is ignored and results line up with insertion order.
/// - Concurrent mode: each call is dispatched through the scheduler; result
///   ordering is not guaranteed.
/// - If any agents fail, execution fails with [`CompositeAgentError`] carrying
///   every observed error; successful agents were still invoked but their
///   results are not surfaced.
///
/// Cancelling the future returned by [`FanoutPipeline::execute`] cancels all
/// in-flight agent calls (the default scheduler aborts its spawned tasks);
/// completed results are discarded.
pub struct FanoutPipeline {
    agents: Arc<[AgentRef]>,
    concurrent: bool,
    scheduler: Arc<dyn Scheduler>,
}

impl FanoutPipeline {
    pub fn builder() -> FanoutPipelineBuilder {
        FanoutPipelineBuilder::new()
    }

    /// Number of participating agents.
    pub fn size(&self) -> usize {
        self.agents.len()
    }

    /// Whether concurrent mode is enabled.
    pub fn is_concurrent_enabled(&self) -> bool {
        self.concurrent
    }

    /// Runs every agent with a copy of `input`.
    pub async fn execute(&self, input: Option<Msg>) -> Result<Vec<Msg>, AgentError> {
        let outcomes = if self.concurrent {
            self.execute_concurrent(input).await
        } else {
            self.execute_sequential(input).await
        };

        let mut results = Vec::with_capacity(outcomes.len());
        let mut causes = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(msg) => results.push(msg),
                Err(err) => causes.push(err),
            }
        }
        if causes.is_empty() {
            Ok(results)
        } else {
            tracing::debug!(
                failed = causes.len(),
                total = self.agents.len(),
                "fan-out pipeline failed"
            );
            Err(CompositeAgentError::new(causes).into())
        }
    }

    async fn execute_sequential(&self, input: Option<Msg>) -> Vec<Result<Msg, AgentError>> {
        let mut outcomes = Vec::with_capacity(self.agents.len());
        for agent in self.agents.iter() {
            outcomes.push(agent.call(input.clone()).await);
        }
        outcomes
    }

    async fn execute_concurrent(&self, input: Option<Msg>) -> Vec<Result<Msg, AgentError>> {
        let submissions = self.agents.iter().map(|agent| {
            let agent = agent.clone();
            let input = input.clone();
            self.scheduler
                .submit(Box::pin(async move { agent.call(input).await }))
        });
        join_all(submissions).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{Agent, SubscriberRegistry};
    use crate::pipeline::ImmediateScheduler;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingAgent {
        name: String,
        id: String,
        reply: Result<String, String>,
        calls: AtomicUsize,
        subscribers: SubscriberRegistry,
    }

    impl CountingAgent {
        fn ok(name: &str, reply: &str) -> Arc<Self> {
            Self::build(name, Ok(reply.to_string()))
        }

        fn err(name: &str, message: &str) -> Arc<Self> {
            Self::build(name, Err(message.to_string()))
        }

        fn build(name: &str, reply: Result<String, String>) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                id: uuid::Uuid::new_v4().to_string(),
                reply,
                calls: AtomicUsize::new(0),
                subscribers: SubscriberRegistry::new(),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Agent for CountingAgent {
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
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Ok(text) => Ok(Msg::assistant(self.name.clone(), text.clone())),
                Err(message) => Err(AgentError::ExecutionFailed(message.clone())),
            }
        }
        async fn observe(&self, _msg: Msg) -> Result<(), AgentError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn sequential_mode_preserves_insertion_order() {
        let pipeline = FanoutPipeline::builder()
            .add(CountingAgent::ok("a1", "r1"))
            .add(CountingAgent::ok("a2", "r2"))
            .add(CountingAgent::ok("a3", "r3"))
            .concurrent(false)
            .build();
        assert!(!pipeline.is_concurrent_enabled());
        let results = pipeline.execute(Some(Msg::user("u", "go"))).await.unwrap();
        let names: Vec<&str> = results.iter().map(|m| m.name()).collect();
        assert_eq!(names, vec!["a1", "a2", "a3"]);
    }

    #[tokio::test]
    async fn concurrent_mode_returns_every_result() {
        let pipeline = FanoutPipeline::builder()
            .add_all(vec![
                CountingAgent::ok("a1", "r1") as AgentRef,
                CountingAgent::ok("a2", "r2") as AgentRef,
            ])
            .scheduler(Some(Arc::new(ImmediateScheduler::new())))
            .build();
        assert!(pipeline.is_concurrent_enabled());
        let mut texts: Vec<String> = pipeline
            .execute(Some(Msg::user("u", "go")))
            .await
            .unwrap()
            .iter()
            .map(|m| m.text_content())
            .collect();
        texts.sort();
        assert_eq!(texts, vec!["r1", "r2"]);
    }

    #[tokio::test]
    async fn single_failure_yields_composite_with_one_cause() {
        let ok = CountingAgent::ok("ok", "fine");
        let bad = CountingAgent::err("bad", "boom");
        let pipeline = FanoutPipeline::builder()
            .add(ok.clone())
            .add(bad.clone())
            .build();
        let err = pipeline.execute(Some(Msg::user("u", "go"))).await.unwrap_err();
        let AgentError::Composite(composite) = err else {
            panic!("expected composite, got {err:?}");
        };
        assert_eq!(composite.causes().len(), 1);
        assert!(composite.to_string().contains("boom"));
        // Successful agents were still invoked.
        assert_eq!(ok.call_count(), 1);
        assert_eq!(bad.call_count(), 1);
    }

    #[tokio::test]
    async fn all_failures_are_collected_as_causes() {
        let pipeline = FanoutPipeline::builder()
            .add(CountingAgent::err("b1", "first bad"))
            .add(CountingAgent::ok("ok", "fine"))
            .add(CountingAgent::err("b2", "second bad"))
            .concurrent(false)
            .build();
        let err = pipeline.execute(None).await.unwrap_err();
        let AgentError::Composite(composite) = err else {
            panic!("expected composite");
        };
        assert_eq!(composite.causes().len(), 2);
        let message = composite.to_string();
        assert!(message.contains("first bad"));
        assert!(message.contains("second bad"));
    }

    #[tokio::test]
    async fn duplicate_agents_are_added_once() {
        let agent = CountingAgent::ok("a", "r");
        let pipeline = FanoutPipeline::builder()
            .add(agent.clone())
            .add(agent.clone())
            .build();
        assert_eq!(pipeline.size(), 1);
    }

    #[tokio::test]
    async fn concurrent_toggle_is_reversible_before_build() {
        let builder = FanoutPipeline::builder()
            .add(CountingAgent::ok("a", "r"))
            .concurrent(false)
            .concurrent(true);
        assert!(builder.build().is_concurrent_enabled());
    }
}
