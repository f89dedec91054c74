//! Scheduler collaborator for fan-out pipelines.
//!
//! A scheduler accepts one unit of work and runs it to completion somewhere:
//! the default [`TokioScheduler`] spawns onto the runtime so agent calls run on
//! parallel threads, [`ImmediateScheduler`] runs inline on the caller's task.
//! Virtual-time behavior in tests comes from running either scheduler under a
//! paused tokio clock (`#[tokio::test(start_paused = true)]`).

use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio_util::task::AbortOnDropHandle;

use crate::error::AgentError;
use crate::message::Msg;

/// A boxed unit of pipeline work: one agent call.
pub type ScheduledTask = BoxFuture<'static, Result<Msg, AgentError>>;

/// Runs one unit of work to completion and returns its output.
///
/// **Interaction**: fan-out pipelines in concurrent mode dispatch every agent
/// call through `submit`. Dropping the future returned by `submit` must cancel
/// the underlying work so that pipeline cancellation propagates to in-flight
/// agent calls.
#[async_trait]
pub trait Scheduler: Send + Sync {
    async fn submit(&self, task: ScheduledTask) -> Result<Msg, AgentError>;
}

/// Default scheduler: spawns each task onto the tokio runtime.
///
/// The spawned task is held through an abort-on-drop handle, so cancelling the
/// pipeline future aborts every in-flight agent call instead of leaking it.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioScheduler;

impl TokioScheduler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Scheduler for TokioScheduler {
    async fn submit(&self, task: ScheduledTask) -> Result<Msg, AgentError> {
        let handle = AbortOnDropHandle::new(tokio::spawn(task));
        match handle.await {
            Ok(result) => result,
            Err(join_err) if join_err.is_cancelled() => Err(AgentError::Cancelled),
            Err(join_err) => Err(AgentError::ExecutionFailed(format!(
                "scheduled task panicked: {join_err}"
            ))),
        }
    }
}

/// Scheduler that runs the task inline on the caller's task.
///
/// Tasks submitted from the same `join_all` still interleave at await points,
/// but no new runtime task is spawned.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateScheduler;

impl ImmediateScheduler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Scheduler for ImmediateScheduler {
    async fn submit(&self, task: ScheduledTask) -> Result<Msg, AgentError> {
        task.await
    }
}
