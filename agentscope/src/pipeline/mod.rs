//! Pipeline engine: sequential and fan-out composition of agents.
//!
//! Pipelines are single-use composables built with state-copying builders.
//! [`SequentialPipeline`] chains agents left to right; [`FanoutPipeline`]
//! executes the same input against many agents, either in insertion order or
//! concurrently through a pluggable [`Scheduler`].

mod fanout;
mod scheduler;
mod sequential;

pub use fanout::{FanoutPipeline, FanoutPipelineBuilder};
pub use scheduler::{ImmediateScheduler, ScheduledTask, Scheduler, TokioScheduler};
pub use sequential::{SequentialPipeline, SequentialPipelineBuilder};
