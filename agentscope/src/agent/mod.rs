//! The agent capability interface required by pipelines and `MsgHub`.
//!
//! No inheritance is assumed: anything implementing [`Agent`] can join a
//! pipeline or a hub. Subscriber management is provided over a required
//! [`SubscriberRegistry`] accessor, so implementations embed one registry and
//! get the hub-facing operations for free.
//!
//! Agents are handled by reference ([`AgentRef`]); the registry keeps only
//! weak handles to peers, so mutual subscriptions between agents never form
//! ownership cycles.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::AgentError;
use crate::message::Msg;

/// Shared handle to an agent.
pub type AgentRef = Arc<dyn Agent>;

/// Capability interface of an agent, as seen by pipelines and hubs.
///
/// - [`Agent::call`] performs one turn and returns the agent's final response:
///   an ASSISTANT message without tool-use or tool-result blocks. After
///   producing it, the implementation must deliver that response to each
///   current subscriber via [`SubscriberRegistry::broadcast`]; intermediate
///   tool-invoking messages are never broadcast.
/// - [`Agent::observe`] appends an externally produced message to the agent's
///   memory without triggering reasoning; `MsgHub` uses it to deliver peer
///   outputs and announcements.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Display name of the agent.
    fn name(&self) -> &str;

    /// Opaque unique id of the agent instance.
    fn id(&self) -> &str;

    /// The agent's subscriber registry; implementations embed one and return it.
    fn subscribers(&self) -> &SubscriberRegistry;

    /// Performs one turn, producing the agent's final response.
    async fn call(&self, input: Option<Msg>) -> Result<Msg, AgentError>;

    /// Appends an externally produced message to the agent's memory without
    /// triggering reasoning. Must be safe to invoke concurrently.
    async fn observe(&self, msg: Msg) -> Result<(), AgentError>;

    /// Replaces the subscriber set owned by `hub_name`.
    fn reset_subscribers(&self, hub_name: &str, subscribers: Vec<AgentRef>) {
        self.subscribers().reset(hub_name, &subscribers);
    }

    /// Detaches every subscriber owned by `hub_name`.
    fn remove_subscribers(&self, hub_name: &str) {
        self.subscribers().remove(hub_name);
    }

    /// True if any live subscriber is registered under any hub.
    fn has_subscribers(&self) -> bool {
        self.subscribers().has_any()
    }

    /// Number of live subscriber entries across all hubs.
    fn subscriber_count(&self) -> usize {
        self.subscribers().count()
    }
}

/// Hub-scoped subscriber sets owned by one agent.
///
/// Keyed by hub name so two hubs over the same agent stay independent:
/// exiting one hub removes only that hub's entry. Peers are held as weak
/// handles; entries whose agent has been dropped are skipped on delivery and
/// not counted.
#[derive(Default)]
pub struct SubscriberRegistry {
    hubs: DashMap<String, Vec<Weak<dyn Agent>>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self {
            hubs: DashMap::new(),
        }
    }

    /// Replaces the subscriber set owned by `hub_name`.
    pub fn reset(&self, hub_name: &str, subscribers: &[AgentRef]) {
        let weak: Vec<Weak<dyn Agent>> = subscribers.iter().map(Arc::downgrade).collect();
        self.hubs.insert(hub_name.to_string(), weak);
    }

    /// Removes the subscriber set owned by `hub_name`.
    pub fn remove(&self, hub_name: &str) {
        self.hubs.remove(hub_name);
    }

    /// True if any hub holds at least one live subscriber.
    pub fn has_any(&self) -> bool {
        self.count() > 0
    }

    /// Number of live subscriber entries across all hubs.
    pub fn count(&self) -> usize {
        self.hubs
            .iter()
            .map(|entry| entry.value().iter().filter(|w| w.upgrade().is_some()).count())
            .sum()
    }

    /// Delivers `msg` to every live subscriber of every hub via `observe`.
    ///
    /// Called by agent implementations after producing a final response.
    /// The registry snapshot is taken before any `observe` await so delivery
    /// never holds map locks across suspension points.
    pub async fn broadcast(&self, msg: &Msg) -> Result<(), AgentError> {
        let targets: Vec<AgentRef> = self
            .hubs
            .iter()
            .flat_map(|entry| {
                entry
                    .value()
                    .iter()
                    .filter_map(Weak::upgrade)
                    .collect::<Vec<_>>()
            })
            .collect();
        for target in targets {
            target.observe(msg.clone()).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingAgent {
        name: String,
        id: String,
        seen: Mutex<Vec<Msg>>,
        subscribers: SubscriberRegistry,
    }

    impl RecordingAgent {
        fn new(name: &str) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                id: uuid::Uuid::new_v4().to_string(),
                seen: Mutex::new(Vec::new()),
                subscribers: SubscriberRegistry::new(),
            })
        }

        fn seen_count(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Agent for RecordingAgent {
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
            Ok(Msg::assistant(self.name.clone(), "ok"))
        }

        async fn observe(&self, msg: Msg) -> Result<(), AgentError> {
            self.seen.lock().unwrap().push(msg);
            Ok(())
        }
    }

    #[tokio::test]
    async fn reset_and_remove_are_scoped_by_hub_name() {
        let a = RecordingAgent::new("a");
        let b = RecordingAgent::new("b");
        let c = RecordingAgent::new("c");

        a.reset_subscribers("hub1", vec![b.clone() as AgentRef]);
        a.reset_subscribers("hub2", vec![c.clone() as AgentRef]);
        assert_eq!(a.subscriber_count(), 2);

        a.remove_subscribers("hub1");
        assert_eq!(a.subscriber_count(), 1);
        assert!(a.has_subscribers());

        a.remove_subscribers("hub2");
        assert!(!a.has_subscribers());
    }

    #[tokio::test]
    async fn reset_replaces_previous_set() {
        let a = RecordingAgent::new("a");
        let b = RecordingAgent::new("b");
        let c = RecordingAgent::new("c");

        a.reset_subscribers("hub", vec![b.clone() as AgentRef, c.clone() as AgentRef]);
        assert_eq!(a.subscriber_count(), 2);
        a.reset_subscribers("hub", vec![b.clone() as AgentRef]);
        assert_eq!(a.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn broadcast_reaches_every_live_subscriber() {
        let a = RecordingAgent::new("a");
        let b = RecordingAgent::new("b");
        let c = RecordingAgent::new("c");

        a.reset_subscribers("hub", vec![b.clone() as AgentRef, c.clone() as AgentRef]);
        a.subscribers()
            .broadcast(&Msg::assistant("a", "news"))
            .await
            .unwrap();
        assert_eq!(b.seen_count(), 1);
        assert_eq!(c.seen_count(), 1);
    }

    #[tokio::test]
    async fn dropped_subscribers_are_skipped_and_not_counted() {
        let a = RecordingAgent::new("a");
        let b = RecordingAgent::new("b");
        a.reset_subscribers("hub", vec![b.clone() as AgentRef]);
        assert_eq!(a.subscriber_count(), 1);

        drop(b);
        assert_eq!(a.subscriber_count(), 0);
        // Delivery to a dropped peer is a no-op, not an error.
        a.subscribers()
            .broadcast(&Msg::assistant("a", "news"))
            .await
            .unwrap();
    }
}
