//! MsgHub: a named pub/sub room over a set of participant agents.
//!
//! Entering the hub broadcasts its announcements and, with auto-broadcast on,
//! wires every participant's subscriber set to `participants \ {self}`, scoped
//! by the hub's name so two hubs over the same agent stay independent.
//! The hub is a scoped resource: `close` releases all subscribers on every
//! exit path and is idempotent; dropping the hub closes it as well.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::agent::AgentRef;
use crate::error::AgentError;
use crate::message::Msg;

static HUB_SEQ: AtomicU64 = AtomicU64::new(0);

/// Builder for [`MsgHub`]. The participant list must be non-empty at `build`.
pub struct MsgHubBuilder {
    name: Option<String>,
    participants: Vec<AgentRef>,
    announcements: Vec<Msg>,
    auto_broadcast: bool,
}

impl Default for MsgHubBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MsgHubBuilder {
    pub fn new() -> Self {
        Self {
            name: None,
            participants: Vec::new(),
            announcements: Vec::new(),
            auto_broadcast: true,
        }
    }

    /// Sets the hub name; when absent, a `msghub_<n>` name is generated.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Adds one participant, skipping duplicates by agent id.
    pub fn participant(mut self, agent: AgentRef) -> Self {
        if !self.participants.iter().any(|p| p.id() == agent.id()) {
            self.participants.push(agent);
        }
        self
    }

    /// Adds a batch of participants, preserving order and skipping duplicates.
    pub fn participants(mut self, agents: impl IntoIterator<Item = AgentRef>) -> Self {
        for agent in agents {
            self = self.participant(agent);
        }
        self
    }

    /// Adds an announcement message broadcast to everyone on `enter`.
    pub fn announcement(mut self, msg: Msg) -> Self {
        self.announcements.push(msg);
        self
    }

    /// Enables or disables auto-broadcast (default: enabled).
    pub fn auto_broadcast(mut self, enabled: bool) -> Self {
        self.auto_broadcast = enabled;
        self
    }

    pub fn build(&self) -> Result<MsgHub, AgentError> {
        if self.participants.is_empty() {
            return Err(AgentError::InvalidArgument(
                "MsgHub requires at least one participant".into(),
            ));
        }
        let name = self
            .name
            .clone()
            .unwrap_or_else(|| format!("msghub_{}", HUB_SEQ.fetch_add(1, Ordering::SeqCst)));
        Ok(MsgHub {
            name,
            announcements: self.announcements.clone(),
            state: Mutex::new(HubState {
                participants: self.participants.clone(),
                departed: Vec::new(),
                entered: false,
                closed: false,
                auto_broadcast: self.auto_broadcast,
            }),
        })
    }
}

struct HubState {
    participants: Vec<AgentRef>,
    /// Ex-participants; `close` must detach these too.
    departed: Vec<AgentRef>,
    entered: bool,
    closed: bool,
    auto_broadcast: bool,
}

/// A named room over an ordered set of participant agents.
pub struct MsgHub {
    name: String,
    announcements: Vec<Msg>,
    state: Mutex<HubState>,
}

impl std::fmt::Debug for MsgHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MsgHub")
            .field("name", &self.name)
            .field("announcements", &self.announcements)
            .finish_non_exhaustive()
    }
}

impl MsgHub {
    pub fn builder() -> MsgHubBuilder {
        MsgHubBuilder::new()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_auto_broadcast_enabled(&self) -> bool {
        self.state.lock().expect("hub lock").auto_broadcast
    }

    /// Snapshot of the current participants, in iteration order.
    pub fn participants(&self) -> Vec<AgentRef> {
        self.state.lock().expect("hub lock").participants.clone()
    }

    /// Enters the hub: broadcasts every announcement to every participant,
    /// then installs subscriber sets when auto-broadcast is enabled.
    pub async fn enter(&self) -> Result<(), AgentError> {
        let (participants, auto_broadcast) = {
            let mut state = self.state.lock().expect("hub lock");
            state.entered = true;
            state.closed = false;
            (state.participants.clone(), state.auto_broadcast)
        };
        tracing::debug!(hub = %self.name, participants = participants.len(), "hub enter");
        for announcement in &self.announcements {
            for participant in &participants {
                participant.observe(announcement.clone()).await?;
            }
        }
        if auto_broadcast {
            Self::install_subscribers(&self.name, &participants);
        }
        Ok(())
    }

    /// Delivers each message to every participant: messages in the given
    /// sequence, participants in iteration order.
    pub async fn broadcast_all(&self, msgs: &[Msg]) -> Result<(), AgentError> {
        let participants = self.participants();
        for msg in msgs {
            for participant in &participants {
                participant.observe(msg.clone()).await?;
            }
        }
        Ok(())
    }

    /// Delivers one message to every participant.
    pub async fn broadcast(&self, msg: Msg) -> Result<(), AgentError> {
        self.broadcast_all(std::slice::from_ref(&msg)).await
    }

    /// Adds a participant; adding an existing participant is a no-op. If the
    /// hub has entered with auto-broadcast on, every participant's subscriber
    /// set is recomputed to include the newcomer.
    pub fn add(&self, agent: AgentRef) {
        let mut state = self.state.lock().expect("hub lock");
        if state.participants.iter().any(|p| p.id() == agent.id()) {
            return;
        }
        state.departed.retain(|p| p.id() != agent.id());
        state.participants.push(agent);
        if state.entered && state.auto_broadcast {
            Self::install_subscribers(&self.name, &state.participants);
        }
    }

    /// Removes a participant. If entered with auto-broadcast, the remaining
    /// participants' subscriber sets are recomputed and the departed agent's
    /// hub-scoped subscribers are detached.
    pub fn delete(&self, agent: &AgentRef) {
        let mut state = self.state.lock().expect("hub lock");
        let Some(index) = state.participants.iter().position(|p| p.id() == agent.id()) else {
            return;
        };
        let removed = state.participants.remove(index);
        removed.remove_subscribers(&self.name);
        if !state.departed.iter().any(|p| p.id() == removed.id()) {
            state.departed.push(removed);
        }
        if state.entered && state.auto_broadcast {
            Self::install_subscribers(&self.name, &state.participants);
        }
    }

    /// Toggles auto-broadcast. On an entered hub, disabling removes this
    /// hub's subscribers from every participant; enabling re-installs the
    /// current participant set.
    pub fn set_auto_broadcast(&self, enabled: bool) {
        let mut state = self.state.lock().expect("hub lock");
        state.auto_broadcast = enabled;
        if !state.entered {
            return;
        }
        if enabled {
            Self::install_subscribers(&self.name, &state.participants);
        } else {
            for participant in &state.participants {
                participant.remove_subscribers(&self.name);
            }
        }
    }

    /// Releases this hub's subscribers on every current and former
    /// participant. Idempotent; also invoked on drop.
    pub fn close(&self) {
        let mut state = self.state.lock().expect("hub lock");
        if state.closed {
            return;
        }
        state.closed = true;
        state.entered = false;
        tracing::debug!(hub = %self.name, "hub close");
        for participant in state.participants.iter().chain(state.departed.iter()) {
            participant.remove_subscribers(&self.name);
        }
    }

    /// Alias of [`MsgHub::close`].
    pub fn exit(&self) {
        self.close();
    }

    fn install_subscribers(hub_name: &str, participants: &[AgentRef]) {
        for participant in participants {
            let peers: Vec<AgentRef> = participants
                .iter()
                .filter(|p| p.id() != participant.id())
                .cloned()
                .collect();
            participant.reset_subscribers(hub_name, peers);
        }
    }
}

impl Drop for MsgHub {
    fn drop(&mut self) {
        self.close();
    }
}

/// Runs `f` with an entered hub and closes it on both success and error paths.
pub async fn with_msg_hub<F, Fut, T>(hub: MsgHub, f: F) -> Result<T, AgentError>
where
    F: FnOnce(Arc<MsgHub>) -> Fut,
    Fut: Future<Output = Result<T, AgentError>>,
{
    let hub = Arc::new(hub);
    hub.enter().await?;
    let result = f(Arc::clone(&hub)).await;
    hub.close();
    result
}
