//! Auto-context memory engine: dual stores plus the six-strategy compression
//! pipeline.
//!
//! Every appended message lands in both the working store (what the LLM sees)
//! and the append-only original store (audit, transcripts, interaction view).
//! When the working store crosses its message or token threshold, the
//! strategies run in fixed priority order and the first one that changes
//! anything ends the pass. Originals are always offloaded before the working
//! store is mutated, so compression never loses data.
//!
//! Callers must not interleave `add_message` with `get_messages` /
//! `compress_if_needed` concurrently; the engine serializes its own state but
//! the interleaving order would be meaningless.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex as AsyncMutex;
use uuid::Uuid;

use crate::error::{AgentError, SessionError};
use crate::llm::LlmClient;
use crate::memory::events::{CompressionEvent, CompressionEventLog, CompressionEventType};
use crate::memory::filters::filter_plan_related_tool_calls;
use crate::memory::offload::OffloadStore;
use crate::memory::prompts::{
    char_budget_requirement, offload_hint, plan_aware_hint, CustomPrompts, COMPRESSION_AGENT_NAME,
    COMPRESSION_MESSAGE_LIST_END,
};
use crate::memory::Memory;
use crate::message::{ContentBlock, Msg, MsgRole};
use crate::plan::PlanNotebook;
use crate::session::SessionStore;
use crate::token;

/// Session sub-key for the working store.
pub const WORKING_MESSAGES_SUB_KEY: &str = "autoContextMemory_workingMessages";
/// Session sub-key for the original store.
pub const ORIGINAL_MESSAGES_SUB_KEY: &str = "autoContextMemory_originalMessages";
/// Session sub-key for the offload store.
pub const OFFLOAD_CONTEXT_SUB_KEY: &str = "autoContextMemory_offloadContext";

/// Upper bound on disjoint tool runs coalesced by one S1 application.
const S1_MAX_ITERATIONS: usize = 5;

/// Configuration envelope of the auto-context memory.
#[derive(Debug, Clone)]
pub struct AutoContextConfig {
    /// Characters above which a message counts as a large payload.
    pub large_payload_threshold: usize,
    /// Model context budget in tokens.
    pub max_token: u64,
    /// Fraction of `max_token` that trips compression (0–1).
    pub token_ratio: f64,
    /// Characters of original text kept in a large-payload preview.
    pub offload_single_preview: usize,
    /// Working-store size that trips compression.
    pub msg_threshold: usize,
    /// Number of trailing messages protected from previous-round strategies.
    pub last_keep: usize,
    /// A tool run is compressed only when strictly longer than this.
    pub min_consecutive_tool_messages: usize,
    /// Target size of current-round compression, as a fraction of the original
    /// character count (0–1).
    pub current_round_compression_ratio: f64,
    /// Optional per-strategy prompt overrides.
    pub prompts: CustomPrompts,
}

impl Default for AutoContextConfig {
    fn default() -> Self {
        Self {
            large_payload_threshold: 5120,
            max_token: 128 * 1024,
            token_ratio: 0.75,
            offload_single_preview: 200,
            msg_threshold: 100,
            last_keep: 50,
            min_consecutive_tool_messages: 6,
            current_round_compression_ratio: 0.3,
            prompts: CustomPrompts::default(),
        }
    }
}

/// Builder for [`AutoContextMemory`]; `build` copies the collected state.
#[derive(Default)]
pub struct AutoContextMemoryBuilder {
    llm: Option<Arc<dyn LlmClient>>,
    config: AutoContextConfig,
    plan_notebook: Option<Arc<PlanNotebook>>,
}

impl AutoContextMemoryBuilder {
    pub fn new() -> Self {
        Self {
            llm: None,
            config: AutoContextConfig::default(),
            plan_notebook: None,
        }
    }

    /// The model used as the compression summarizer. Required.
    pub fn llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn config(mut self, config: AutoContextConfig) -> Self {
        self.config = config;
        self
    }

    /// Attaches the plan notebook consulted for the plan-aware hint.
    pub fn plan_notebook(mut self, notebook: Arc<PlanNotebook>) -> Self {
        self.plan_notebook = Some(notebook);
        self
    }

    pub fn build(&self) -> Result<AutoContextMemory, AgentError> {
        let llm = self
            .llm
            .clone()
            .ok_or_else(|| AgentError::InvalidArgument("auto-context memory requires an LLM".into()))?;
        Ok(AutoContextMemory {
            config: self.config.clone(),
            llm,
            state: AsyncMutex::new(StoreState::default()),
            offload: Arc::new(OffloadStore::new()),
            events: CompressionEventLog::new(),
            plan_notebook: std::sync::Mutex::new(self.plan_notebook.clone()),
        })
    }
}

#[derive(Default)]
struct StoreState {
    working: Vec<Msg>,
    original: Vec<Msg>,
}

/// Six-strategy context compression engine.
pub struct AutoContextMemory {
    config: AutoContextConfig,
    llm: Arc<dyn LlmClient>,
    state: AsyncMutex<StoreState>,
    offload: Arc<OffloadStore>,
    events: CompressionEventLog,
    plan_notebook: std::sync::Mutex<Option<Arc<PlanNotebook>>>,
}

impl std::fmt::Debug for AutoContextMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutoContextMemory")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AutoContextMemory {
    pub fn builder() -> AutoContextMemoryBuilder {
        AutoContextMemoryBuilder::new()
    }

    /// Appends to both the working and the original store.
    pub async fn add_message(&self, msg: Msg) {
        let mut state = self.state.lock().await;
        state.original.push(msg.clone());
        state.working.push(msg);
    }

    /// Snapshot of the working store, compressing first when a threshold is
    /// reached. At most one strategy applies per call.
    pub async fn get_messages(&self) -> Vec<Msg> {
        let mut state = self.state.lock().await;
        if self.thresholds_reached(&state.working) {
            self.run_compression(&mut state).await;
        }
        state.working.clone()
    }

    /// Runs at most one strategy application pass; reports whether any
    /// strategy applied.
    pub async fn compress_if_needed(&self) -> bool {
        let mut state = self.state.lock().await;
        if !self.thresholds_reached(&state.working) {
            return false;
        }
        self.run_compression(&mut state).await
    }

    /// Deletes the working-store message at `index`; the original store is an
    /// append-only audit log and keeps its entry.
    pub async fn delete_message(&self, index: usize) -> bool {
        let mut state = self.state.lock().await;
        if index < state.working.len() {
            state.working.remove(index);
            true
        } else {
            false
        }
    }

    /// Resets both stores.
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        state.working.clear();
        state.original.clear();
    }

    /// Stores `msgs` under `uuid` in the offload store.
    pub fn offload(&self, uuid: impl Into<String>, msgs: Vec<Msg>) {
        self.offload.insert(uuid, msgs);
    }

    /// The offloaded originals under `uuid`; empty when absent.
    pub fn reload(&self, uuid: &str) -> Vec<Msg> {
        self.offload.get(uuid)
    }

    /// Drops the offload entry under `uuid`.
    pub fn clear_offload(&self, uuid: &str) {
        self.offload.remove(uuid);
    }

    /// Attaches (or detaches, with `None`) the plan notebook. Idempotent.
    pub fn attach_plan_notebook(&self, notebook: Option<Arc<PlanNotebook>>) {
        *self.plan_notebook.lock().expect("plan notebook lock") = notebook;
    }

    /// The append-only original store.
    pub async fn original_messages(&self) -> Vec<Msg> {
        self.state.lock().await.original.clone()
    }

    /// USER messages plus final assistant responses from the original store,
    /// in original order.
    pub async fn interaction_messages(&self) -> Vec<Msg> {
        self.state
            .lock()
            .await
            .original
            .iter()
            .filter(|m| m.role() == MsgRole::User || m.is_final_assistant_response())
            .cloned()
            .collect()
    }

    /// Snapshot of the offload store.
    pub fn offload_context(&self) -> HashMap<String, Vec<Msg>> {
        self.offload.snapshot()
    }

    /// Shared handle to the offload store, used to bind a `context_reload`
    /// tool to this memory.
    pub fn offload_store(&self) -> Arc<OffloadStore> {
        Arc::clone(&self.offload)
    }

    /// All compression events recorded so far, oldest first.
    pub fn compression_events(&self) -> Vec<CompressionEvent> {
        self.events.snapshot()
    }

    /// Serializes the working, original, and offload stores under fixed
    /// sub-keys of `key`.
    pub async fn save_to(&self, session: &dyn SessionStore, key: &str) -> Result<(), SessionError> {
        let state = self.state.lock().await;
        session
            .save(key, WORKING_MESSAGES_SUB_KEY, serde_json::to_value(&state.working)?)
            .await?;
        session
            .save(key, ORIGINAL_MESSAGES_SUB_KEY, serde_json::to_value(&state.original)?)
            .await?;
        session
            .save(key, OFFLOAD_CONTEXT_SUB_KEY, serde_json::to_value(self.offload.snapshot())?)
            .await?;
        Ok(())
    }

    /// Restores the three stores from `key`; missing sub-keys yield empty
    /// stores.
    pub async fn load_from(&self, session: &dyn SessionStore, key: &str) -> Result<(), SessionError> {
        let working: Vec<Msg> = match session.get(key, WORKING_MESSAGES_SUB_KEY).await? {
            Some(value) => serde_json::from_value(value)?,
            None => Vec::new(),
        };
        let original: Vec<Msg> = match session.get(key, ORIGINAL_MESSAGES_SUB_KEY).await? {
            Some(value) => serde_json::from_value(value)?,
            None => Vec::new(),
        };
        let offload: HashMap<String, Vec<Msg>> = match session.get(key, OFFLOAD_CONTEXT_SUB_KEY).await? {
            Some(value) => serde_json::from_value(value)?,
            None => HashMap::new(),
        };
        let mut state = self.state.lock().await;
        state.working = working;
        state.original = original;
        self.offload.restore(offload);
        Ok(())
    }

    fn thresholds_reached(&self, working: &[Msg]) -> bool {
        if working.len() >= self.config.msg_threshold {
            return true;
        }
        let budget = (self.config.max_token as f64 * self.config.token_ratio) as u64;
        token::estimate_messages(working) >= budget
    }

    /// Runs strategies in priority order; the first one that changes anything
    /// ends the pass. An LLM failure inside a strategy counts as "did not
    /// apply" and the next strategy is tried.
    async fn run_compression(&self, state: &mut StoreState) -> bool {
        match self.compress_previous_tool_runs(state).await {
            Ok(true) => return true,
            Ok(false) => {}
            Err(err) => {
                tracing::warn!(strategy = "tool_invocation_compress", error = %err, "strategy failed")
            }
        }
        if self.offload_large_payloads(state, true) {
            return true;
        }
        if self.offload_large_payloads(state, false) {
            return true;
        }
        match self.summarize_previous_rounds(state).await {
            Ok(true) => return true,
            Ok(false) => {}
            Err(err) => {
                tracing::warn!(strategy = "previous_round_summary", error = %err, "strategy failed")
            }
        }
        match self.compress_current_round_large(state).await {
            Ok(true) => return true,
            Ok(false) => {}
            Err(err) => {
                tracing::warn!(strategy = "current_round_large", error = %err, "strategy failed")
            }
        }
        match self.compress_current_round(state).await {
            Ok(true) => return true,
            Ok(false) => {}
            Err(err) => {
                tracing::warn!(strategy = "current_round_compress", error = %err, "strategy failed")
            }
        }
        tracing::warn!("no compression strategy applied; working store returned unchanged");
        false
    }

    /// S1: compress runs of consecutive tool messages from previous rounds,
    /// coalescing up to [`S1_MAX_ITERATIONS`] disjoint runs in one pass.
    async fn compress_previous_tool_runs(&self, state: &mut StoreState) -> Result<bool, AgentError> {
        let min_len = self.config.min_consecutive_tool_messages;
        let mut applied = false;
        for _ in 0..S1_MAX_ITERATIONS {
            let Some(final_idx) = latest_final_assistant_index(&state.working) else {
                break;
            };
            let tail_guard = state.working.len().saturating_sub(self.config.last_keep);
            let bound = final_idx.min(tail_guard);
            let Some((start, end)) = find_tool_run(&state.working, bound, min_len) else {
                break;
            };
            let originals: Vec<Msg> = state.working[start..=end].to_vec();
            let instruction = self.config.prompts.previous_round_tool().to_string();
            let summary = match self.summarize(&instruction, &originals, None).await {
                Ok(text) => text,
                Err(err) => {
                    if applied {
                        tracing::warn!(error = %err, "tool-run coalescing stopped early");
                        return Ok(true);
                    }
                    return Err(err);
                }
            };
            let uuid = Uuid::new_v4().to_string();
            let replacement = Msg::assistant(
                COMPRESSION_AGENT_NAME,
                format!("{summary}\n{}", offload_hint(&uuid)),
            )
            .with_offload_uuid(&uuid);
            self.offload.insert(uuid.clone(), originals.clone());
            self.events.record(
                CompressionEvent::new(CompressionEventType::ToolInvocationCompress, originals.len())
                    .with_neighbors(
                        start.checked_sub(1).map(|i| state.working[i].id().to_string()),
                        state.working.get(end + 1).map(|m| m.id().to_string()),
                    )
                    .with_compressed_message_id(replacement.id())
                    .with_offload_uuid(&uuid),
            );
            state.working.splice(start..=end, [replacement]);
            applied = true;
        }
        Ok(applied)
    }

    /// S2 (`tail_protected`) and S3: offload large payloads before the latest
    /// final assistant response, replacing them with short previews.
    fn offload_large_payloads(&self, state: &mut StoreState, tail_protected: bool) -> bool {
        let final_idx = latest_final_assistant_index(&state.working);
        let bound = if tail_protected {
            if state.working.len() < self.config.last_keep {
                return false;
            }
            let tail_guard = state.working.len() - self.config.last_keep;
            match final_idx {
                Some(f) => f.min(tail_guard),
                None => tail_guard,
            }
        } else {
            // Without the tail guard, the latest final response and everything
            // after it stay protected; no final response means everything is
            // current-round.
            match final_idx {
                Some(f) => f,
                None => return false,
            }
        };
        let event_type = if tail_protected {
            CompressionEventType::LargePayloadOffload
        } else {
            CompressionEventType::LargePayloadOffloadUnprotected
        };
        let mut applied = false;
        for i in 0..bound {
            let msg = &state.working[i];
            if msg.offload_uuid().is_some() {
                continue;
            }
            let text = msg.text_content();
            if text.chars().count() <= self.config.large_payload_threshold {
                continue;
            }
            let uuid = Uuid::new_v4().to_string();
            let preview: String = text.chars().take(self.config.offload_single_preview).collect();
            let replacement = Msg::new(
                msg.role(),
                msg.name(),
                vec![ContentBlock::text(format!(
                    "{preview}…\n{}",
                    offload_hint(&uuid)
                ))],
            )
            .with_offload_uuid(&uuid);
            self.offload.insert(uuid.clone(), vec![msg.clone()]);
            self.events.record(
                CompressionEvent::new(event_type, 1)
                    .with_neighbors(
                        i.checked_sub(1).map(|p| state.working[p].id().to_string()),
                        state.working.get(i + 1).map(|m| m.id().to_string()),
                    )
                    .with_compressed_message_id(replacement.id())
                    .with_offload_uuid(&uuid),
            );
            state.working[i] = replacement;
            applied = true;
        }
        applied
    }

    /// S4: summarize completed conversation rounds before the latest final
    /// assistant response, last pair first so earlier indices stay valid.
    async fn summarize_previous_rounds(&self, state: &mut StoreState) -> Result<bool, AgentError> {
        let Some(final_idx) = latest_final_assistant_index(&state.working) else {
            return Ok(false);
        };
        let mut pairs: Vec<(usize, usize)> = Vec::new();
        let mut last_end = 0usize;
        for j in 0..final_idx {
            if !state.working[j].is_final_assistant_response() {
                continue;
            }
            let Some(i) = state.working[..j]
                .iter()
                .rposition(|m| m.role() == MsgRole::User)
            else {
                continue;
            };
            // Only non-adjacent pairs carry compressible content; overlapping
            // pairs are skipped so splices stay disjoint.
            if j > i + 1 && i >= last_end {
                pairs.push((i, j));
                last_end = j;
            }
        }
        let mut applied = false;
        for &(i, j) in pairs.iter().rev() {
            let originals: Vec<Msg> = state.working[i + 1..=j].to_vec();
            let instruction = self.config.prompts.previous_round_summary().to_string();
            let output = match self.summarize(&instruction, &originals, None).await {
                Ok(text) => text,
                Err(err) => {
                    if applied {
                        tracing::warn!(error = %err, "round summarization stopped early");
                        return Ok(true);
                    }
                    return Err(err);
                }
            };
            let uuid = Uuid::new_v4().to_string();
            let replacement = Msg::assistant(
                COMPRESSION_AGENT_NAME,
                format!(
                    "<conversation_summary>{output}</conversation_summary>\n{}",
                    offload_hint(&uuid)
                ),
            )
            .with_offload_uuid(&uuid);
            self.offload.insert(uuid.clone(), originals.clone());
            self.events.record(
                CompressionEvent::new(CompressionEventType::PreviousRoundSummary, originals.len())
                    .with_neighbors(
                        Some(state.working[i].id().to_string()),
                        state.working.get(j + 1).map(|m| m.id().to_string()),
                    )
                    .with_compressed_message_id(replacement.id())
                    .with_offload_uuid(&uuid),
            );
            state.working.splice(i + 1..=j, [replacement]);
            applied = true;
        }
        Ok(applied)
    }

    /// S5: summarize oversized messages after the latest USER message, tail
    /// first so indices do not shift.
    async fn compress_current_round_large(&self, state: &mut StoreState) -> Result<bool, AgentError> {
        let Some(user_idx) = latest_user_index(&state.working) else {
            return Ok(false);
        };
        let mut applied = false;
        for i in ((user_idx + 1)..state.working.len()).rev() {
            let msg = state.working[i].clone();
            if msg.offload_uuid().is_some() {
                continue;
            }
            if msg.text_content().chars().count() <= self.config.large_payload_threshold {
                continue;
            }
            let instruction = self.config.prompts.current_round_large().to_string();
            let output = match self.summarize(&instruction, std::slice::from_ref(&msg), None).await {
                Ok(text) => text,
                Err(err) => {
                    if applied {
                        tracing::warn!(error = %err, "current-round large compression stopped early");
                        return Ok(true);
                    }
                    return Err(err);
                }
            };
            let uuid = Uuid::new_v4().to_string();
            let replacement = Msg::new(
                msg.role(),
                msg.name(),
                vec![ContentBlock::text(format!(
                    "<compressed_large_message>{output}</compressed_large_message>\n{}",
                    offload_hint(&uuid)
                ))],
            )
            .with_offload_uuid(&uuid);
            self.offload.insert(uuid.clone(), vec![msg.clone()]);
            self.events.record(
                CompressionEvent::new(CompressionEventType::CurrentRoundLargeMessageCompress, 1)
                    .with_neighbors(
                        i.checked_sub(1).map(|p| state.working[p].id().to_string()),
                        state.working.get(i + 1).map(|m| m.id().to_string()),
                    )
                    .with_compressed_message_id(replacement.id())
                    .with_offload_uuid(&uuid),
            );
            state.working[i] = replacement;
            applied = true;
        }
        Ok(applied)
    }

    /// S6: compress everything after the latest USER message into one
    /// synthetic assistant message, leaving an unpaired trailing tool-use in
    /// place.
    async fn compress_current_round(&self, state: &mut StoreState) -> Result<bool, AgentError> {
        let Some(user_idx) = latest_user_index(&state.working) else {
            return Ok(false);
        };
        let start = user_idx + 1;
        if start >= state.working.len() {
            return Ok(false);
        }
        let mut end = state.working.len() - 1;
        if state.working[end].has_tool_use() {
            if end == start {
                return Ok(false);
            }
            end -= 1;
        }
        let originals: Vec<Msg> = state.working[start..=end].to_vec();
        let original_chars: usize = originals
            .iter()
            .map(|m| m.text_content().chars().count())
            .sum();
        let target_chars =
            (original_chars as f64 * self.config.current_round_compression_ratio).round() as usize;
        let instruction = self.config.prompts.current_round_compress().to_string();
        let output = self
            .summarize(&instruction, &originals, Some(target_chars))
            .await?;
        let uuid = Uuid::new_v4().to_string();
        let replacement = Msg::assistant(
            COMPRESSION_AGENT_NAME,
            format!("{output}\n{}", offload_hint(&uuid)),
        )
        .with_offload_uuid(&uuid)
        .mark_compressed_current_round();
        self.offload.insert(uuid.clone(), originals.clone());
        self.events.record(
            CompressionEvent::new(CompressionEventType::CurrentRoundMessageCompress, originals.len())
                .with_neighbors(
                    Some(state.working[user_idx].id().to_string()),
                    state.working.get(end + 1).map(|m| m.id().to_string()),
                )
                .with_compressed_message_id(replacement.id())
                .with_offload_uuid(&uuid),
        );
        state.working.splice(start..=end, [replacement]);
        Ok(true)
    }

    /// Builds the shared compression prompt and invokes the summarizer:
    /// instruction, messages, end marker, optional character budget, and the
    /// plan-aware hint last. Plan-tool churn is stripped from the messages
    /// before they reach the summarizer.
    async fn summarize(
        &self,
        instruction: &str,
        msgs: &[Msg],
        char_budget: Option<usize>,
    ) -> Result<String, AgentError> {
        let msgs = filter_plan_related_tool_calls(msgs);
        let mut prompt: Vec<Msg> = Vec::with_capacity(msgs.len() + 4);
        prompt.push(Msg::user(COMPRESSION_AGENT_NAME, instruction));
        prompt.extend_from_slice(&msgs);
        prompt.push(Msg::user(COMPRESSION_AGENT_NAME, COMPRESSION_MESSAGE_LIST_END));
        if let Some(target) = char_budget {
            prompt.push(Msg::user(COMPRESSION_AGENT_NAME, char_budget_requirement(target)));
        }
        let notebook = self.plan_notebook.lock().expect("plan notebook lock").clone();
        if let Some(notebook) = notebook {
            if let Some(plan) = notebook.current_plan() {
                prompt.push(Msg::user(COMPRESSION_AGENT_NAME, plan_aware_hint(&plan)));
            }
        }
        let response = self.llm.invoke(&prompt).await?;
        Ok(response.content)
    }
}

#[async_trait::async_trait]
impl Memory for AutoContextMemory {
    async fn add(&self, msg: Msg) -> Result<(), AgentError> {
        self.add_message(msg).await;
        Ok(())
    }

    async fn messages(&self) -> Result<Vec<Msg>, AgentError> {
        Ok(self.get_messages().await)
    }

    async fn size(&self) -> usize {
        self.state.lock().await.working.len()
    }

    async fn delete(&self, index: usize) -> Result<bool, AgentError> {
        Ok(self.delete_message(index).await)
    }

    async fn clear(&self) -> Result<(), AgentError> {
        AutoContextMemory::clear(self).await;
        Ok(())
    }
}

fn latest_final_assistant_index(msgs: &[Msg]) -> Option<usize> {
    msgs.iter().rposition(|m| m.is_final_assistant_response())
}

fn latest_user_index(msgs: &[Msg]) -> Option<usize> {
    msgs.iter().rposition(|m| m.role() == MsgRole::User)
}

/// Finds the oldest run of strictly more than `min_len` consecutive tool
/// messages entirely inside `msgs[..bound]`, trimmed to start at a tool-use
/// and end at a tool-result. Returns inclusive bounds.
fn find_tool_run(msgs: &[Msg], bound: usize, min_len: usize) -> Option<(usize, usize)> {
    let bound = bound.min(msgs.len());
    let mut i = 0;
    while i < bound {
        if !msgs[i].is_tool_message() {
            i += 1;
            continue;
        }
        let mut j = i;
        while j < bound && msgs[j].is_tool_message() {
            j += 1;
        }
        if j - i > min_len {
            let mut start = i;
            while start < j && !msgs[start].has_tool_use() {
                start += 1;
            }
            let mut end = j;
            while end > start && !msgs[end - 1].has_tool_result() {
                end -= 1;
            }
            if end > start && end - start > min_len {
                return Some((start, end - 1));
            }
        }
        i = j;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlm;

    fn tool_pair(n: u32) -> Vec<Msg> {
        vec![
            Msg::new(
                MsgRole::Assistant,
                "a",
                vec![ContentBlock::tool_use(
                    format!("c{n}"),
                    "search",
                    serde_json::json!({"q": n}),
                )],
            ),
            Msg::tool_result("t", format!("c{n}"), "search", format!("result {n}")),
        ]
    }

    fn small_memory(llm: Arc<MockLlm>, config: AutoContextConfig) -> AutoContextMemory {
        AutoContextMemory::builder().llm(llm).config(config).build().unwrap()
    }

    #[test]
    fn config_defaults_match_envelope() {
        let config = AutoContextConfig::default();
        assert_eq!(config.large_payload_threshold, 5120);
        assert_eq!(config.max_token, 128 * 1024);
        assert!((config.token_ratio - 0.75).abs() < f64::EPSILON);
        assert_eq!(config.offload_single_preview, 200);
        assert_eq!(config.msg_threshold, 100);
        assert_eq!(config.last_keep, 50);
        assert_eq!(config.min_consecutive_tool_messages, 6);
        assert!((config.current_round_compression_ratio - 0.3).abs() < f64::EPSILON);
    }

    #[test]
    fn builder_requires_llm() {
        let err = AutoContextMemory::builder().build().unwrap_err();
        assert!(matches!(err, AgentError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn add_message_feeds_both_stores() {
        let memory = small_memory(Arc::new(MockLlm::with_reply("s")), AutoContextConfig::default());
        memory.add_message(Msg::user("u", "hi")).await;
        memory.add_message(Msg::assistant("a", "hello")).await;
        assert_eq!(memory.get_messages().await.len(), 2);
        assert_eq!(memory.original_messages().await.len(), 2);
    }

    #[tokio::test]
    async fn below_threshold_no_compression_runs() {
        let llm = Arc::new(MockLlm::with_reply("summary"));
        let memory = small_memory(llm.clone(), AutoContextConfig::default());
        for i in 0..10 {
            memory.add_message(Msg::user("u", format!("m{i}"))).await;
        }
        assert!(!memory.compress_if_needed().await);
        assert_eq!(llm.call_count(), 0);
        assert!(memory.compression_events().is_empty());
    }

    #[tokio::test]
    async fn find_tool_run_trims_to_use_and_result() {
        let mut msgs = vec![Msg::user("u", "go")];
        // Leading orphan result, then three full pairs.
        msgs.push(Msg::tool_result("t", "c0", "search", "orphan"));
        for n in 1..=3 {
            msgs.extend(tool_pair(n));
        }
        msgs.push(Msg::assistant("a", "done"));
        let (start, end) = find_tool_run(&msgs, msgs.len() - 1, 3).unwrap();
        // Trimmed past the orphan result: starts at the first tool-use.
        assert!(msgs[start].has_tool_use());
        assert!(msgs[end].has_tool_result());
        assert_eq!(end - start + 1, 6);
    }

    #[tokio::test]
    async fn delete_message_edits_working_store_only() {
        let memory = small_memory(Arc::new(MockLlm::with_reply("s")), AutoContextConfig::default());
        memory.add_message(Msg::user("u", "keep me in audit")).await;
        assert!(memory.delete_message(0).await);
        assert!(!memory.delete_message(3).await);
        assert!(memory.get_messages().await.is_empty());
        assert_eq!(memory.original_messages().await.len(), 1);
    }

    #[tokio::test]
    async fn clear_resets_both_stores_but_not_offload() {
        let memory = small_memory(Arc::new(MockLlm::with_reply("s")), AutoContextConfig::default());
        memory.add_message(Msg::user("u", "x")).await;
        memory.offload("u-1", vec![Msg::user("u", "kept")]);
        memory.clear().await;
        assert!(memory.get_messages().await.is_empty());
        assert!(memory.original_messages().await.is_empty());
        assert_eq!(memory.reload("u-1").len(), 1);
        memory.clear_offload("u-1");
        assert!(memory.reload("u-1").is_empty());
    }
}
