//! Offload store: UUID-keyed side store holding the originals of compressed
//! message ranges.
//!
//! Populated by compression strategies before the working store is mutated;
//! read concurrently by the `context_reload` tool while the owning memory keeps
//! writing, hence the concurrency-safe map.

use std::collections::HashMap;

use dashmap::DashMap;

use crate::message::Msg;

/// UUID → ordered original messages.
#[derive(Default)]
pub struct OffloadStore {
    entries: DashMap<String, Vec<Msg>>,
}

impl OffloadStore {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Stores the originals under `uuid`, replacing any previous entry.
    pub fn insert(&self, uuid: impl Into<String>, msgs: Vec<Msg>) {
        self.entries.insert(uuid.into(), msgs);
    }

    /// The originals stored under `uuid`; empty when absent.
    pub fn get(&self, uuid: &str) -> Vec<Msg> {
        self.entries
            .get(uuid)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// True if an entry exists for `uuid`.
    pub fn contains(&self, uuid: &str) -> bool {
        self.entries.contains_key(uuid)
    }

    /// Removes the entry under `uuid`.
    pub fn remove(&self, uuid: &str) {
        self.entries.remove(uuid);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of all entries, for observability and persistence.
    pub fn snapshot(&self) -> HashMap<String, Vec<Msg>> {
        self.entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    /// Replaces the whole store with `entries` (used when loading a session).
    pub fn restore(&self, entries: HashMap<String, Vec<Msg>>) {
        self.entries.clear();
        for (uuid, msgs) in entries {
            self.entries.insert(uuid, msgs);
        }
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_get_remove() {
        let store = OffloadStore::new();
        assert!(store.is_empty());
        store.insert("u1", vec![Msg::user("u", "original")]);
        assert_eq!(store.len(), 1);
        assert!(store.contains("u1"));
        let msgs = store.get("u1");
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].text_content(), "original");

        store.remove("u1");
        assert!(store.get("u1").is_empty());
    }

    #[test]
    fn absent_uuid_yields_empty_not_error() {
        let store = OffloadStore::new();
        assert!(store.get("missing").is_empty());
    }

    #[test]
    fn snapshot_and_restore_round_trip() {
        let store = OffloadStore::new();
        store.insert("u1", vec![Msg::user("u", "a")]);
        store.insert("u2", vec![Msg::assistant("a", "b")]);
        let snapshot = store.snapshot();

        let other = OffloadStore::new();
        other.restore(snapshot);
        assert_eq!(other.len(), 2);
        assert_eq!(other.get("u2")[0].text_content(), "b");
    }
}
