//! Session persistence collaborator: JSON values under a key/sub-key pair.
//!
//! The auto-context memory serializes its working, original, and offload
//! stores through this trait. Missing entries yield `None`, never an error.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::SessionError;

/// Key/value session storage with one nesting level.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Stores `value` under `(key, sub_key)`, replacing any previous value.
    async fn save(
        &self,
        key: &str,
        sub_key: &str,
        value: serde_json::Value,
    ) -> Result<(), SessionError>;

    /// Loads the value under `(key, sub_key)`; absent keys yield `None`.
    async fn get(&self, key: &str, sub_key: &str) -> Result<Option<serde_json::Value>, SessionError>;
}

/// Composite map key: key and sub-key joined by "\0".
fn map_key(key: &str, sub_key: &str) -> String {
    format!("{}\0{}", key, sub_key)
}

/// In-memory session store. Not persistent.
#[derive(Default)]
pub struct InMemorySession {
    inner: Arc<RwLock<HashMap<String, serde_json::Value>>>,
}

impl InMemorySession {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySession {
    async fn save(
        &self,
        key: &str,
        sub_key: &str,
        value: serde_json::Value,
    ) -> Result<(), SessionError> {
        self.inner.write().await.insert(map_key(key, sub_key), value);
        Ok(())
    }

    async fn get(&self, key: &str, sub_key: &str) -> Result<Option<serde_json::Value>, SessionError> {
        Ok(self.inner.read().await.get(&map_key(key, sub_key)).cloned())
    }
}
