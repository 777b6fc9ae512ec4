use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

/// Key/value persistence bridging `begin_authentication` and the callback
/// request. Implementations are typically backed by the relying party's
/// session, cache, or database layer.
///
/// Keys are `.`-joined strings namespaced by the attempt's state value, so
/// concurrent attempts never share keys and the store needs no coordination
/// beyond what its backing medium already provides.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;

    /// Stores `value` under `key`. `None` records an explicitly absent value
    /// and must read back as absent.
    async fn set(&self, key: &str, value: Option<&str>) -> anyhow::Result<()>;
}

/// In-memory store for tests and single-process consumers.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    entries: RwLock<HashMap<String, Option<String>>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned().flatten())
    }

    async fn set(&self, key: &str, value: Option<&str>) -> anyhow::Result<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.map(str::to_string));
        Ok(())
    }
}
