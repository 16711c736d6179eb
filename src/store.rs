//! Asynchronous key/value persistence with change notification.
//!
//! The store is the single source of truth for configuration. Writes are
//! atomic per mutation and fan a [`StoreChange`] out to every subscriber —
//! including writes that reproduce the existing value, so consumers must be
//! idempotent under redundant notifications. Concurrent writers are
//! last-write-wins; there are no transactions.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{RwLock, broadcast};

use crate::config::Config;
use crate::error::BridgeResult;

/// Key holding the shared [`Config`] blob.
pub const CONFIG_KEY: &str = "config";
/// Key holding the cached credential, independent of `Config`.
pub const TOKEN_KEY: &str = "token";

/// A change event delivered to every subscriber on any write.
#[derive(Debug, Clone)]
pub struct StoreChange {
    pub key: String,
    pub new_value: Option<Value>,
    pub old_value: Option<Value>,
}

/// Async key/value persistence with change notification.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn get(&self, key: &str) -> BridgeResult<Option<Value>>;

    async fn set(&self, key: &str, value: Value) -> BridgeResult<()>;

    /// Subscribe to change events. Fires for any write from any context,
    /// redundant writes included.
    fn subscribe(&self) -> broadcast::Receiver<StoreChange>;

    /// Load the shared config, defaulting to empty lists on first use.
    async fn load_config(&self) -> BridgeResult<Config> {
        match self.get(CONFIG_KEY).await? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(Config::default()),
        }
    }

    async fn save_config(&self, config: &Config) -> BridgeResult<()> {
        self.set(CONFIG_KEY, serde_json::to_value(config)?).await
    }

    async fn load_token(&self) -> BridgeResult<Option<String>> {
        match self.get(TOKEN_KEY).await? {
            Some(Value::String(token)) => Ok(Some(token)),
            Some(other) => Ok(serde_json::from_value(other).ok()),
            None => Ok(None),
        }
    }

    async fn save_token(&self, token: &str) -> BridgeResult<()> {
        self.set(TOKEN_KEY, Value::String(token.to_string())).await
    }
}

// ── In-memory store ─────────────────────────────────────────────────────────

/// Volatile store for tests and single-process embedding.
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Value>>,
    changes: broadcast::Sender<StoreChange>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(64);
        Self {
            entries: RwLock::new(HashMap::new()),
            changes,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConfigStore for MemoryStore {
    async fn get(&self, key: &str) -> BridgeResult<Option<Value>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> BridgeResult<()> {
        let old_value = {
            let mut entries = self.entries.write().await;
            entries.insert(key.to_string(), value.clone())
        };
        let _ = self.changes.send(StoreChange {
            key: key.to_string(),
            new_value: Some(value),
            old_value,
        });
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }
}

// ── File-backed store ───────────────────────────────────────────────────────

/// Durable store keeping one JSON blob per key under a root directory.
///
/// Writes go to a temp file in the same directory and are renamed into place,
/// so a crash mid-write never leaves a torn blob. Change notification covers
/// writes made through this instance.
pub struct JsonFileStore {
    root: PathBuf,
    changes: broadcast::Sender<StoreChange>,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let (changes, _) = broadcast::channel(64);
        Self {
            root: root.into(),
            changes,
        }
    }

    /// Default on-disk location under the user's home directory.
    pub fn default_root() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".pagebridge")
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }
}

#[async_trait]
impl ConfigStore for JsonFileStore {
    async fn get(&self, key: &str) -> BridgeResult<Option<Value>> {
        let path = self.path_for(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn set(&self, key: &str, value: Value) -> BridgeResult<()> {
        let old_value = self.get(key).await?;

        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.path_for(key);
        let tmp = self.root.join(format!("{key}.json.tmp"));
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(&value)?).await?;
        tokio::fs::rename(&tmp, &path).await?;

        let _ = self.changes.send(StoreChange {
            key: key.to_string(),
            new_value: Some(value),
            old_value,
        });
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }
}
