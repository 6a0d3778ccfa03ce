// # Memory Config Store
//
// In-memory implementation of ConfigStore.
//
// ## Purpose
//
// Behaves like the file store (absent document reads as `{}`, whole-document
// merges, delete resets to absent) without touching disk. Used by tests and
// by code embedding the core as a library.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::config::{Config, ConfigPatch, SaveMode};
use crate::traits::config_store::ConfigStore;

/// In-memory config store implementation
///
/// Clones share the same document.
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigStore {
    inner: Arc<RwLock<Option<Config>>>,
}

impl MemoryConfigStore {
    /// Create a store with no document
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `config`
    pub fn with_config(config: Config) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Some(config))),
        }
    }

    /// Whether a document currently exists
    pub async fn exists(&self) -> bool {
        self.inner.read().await.is_some()
    }

    /// Snapshot of the document without creating it
    pub async fn peek(&self) -> Option<Config> {
        self.inner.read().await.clone()
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn load(&self) -> Result<Config, Error> {
        let mut guard = self.inner.write().await;
        Ok(guard.get_or_insert_with(Config::default).clone())
    }

    async fn save(&self, patch: ConfigPatch, mode: SaveMode) -> Result<Config, Error> {
        let mut guard = self.inner.write().await;
        let config = guard.take().unwrap_or_default().apply(patch, mode);
        *guard = Some(config.clone());
        Ok(config)
    }

    async fn delete(&self) -> Result<(), Error> {
        *self.inner.write().await = None;
        Ok(())
    }
}
