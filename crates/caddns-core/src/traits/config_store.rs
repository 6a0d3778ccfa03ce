// # Config Store Trait
//
// Defines the interface for the persisted configuration document.
//
// ## Purpose
//
// The config store is the single source of truth shared by the two
// execution contexts that never run at the same time:
// - the operator run, which mutates credentials, zone and managed set
// - the scheduled agent run, which only reads
//
// Nothing is cached across the process boundary; every invocation loads the
// document fresh.
//
// ## Implementations
//
// - File-based: `FileConfigStore` (JSON, atomic replace)
// - In-memory: `MemoryConfigStore` (tests, embedding)
//
// ## Usage
//
// ```rust,ignore
// use caddns_core::{ConfigPatch, ConfigStore, SaveMode};
//
// let store = /* ConfigStore implementation */;
//
// store.save(ConfigPatch::api_key("token"), SaveMode::MergeFields).await?;
// let config = store.load().await?;
// ```

use async_trait::async_trait;

use crate::config::{Config, ConfigPatch, SaveMode};

/// Trait for configuration document storage
///
/// # Semantics
///
/// - `load()` never fails because the document is missing; a missing
///   document is created empty.
/// - `save()` is a whole-document read-modify-write. Last writer wins.
/// - A malformed document is never surfaced as state. Implementations
///   recover or start fresh.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Load the document, creating an empty one if absent
    async fn load(&self) -> Result<Config, crate::Error>;

    /// Merge `patch` into the stored document according to `mode`
    ///
    /// # Returns
    ///
    /// The document as written
    async fn save(&self, patch: ConfigPatch, mode: SaveMode) -> Result<Config, crate::Error>;

    /// Delete the whole document
    ///
    /// Deleting an absent document succeeds.
    async fn delete(&self) -> Result<(), crate::Error>;
}
