// # File Config Store
//
// File-based implementation of ConfigStore with crash recovery.
//
// ## Purpose
//
// Holds the configuration document shared by the operator run and the
// scheduled agent run. Every operation goes to disk; nothing is cached in
// the store between calls.
//
// ## Crash Recovery
//
// - Atomic writes: Uses write-then-rename for atomicity
// - Corruption detection: Validates JSON on load
// - Automatic backup: Keeps .backup of the previous document
// - Recovery: Falls back to backup if corruption detected, otherwise starts
//   from an empty document and moves the corrupted file aside
//
// ## Permissions
//
// The document holds the API token, so on Unix it is written with mode 0600.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, trace, warn};

use crate::Error;
use crate::config::{Config, ConfigPatch, SaveMode};
use crate::traits::config_store::ConfigStore;

/// File-based configuration store
///
/// # Example
///
/// ```rust,no_run
/// use caddns_core::store::FileConfigStore;
/// use caddns_core::traits::ConfigStore;
/// use caddns_core::{ConfigPatch, SaveMode};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileConfigStore::new("/home/me/.ca-ddns.json").await?;
///
///     store.save(ConfigPatch::api_key("token"), SaveMode::MergeFields).await?;
///
///     let config = store.load().await?;
///     assert_eq!(config.api_key.as_deref(), Some("token"));
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

/// Outcome of reading the document from disk
enum ReadOutcome {
    Missing,
    Parsed(Config),
    Corrupted(String),
}

impl FileConfigStore {
    /// Create a store for the document at `path`
    ///
    /// Creates parent directories if needed. The document itself is created
    /// on first `load()`.
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    Error::config(format!(
                        "Failed to create config directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        Ok(Self { path })
    }

    /// Path of the configuration document
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse a document without any recovery
    async fn read_document(path: &Path) -> Result<ReadOutcome, Error> {
        let bytes = match fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ReadOutcome::Missing);
            }
            Err(e) => {
                return Err(Error::config(format!(
                    "Failed to read config file {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        let content = match std::str::from_utf8(&bytes) {
            Ok(content) => content,
            Err(e) => return Ok(ReadOutcome::Corrupted(format!("invalid UTF-8: {}", e))),
        };

        // An empty file is what a crash between create and write leaves behind
        if content.trim().is_empty() {
            return Ok(ReadOutcome::Parsed(Config::default()));
        }

        match serde_json::from_str::<Config>(content) {
            Ok(config) => Ok(ReadOutcome::Parsed(config)),
            Err(e) => Ok(ReadOutcome::Corrupted(e.to_string())),
        }
    }

    /// Load the document with automatic recovery
    ///
    /// Recovery strategy:
    /// 1. Missing document: write `{}` and return the empty default
    /// 2. Corrupted document: try the backup and restore it
    /// 3. Backup missing or corrupted too: move the document aside and
    ///    start from `{}`
    async fn load_with_recovery(&self) -> Result<Config, Error> {
        let err = match Self::read_document(&self.path).await? {
            ReadOutcome::Parsed(config) => {
                trace!("Loaded config from {}", self.path.display());
                return Ok(config);
            }
            ReadOutcome::Missing => {
                debug!(
                    "Config file {} does not exist, creating empty document",
                    self.path.display()
                );
                let config = Config::default();
                self.write_document(&config).await?;
                return Ok(config);
            }
            ReadOutcome::Corrupted(err) => err,
        };

        warn!(
            "Config file {} appears corrupted: {}. Attempting recovery from backup.",
            self.path.display(),
            err
        );

        let backup_path = Self::backup_path(&self.path);
        if let Ok(ReadOutcome::Parsed(config)) = Self::read_document(&backup_path).await {
            info!("Recovered config from backup {}", backup_path.display());
            if let Err(restore_err) = fs::copy(&backup_path, &self.path).await {
                error!("Failed to restore config file from backup: {}", restore_err);
            }
            return Ok(config);
        }

        warn!("No usable backup found. Starting with an empty configuration.");
        let corrupt_path = Self::corrupt_path(&self.path);
        if let Err(e) = fs::rename(&self.path, &corrupt_path).await {
            warn!(
                "Failed to move corrupted config aside to {}: {}",
                corrupt_path.display(),
                e
            );
        }

        let config = Config::default();
        self.write_document(&config).await?;
        Ok(config)
    }

    /// Write the document atomically
    async fn write_document(&self, config: &Config) -> Result<(), Error> {
        let json = serde_json::to_string_pretty(config)
            .map_err(|e| Error::config(format!("Failed to serialize config: {}", e)))?;

        // Write to temporary file first
        let temp_path = self.temp_path();
        {
            let mut file = Self::create_private(&temp_path).await.map_err(|e| {
                Error::config(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.write_all(json.as_bytes()).await.map_err(|e| {
                Error::config(format!(
                    "Failed to write to temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.sync_all().await.map_err(|e| {
                Error::config(format!(
                    "Failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        // Create backup of current file (if it exists)
        if self.path.exists() {
            let backup_path = Self::backup_path(&self.path);
            if let Err(e) = fs::copy(&self.path, &backup_path).await {
                warn!("Failed to create config backup: {}", e);
            }
        }

        // Atomic rename (temp -> actual)
        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::config(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        trace!("Config written to {}", self.path.display());
        Ok(())
    }

    #[cfg(unix)]
    async fn create_private(path: &Path) -> std::io::Result<fs::File> {
        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true).mode(0o600);
        options.open(path).await
    }

    #[cfg(not(unix))]
    async fn create_private(path: &Path) -> std::io::Result<fs::File> {
        fs::File::create(path).await
    }

    /// Remove a file, treating absence as success
    async fn remove_if_exists(path: &Path) -> Result<(), Error> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::config(format!(
                "Failed to delete {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Get path to temporary file for atomic writes
    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    /// Get path to backup file
    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }

    /// Get path a corrupted document is moved to
    fn corrupt_path(path: &Path) -> PathBuf {
        let mut corrupt = path.to_path_buf();
        corrupt.set_extension("corrupt");
        corrupt
    }
}

#[async_trait]
impl ConfigStore for FileConfigStore {
    async fn load(&self) -> Result<Config, Error> {
        self.load_with_recovery().await
    }

    async fn save(&self, patch: ConfigPatch, mode: SaveMode) -> Result<Config, Error> {
        let config = self.load_with_recovery().await?.apply(patch, mode);
        self.write_document(&config).await?;
        debug!("Saved config ({:?})", mode);
        Ok(config)
    }

    async fn delete(&self) -> Result<(), Error> {
        Self::remove_if_exists(&self.path).await?;
        // The backup holds the credential too
        Self::remove_if_exists(&Self::backup_path(&self.path)).await?;
        Self::remove_if_exists(&Self::corrupt_path(&self.path)).await?;
        Self::remove_if_exists(&self.temp_path()).await?;
        info!("Deleted config {}", self.path.display());
        Ok(())
    }
}
