//! Agent launcher
//!
//! The OS trigger does not run `caddns` directly. It runs a small per-user
//! script that execs the installed binary against the config document:
//!
//! ```text
//! #!/bin/sh
//! exec /usr/local/bin/caddns --config /home/me/.ca-ddns.json run
//! ```
//!
//! The script carries no credential, zone or domain list. Those are read
//! from the document on every run. It is rewritten whenever the managed set
//! changes so it always points at the current binary.

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config;
use crate::error::{Error, Result};

/// Generator for the launcher script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentLauncher {
    launcher_path: PathBuf,
    binary_path: PathBuf,
    config_path: PathBuf,
}

impl AgentLauncher {
    pub fn new(
        launcher_path: impl Into<PathBuf>,
        binary_path: impl Into<PathBuf>,
        config_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            launcher_path: launcher_path.into(),
            binary_path: binary_path.into(),
            config_path: config_path.into(),
        }
    }

    /// Launcher at the default per-user path running the current executable
    pub fn for_current_exe(config_path: impl Into<PathBuf>) -> Result<Self> {
        let binary_path = std::env::current_exe()
            .map_err(|e| Error::config(format!("Cannot locate caddns executable: {}", e)))?;
        Ok(Self::new(
            config::default_agent_path()?,
            binary_path,
            config_path,
        ))
    }

    /// Where the launcher is written
    pub fn path(&self) -> &Path {
        &self.launcher_path
    }

    /// Script contents for this platform
    pub fn render(&self) -> String {
        let binary = self.binary_path.to_string_lossy();
        let config = self.config_path.to_string_lossy();

        if cfg!(windows) {
            format!(
                "@echo off\r\nrem Generated by caddns. Rewritten whenever the managed domain set changes.\r\n\"{}\" --config \"{}\" run\r\n",
                binary, config
            )
        } else {
            format!(
                "#!/bin/sh\n# Generated by caddns. Rewritten whenever the managed domain set changes.\nexec {} --config {} run\n",
                sh_quote(&binary),
                sh_quote(&config)
            )
        }
    }

    /// Write the launcher, replacing any previous version
    ///
    /// On Unix the file is made executable (`0755`).
    pub async fn write(&self) -> Result<&Path> {
        if let Some(parent) = self.launcher_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        tokio::fs::write(&self.launcher_path, self.render()).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&self.launcher_path, std::fs::Permissions::from_mode(0o755))
                .await?;
        }

        debug!("Wrote agent launcher {}", self.launcher_path.display());
        Ok(&self.launcher_path)
    }
}

fn sh_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
