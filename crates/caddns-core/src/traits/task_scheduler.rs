// # Task Scheduler Trait
//
// Defines the capability of installing and removing the OS-level recurring
// trigger that runs the agent.
//
// ## Implementations
//
// - `CrontabScheduler`: the user's personal crontab (POSIX)
// - `SchtasksScheduler`: a named daily Windows scheduled task
//
// Exactly one is selected per process by `scheduler::for_host()`.

use async_trait::async_trait;
use std::path::Path;
use tracing::debug;

use crate::scheduler::Schedule;

/// Trait for OS scheduling back-ends
///
/// # Idempotence
///
/// `remove()` followed by `install()`, repeated any number of times, leaves
/// exactly one trigger for the agent and never alters unrelated triggers.
#[async_trait]
pub trait TaskScheduler: Send + Sync {
    /// Register the recurring trigger for `agent_path`
    async fn install(&self, agent_path: &Path, schedule: &Schedule) -> Result<(), crate::Error>;

    /// Remove this system's trigger
    ///
    /// A missing trigger is not an error.
    async fn remove(&self) -> Result<(), crate::Error>;

    /// Delete the agent launcher file if it exists
    async fn uninstall_agent_file(&self, path: &Path) -> Result<(), crate::Error> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {
                debug!("Removed agent file {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Agent file {} not present, nothing to remove", path.display());
                Ok(())
            }
            Err(e) => Err(crate::Error::scheduler(format!(
                "Failed to delete agent file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Get the scheduler name (for logging/debugging)
    fn scheduler_name(&self) -> &'static str;
}

/// Captured result of running an external command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Whether the process exited with status 0
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Trait for running external programs
///
/// Schedulers go through this seam instead of spawning processes directly,
/// so their table handling can be exercised without touching the host.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args`, optionally feeding `stdin`
    ///
    /// A non-zero exit is reported through `CommandOutput::success`, not as
    /// an error. `Err` means the process could not be started at all.
    async fn run(
        &self,
        program: &str,
        args: &[String],
        stdin: Option<&str>,
    ) -> Result<CommandOutput, crate::Error>;
}
