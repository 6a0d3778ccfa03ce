//! OS scheduling back-ends
//!
//! The agent is run once a day by whatever recurring-task facility the host
//! offers. Two are supported:
//!
//! - [`CrontabScheduler`]: the invoking user's crontab (Linux, macOS, BSD)
//! - [`SchtasksScheduler`]: a named daily task via `schtasks.exe` (Windows)
//!
//! [`for_host`] picks one at startup. Everything else is written against
//! the [`TaskScheduler`](crate::traits::TaskScheduler) trait.

pub mod crontab;
pub mod schtasks;

pub use crontab::CrontabScheduler;
pub use schtasks::SchtasksScheduler;

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Error, Result};
use crate::traits::{CommandOutput, CommandRunner, TaskScheduler};

/// Daily trigger time, local to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Schedule {
    hour: u8,
    minute: u8,
}

impl Schedule {
    /// Trigger at `hour:minute` every day
    pub fn daily_at(hour: u8, minute: u8) -> Result<Self> {
        if hour > 23 || minute > 59 {
            return Err(Error::invalid_input(format!(
                "Invalid trigger time {:02}:{:02}",
                hour, minute
            )));
        }
        Ok(Self { hour, minute })
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    /// Five-field cron expression, e.g. `30 4 * * *`
    pub fn cron_expr(&self) -> String {
        format!("{} {} * * *", self.minute, self.hour)
    }

    /// Start time in the `HH:MM` form `schtasks /ST` expects
    pub fn start_time(&self) -> String {
        format!("{:02}:{:02}", self.hour, self.minute)
    }
}

impl std::str::FromStr for Schedule {
    type Err = Error;

    /// Parse `HH:MM`
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::invalid_input(format!("Expected HH:MM, got {:?}", s));
        let (hour, minute) = s.trim().split_once(':').ok_or_else(invalid)?;
        let hour = hour.parse::<u8>().map_err(|_| invalid())?;
        let minute = minute.parse::<u8>().map_err(|_| invalid())?;
        Self::daily_at(hour, minute)
    }
}

/// Runs programs on the host with `tokio::process`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        stdin: Option<&str>,
    ) -> Result<CommandOutput> {
        debug!("Running {} {:?}", program, args);

        let mut command = Command::new(program);
        command
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            });

        let mut child = command
            .spawn()
            .map_err(|e| Error::scheduler(format!("Failed to start {}: {}", program, e)))?;

        if let Some(input) = stdin {
            if let Some(mut pipe) = child.stdin.take() {
                pipe.write_all(input.as_bytes()).await.map_err(|e| {
                    Error::scheduler(format!("Failed to write to {} stdin: {}", program, e))
                })?;
                // Dropping the pipe closes it so the child sees EOF
            }
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| Error::scheduler(format!("Failed to wait for {}: {}", program, e)))?;

        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Select the scheduling back-end for the running OS
///
/// `agent_path` is the launcher the trigger executes; the crontab back-end
/// needs it to recognise its own line on removal.
pub fn for_host(agent_path: &Path) -> Box<dyn TaskScheduler> {
    if cfg!(windows) {
        Box::new(SchtasksScheduler::new(Box::new(SystemCommandRunner)))
    } else {
        Box::new(CrontabScheduler::new(agent_path, Box::new(SystemCommandRunner)))
    }
}
