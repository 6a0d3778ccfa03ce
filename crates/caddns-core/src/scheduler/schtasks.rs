//! Windows Task Scheduler back-end
//!
//! A single daily task with a fixed name. `/F` on create overwrites any
//! earlier registration, so installing twice never yields two tasks.

use async_trait::async_trait;
use std::path::Path;
use tracing::{info, warn};

use super::Schedule;
use crate::error::{Error, Result};
use crate::traits::{CommandRunner, TaskScheduler};

/// Name the task is registered under
pub const TASK_NAME: &str = "UpdateDNSRecords";

const SCHTASKS: &str = "schtasks";

/// Scheduler backed by `schtasks.exe`
pub struct SchtasksScheduler {
    runner: Box<dyn CommandRunner>,
}

impl std::fmt::Debug for SchtasksScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchtasksScheduler")
            .field("task_name", &TASK_NAME)
            .finish()
    }
}

impl SchtasksScheduler {
    pub fn new(runner: Box<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

/// Arguments for `schtasks /Create`
pub fn create_args(agent_path: &Path, schedule: &Schedule) -> Vec<String> {
    let agent = agent_path.to_string_lossy();
    // /TR is itself a command line, so a path with spaces needs inner quotes
    let task_run = if agent.contains(' ') {
        format!("\"{}\"", agent)
    } else {
        agent.into_owned()
    };

    vec![
        "/Create".to_string(),
        "/SC".to_string(),
        "DAILY".to_string(),
        "/TN".to_string(),
        TASK_NAME.to_string(),
        "/TR".to_string(),
        task_run,
        "/ST".to_string(),
        schedule.start_time(),
        "/F".to_string(),
    ]
}

/// Arguments for `schtasks /Delete`
pub fn delete_args() -> Vec<String> {
    vec![
        "/Delete".to_string(),
        "/TN".to_string(),
        TASK_NAME.to_string(),
        "/F".to_string(),
    ]
}

#[async_trait]
impl TaskScheduler for SchtasksScheduler {
    async fn install(&self, agent_path: &Path, schedule: &Schedule) -> Result<()> {
        let output = self
            .runner
            .run(SCHTASKS, &create_args(agent_path, schedule), None)
            .await?;
        if !output.success {
            return Err(Error::scheduler(format!(
                "schtasks /Create failed: {}",
                output.stderr.trim()
            )));
        }
        info!(
            "Scheduled task {} daily at {}",
            TASK_NAME,
            schedule.start_time()
        );
        Ok(())
    }

    async fn remove(&self) -> Result<()> {
        // Deleting a task that was never created fails; that is expected
        match self.runner.run(SCHTASKS, &delete_args(), None).await {
            Ok(output) if output.success => info!("Removed scheduled task {}", TASK_NAME),
            Ok(output) => warn!(
                "schtasks /Delete for {} failed: {}",
                TASK_NAME,
                output.stderr.trim()
            ),
            Err(e) => warn!("Could not run schtasks /Delete: {}", e),
        }
        Ok(())
    }

    fn scheduler_name(&self) -> &'static str {
        "schtasks"
    }
}
