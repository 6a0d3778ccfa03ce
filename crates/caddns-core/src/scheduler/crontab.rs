//! Crontab back-end
//!
//! The user's crontab is read with `crontab -l`, edited as text and written
//! back whole with `crontab -`. Our line is recognised by the agent path it
//! contains, either raw or in the escaped form `agent_line` writes; every
//! other line is passed through untouched.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::Schedule;
use crate::error::{Error, Result};
use crate::traits::{CommandRunner, TaskScheduler};

const CRONTAB: &str = "crontab";

/// Scheduler backed by the invoking user's crontab
pub struct CrontabScheduler {
    agent_path: PathBuf,
    runner: Box<dyn CommandRunner>,
}

impl std::fmt::Debug for CrontabScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrontabScheduler")
            .field("agent_path", &self.agent_path)
            .finish()
    }
}

impl CrontabScheduler {
    /// `agent_path` identifies the line `remove()` deletes
    pub fn new(agent_path: impl Into<PathBuf>, runner: Box<dyn CommandRunner>) -> Self {
        Self {
            agent_path: agent_path.into(),
            runner,
        }
    }

    async fn read_table(&self) -> Result<String> {
        let output = self.runner.run(CRONTAB, &["-l".to_string()], None).await?;
        if output.success {
            return Ok(output.stdout);
        }

        // Users who never had a crontab get "no crontab for <user>"
        if output.stderr.to_ascii_lowercase().contains("no crontab") {
            debug!("No crontab for current user, starting from an empty table");
            return Ok(String::new());
        }

        Err(Error::scheduler(format!(
            "crontab -l failed: {}",
            output.stderr.trim()
        )))
    }

    async fn write_table(&self, table: &str) -> Result<()> {
        let output = self
            .runner
            .run(CRONTAB, &["-".to_string()], Some(table))
            .await?;
        if !output.success {
            return Err(Error::scheduler(format!(
                "crontab - failed: {}",
                output.stderr.trim()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl TaskScheduler for CrontabScheduler {
    async fn install(&self, agent_path: &Path, schedule: &Schedule) -> Result<()> {
        let table = self.read_table().await?;
        let line = agent_line(agent_path, schedule);
        let table = strip_agent_lines(&table, &path_text(&self.agent_path));
        let table = with_agent_line(&table, &path_text(agent_path), &line);
        self.write_table(&table).await?;
        info!("Installed crontab entry: {}", line);
        Ok(())
    }

    async fn remove(&self) -> Result<()> {
        let table = self.read_table().await?;
        let agent = path_text(&self.agent_path);
        let stripped = strip_agent_lines(&table, &agent);
        if stripped == table {
            debug!("No crontab entry for {}, nothing to remove", agent);
            return Ok(());
        }
        self.write_table(&stripped).await?;
        info!("Removed crontab entry for {}", agent);
        Ok(())
    }

    fn scheduler_name(&self) -> &'static str {
        "crontab"
    }
}

fn path_text(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// The crontab line that runs `agent_path` on `schedule`
///
/// Output is appended to `<agent>.log` next to the launcher.
pub fn agent_line(agent_path: &Path, schedule: &Schedule) -> String {
    let agent = path_text(agent_path);
    format!(
        "{} {} >> {} 2>&1",
        schedule.cron_expr(),
        cron_word(&agent),
        cron_word(&format!("{}.log", agent))
    )
}

/// Whether `line` runs the agent at `agent`
fn mentions_agent(line: &str, agent: &str) -> bool {
    line.contains(agent) || line.contains(&cron_word(agent))
}

/// Remove every line that mentions `agent`
///
/// Other lines, comments and blank lines included, are kept in order.
/// The result ends with a newline unless it is empty.
pub fn strip_agent_lines(table: &str, agent: &str) -> String {
    let kept: Vec<&str> = table
        .lines()
        .filter(|line| !mentions_agent(line, agent))
        .collect();
    if kept.is_empty() {
        String::new()
    } else {
        let mut out = kept.join("\n");
        out.push('\n');
        out
    }
}

/// Replace any existing line for `agent` with `line`
pub fn with_agent_line(table: &str, agent: &str, line: &str) -> String {
    let mut out = strip_agent_lines(table, agent);
    out.push_str(line);
    out.push('\n');
    out
}

/// Shell-quote `value` for a crontab command field
///
/// cron turns a bare `%` into a newline, so it is escaped even inside quotes.
fn cron_word(value: &str) -> String {
    shell_quote(value).replace('%', r"\%")
}

fn shell_quote(value: &str) -> String {
    let plain = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "/._-+:@".contains(c));
    if plain && !value.is_empty() {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}
