//! Domain-set reconciler
//!
//! Every change to the managed set goes through here so that the launcher,
//! the OS trigger and the document stay consistent:
//!
//! 1. compute the new set
//! 2. empty set: tear everything down
//! 3. otherwise check credentials and zone, rewrite the launcher,
//!    reinstall the trigger, persist the set
//!
//! Scheduler failures are logged and do not stop the set from being saved;
//! the next successful change reinstalls the trigger.

use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{ConfigPatch, SaveMode, normalize_domains};
use crate::error::Result;
use crate::launcher::AgentLauncher;
use crate::scheduler::Schedule;
use crate::traits::{ConfigStore, TaskScheduler};

/// Result of a domain-set change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// The set was saved and the agent (re)installed
    Provisioned { domains: Vec<String> },
    /// The set became empty and everything was removed
    TornDown,
    /// Nothing was managed, so a removal had nothing to act on
    NothingManaged,
}

/// Applies domain-set changes and keeps the agent installation in step
pub struct DomainSetReconciler {
    store: Arc<dyn ConfigStore>,
    scheduler: Box<dyn TaskScheduler>,
    launcher: AgentLauncher,
    schedule: Schedule,
}

impl DomainSetReconciler {
    pub fn new(
        store: Arc<dyn ConfigStore>,
        scheduler: Box<dyn TaskScheduler>,
        launcher: AgentLauncher,
    ) -> Self {
        Self {
            store,
            scheduler,
            launcher,
            schedule: Schedule::default(),
        }
    }

    /// Use `schedule` instead of the midnight default
    pub fn with_schedule(mut self, schedule: Schedule) -> Self {
        self.schedule = schedule;
        self
    }

    /// Add `names` to the managed set
    pub async fn add_domains<I, S>(&self, names: I) -> Result<ProvisionOutcome>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let config = self.store.load().await?;
        let next = union(&config.domains, names);
        self.apply(next).await
    }

    /// Remove `names` from the managed set
    ///
    /// Removing the last domain tears the installation down. When nothing
    /// is managed the document is left alone, credential and zone included.
    pub async fn remove_domains<I, S>(&self, names: I) -> Result<ProvisionOutcome>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let config = self.store.load().await?;
        if config.domains.is_empty() {
            info!("No managed domains, nothing to remove");
            return Ok(ProvisionOutcome::NothingManaged);
        }
        let next = difference(&config.domains, names);
        self.apply(next).await
    }

    /// Make `names` the managed set
    pub async fn replace_domains<I, S>(&self, names: I) -> Result<ProvisionOutcome>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.apply(normalize_domains(names)).await
    }

    /// Remove the trigger, the launcher and the config document
    pub async fn teardown(&self) -> Result<()> {
        if let Err(e) = self.scheduler.remove().await {
            warn!(
                "Failed to remove {} trigger: {}",
                self.scheduler.scheduler_name(),
                e
            );
        }
        if let Err(e) = self.scheduler.uninstall_agent_file(self.launcher.path()).await {
            warn!("{}", e);
        }
        self.store.delete().await?;
        info!("Removed agent and configuration");
        Ok(())
    }

    async fn apply(&self, domains: Vec<String>) -> Result<ProvisionOutcome> {
        if domains.is_empty() {
            info!("Managed set is empty, tearing down");
            self.teardown().await?;
            return Ok(ProvisionOutcome::TornDown);
        }

        let config = self.store.load().await?;
        config.require_api_key()?;
        config.require_zone_id()?;

        let launcher = self.launcher.write().await?;

        if let Err(e) = self.scheduler.remove().await {
            warn!(
                "Failed to remove previous {} trigger: {}",
                self.scheduler.scheduler_name(),
                e
            );
        }
        if let Err(e) = self.scheduler.install(launcher, &self.schedule).await {
            warn!(
                "Failed to install {} trigger: {}",
                self.scheduler.scheduler_name(),
                e
            );
        }

        let saved = self
            .store
            .save(ConfigPatch::domains(&domains), SaveMode::ReplaceDomains)
            .await?;
        info!("Managing {} domain(s): {}", saved.domains.len(), saved.domains.join(", "));

        Ok(ProvisionOutcome::Provisioned {
            domains: saved.domains,
        })
    }
}

/// `current ∪ added`, keeping `current`'s order and appending new names
pub fn union<I, S>(current: &[String], added: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    normalize_domains(
        current
            .iter()
            .cloned()
            .chain(added.into_iter().map(|s| s.as_ref().to_owned())),
    )
}

/// `current \ removed`, keeping `current`'s order
pub fn difference<I, S>(current: &[String], removed: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let removed = normalize_domains(removed);
    normalize_domains(current)
        .into_iter()
        .filter(|name| !removed.contains(name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_union() {
        assert_eq!(union(&set(&["a", "b"]), ["c"]), set(&["a", "b", "c"]));
        assert_eq!(union(&set(&["a", "b"]), ["B.", "a"]), set(&["a", "b"]));
        assert_eq!(union(&[], ["x", "x"]), set(&["x"]));
    }

    #[test]
    fn test_difference() {
        assert_eq!(difference(&set(&["a", "b", "c"]), ["a"]), set(&["b", "c"]));
        assert_eq!(difference(&set(&["a"]), ["A"]), Vec::<String>::new());
        assert_eq!(difference(&set(&["a", "b"]), ["z"]), set(&["a", "b"]));
    }
}
