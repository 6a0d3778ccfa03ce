//! Reconcile agent
//!
//! One unattended pass over the managed domain set, run by the OS trigger.
//!
//! ## Cycle
//!
//! ```text
//!  for each domain (in order)
//!      │
//!      ▼
//!  DnsProvider::get_a_record ── none ──► Missing
//!      │ error ──────────────────────► Failed
//!      ▼
//!  IpSource::current (first need only) ── error ──► Failed
//!      │
//!      ├── content == ip ──► Unchanged
//!      ▼
//!  DnsProvider::update_record ── ok ──► Updated
//!                             └ err ──► Failed
//! ```
//!
//! A failure on one domain never stops the others. The public address is
//! looked up lazily, at most once per cycle, and forgotten when the cycle
//! ends. If the lookup fails it is tried again for the next domain that
//! needs it.

use chrono::{DateTime, Utc};
use std::net::Ipv4Addr;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::traits::{DnsProvider, IpSource};

/// What happened to one domain during a cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainOutcome {
    /// Record already pointed at the current address
    Unchanged { ip: Ipv4Addr },

    /// Record was rewritten
    Updated {
        /// Content before the update, as the provider reported it
        previous: String,
        new: Ipv4Addr,
    },

    /// No A record with this name exists in the zone
    Missing,

    /// Lookup, IP resolution or update failed
    Failed { error: String },
}

/// Outcome for a single domain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainReport {
    pub domain: String,
    pub outcome: DomainOutcome,
}

/// Result of one reconciliation cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// One entry per managed domain, in processing order
    pub domains: Vec<DomainReport>,
}

impl CycleReport {
    pub fn updated_count(&self) -> usize {
        self.count(|o| matches!(o, DomainOutcome::Updated { .. }))
    }

    pub fn unchanged_count(&self) -> usize {
        self.count(|o| matches!(o, DomainOutcome::Unchanged { .. }))
    }

    pub fn missing_count(&self) -> usize {
        self.count(|o| matches!(o, DomainOutcome::Missing))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|o| matches!(o, DomainOutcome::Failed { .. }))
    }

    /// True if any domain failed
    pub fn has_failures(&self) -> bool {
        self.failed_count() > 0
    }

    /// Outcome for `domain`, if it was part of the cycle
    pub fn outcome(&self, domain: &str) -> Option<&DomainOutcome> {
        self.domains
            .iter()
            .find(|r| r.domain == domain)
            .map(|r| &r.outcome)
    }

    fn count(&self, pred: impl Fn(&DomainOutcome) -> bool) -> usize {
        self.domains.iter().filter(|r| pred(&r.outcome)).count()
    }
}

/// Reconciles the managed A records against the current public address
///
/// ## Lifecycle
///
/// 1. Build with [`ReconcileAgent::from_config()`] (or [`ReconcileAgent::new()`])
/// 2. Call [`ReconcileAgent::run_cycle()`] once
/// 3. Drop
///
/// The agent holds no state between cycles; a scheduled run constructs a
/// fresh one from the document it just loaded.
pub struct ReconcileAgent {
    /// DNS provider for reading and updating records
    provider: Box<dyn DnsProvider>,

    /// Public address lookup
    ip_source: Box<dyn IpSource>,

    /// Zone holding every managed record
    zone_id: String,

    /// Managed set, processed in order
    domains: Vec<String>,
}

impl ReconcileAgent {
    pub fn new(
        provider: Box<dyn DnsProvider>,
        ip_source: Box<dyn IpSource>,
        zone_id: impl Into<String>,
        domains: Vec<String>,
    ) -> Self {
        Self {
            provider,
            ip_source,
            zone_id: zone_id.into(),
            domains,
        }
    }

    /// Build an agent for the zone and managed set in `config`
    ///
    /// # Errors
    ///
    /// `Error::Config` if no zone id has been cached yet.
    pub fn from_config(
        config: &Config,
        provider: Box<dyn DnsProvider>,
        ip_source: Box<dyn IpSource>,
    ) -> Result<Self> {
        let zone_id = config.require_zone_id()?;
        Ok(Self::new(
            provider,
            ip_source,
            zone_id,
            config.domains.clone(),
        ))
    }

    /// Domains this agent manages
    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    /// Run one reconciliation pass over every managed domain
    ///
    /// Never fails as a whole; per-domain failures are in the report.
    pub async fn run_cycle(&self) -> CycleReport {
        let started_at = Utc::now();
        info!(
            "Starting cycle for {} domain(s) via {}",
            self.domains.len(),
            self.provider.provider_name()
        );

        let mut current_ip: Option<Ipv4Addr> = None;
        let mut reports = Vec::with_capacity(self.domains.len());

        for domain in &self.domains {
            let outcome = self.reconcile_domain(domain, &mut current_ip).await;
            match &outcome {
                DomainOutcome::Unchanged { ip } => {
                    debug!("{} already points at {}", domain, ip)
                }
                DomainOutcome::Updated { previous, new } => {
                    info!("Updated {}: {} -> {}", domain, previous, new)
                }
                DomainOutcome::Missing => {
                    warn!("No A record for {} in zone, skipping", domain)
                }
                DomainOutcome::Failed { error } => {
                    error!("Failed to reconcile {}: {}", domain, error)
                }
            }
            reports.push(DomainReport {
                domain: domain.clone(),
                outcome,
            });
        }

        let report = CycleReport {
            started_at,
            finished_at: Utc::now(),
            domains: reports,
        };
        info!(
            "Cycle finished: {} updated, {} unchanged, {} missing, {} failed",
            report.updated_count(),
            report.unchanged_count(),
            report.missing_count(),
            report.failed_count()
        );
        report
    }

    async fn reconcile_domain(
        &self,
        domain: &str,
        current_ip: &mut Option<Ipv4Addr>,
    ) -> DomainOutcome {
        let record = match self.provider.get_a_record(&self.zone_id, domain).await {
            Ok(Some(record)) => record,
            Ok(None) => return DomainOutcome::Missing,
            Err(e) => return failed(e),
        };

        let ip = match *current_ip {
            Some(ip) => ip,
            None => match self.ip_source.current().await {
                Ok(ip) => {
                    debug!("Current public IP: {}", ip);
                    *current_ip = Some(ip);
                    ip
                }
                Err(e) => return failed(e),
            },
        };

        if record.points_at(ip) {
            return DomainOutcome::Unchanged { ip };
        }

        match self
            .provider
            .update_record(&self.zone_id, &record.record_id, &record.name, ip)
            .await
        {
            Ok(()) => DomainOutcome::Updated {
                previous: record.content,
                new: ip,
            },
            Err(e) => failed(e),
        }
    }
}

fn failed(error: Error) -> DomainOutcome {
    DomainOutcome::Failed {
        error: error.to_string(),
    }
}
