//! Zone discovery
//!
//! Operator-side helpers that resolve the zone once and cache what the
//! zone contains, so picking domains to manage needs no further API calls.

use tracing::{debug, info};

use crate::config::{Config, ConfigPatch, SaveMode, normalize_domain};
use crate::error::Result;
use crate::traits::{ConfigStore, DnsProvider};

/// Zone id for `zone_name`, resolving and caching it on first use
///
/// A zone id already in the document is returned as-is. Nothing is written
/// if resolution fails.
pub async fn resolve_zone(
    store: &dyn ConfigStore,
    provider: &dyn DnsProvider,
    zone_name: &str,
) -> Result<String> {
    let config = store.load().await?;
    if let Some(zone_id) = config.zone_id.filter(|z| !z.trim().is_empty()) {
        debug!("Using cached zone id {}", zone_id);
        return Ok(zone_id);
    }

    let zone_name = normalize_domain(zone_name);
    let zone_id = provider.resolve_zone_id(&zone_name).await?;
    store
        .save(ConfigPatch::zone_id(&zone_id), SaveMode::MergeFields)
        .await?;
    info!("Resolved zone {} to {}", zone_name, zone_id);
    Ok(zone_id)
}

/// List every A-record name in the cached zone and store them as `possible`
pub async fn discover_records(
    store: &dyn ConfigStore,
    provider: &dyn DnsProvider,
) -> Result<Vec<String>> {
    let config = store.load().await?;
    let zone_id = config.require_zone_id()?;

    let records = provider.list_a_records(zone_id, None).await?;
    let saved = store
        .save(
            ConfigPatch::possible(records.iter().map(|r| r.name.as_str())),
            SaveMode::MergeFields,
        )
        .await?;
    info!("Discovered {} A record(s)", saved.possible.len());
    Ok(saved.possible)
}

/// Discovered names not yet managed (`possible \ domains`)
pub fn addable_candidates(config: &Config) -> Vec<String> {
    config
        .possible
        .iter()
        .filter(|name| !config.domains.contains(name))
        .cloned()
        .collect()
}
