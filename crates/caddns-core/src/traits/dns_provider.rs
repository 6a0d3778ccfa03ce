// # DNS Provider Trait
//
// Defines the interface for the DNS provider's HTTP API.
//
// ## Implementations
//
// - Cloudflare: `caddns-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use caddns_core::DnsProvider;
//
// let provider = /* DnsProvider implementation */;
// let zone_id = provider.resolve_zone_id("example.com").await?;
//
// if let Some(record) = provider.get_a_record(&zone_id, "home.example.com").await? {
//     provider
//         .update_record(&zone_id, &record.record_id, &record.name, "5.6.7.8".parse()?)
//         .await?;
// }
// ```

use async_trait::async_trait;
use std::net::Ipv4Addr;

/// TTL written on every update, in seconds
pub const RECORD_TTL_SECS: u32 = 120;

/// An A record as currently stored at the provider
///
/// Always fetched fresh; never persisted or cached between cycles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedRecord {
    /// Fully-qualified record name
    pub name: String,
    /// Provider-assigned record identifier
    pub record_id: String,
    /// Current record content (the IPv4 address as text)
    pub content: String,
}

impl ManagedRecord {
    pub fn new(
        name: impl Into<String>,
        record_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            record_id: record_id.into(),
            content: content.into(),
        }
    }

    /// True if the record already points at `ip`
    ///
    /// Content that does not parse as IPv4 never matches, so it gets
    /// overwritten.
    pub fn points_at(&self, ip: Ipv4Addr) -> bool {
        self.content.trim().parse::<Ipv4Addr>().ok() == Some(ip)
    }
}

/// Trait for DNS provider implementations
///
/// Implementations are stateless façades: every call performs fresh HTTP
/// requests and nothing is cached between calls. The caller (config store)
/// owns caching of the zone id.
///
/// # Errors
///
/// - `Error::Transport` when the request could not be completed
/// - `Error::Provider { code, message }` when the API reports `success: false`
/// - `Error::NotFound` when a zone lookup returns zero results
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Resolve a zone name (e.g. "example.com") to the provider's zone id
    async fn resolve_zone_id(&self, zone_name: &str) -> Result<String, crate::Error>;

    /// List A records in a zone, optionally filtered by exact name
    async fn list_a_records(
        &self,
        zone_id: &str,
        name: Option<&str>,
    ) -> Result<Vec<ManagedRecord>, crate::Error>;

    /// Fetch a single A record by name
    ///
    /// # Returns
    ///
    /// - `Ok(Some(record))`: First record matching the name
    /// - `Ok(None)`: No A record with that name exists
    async fn get_a_record(
        &self,
        zone_id: &str,
        name: &str,
    ) -> Result<Option<ManagedRecord>, crate::Error> {
        Ok(self
            .list_a_records(zone_id, Some(name))
            .await?
            .into_iter()
            .next())
    }

    /// Full-replace update of an A record
    ///
    /// Writes `ip` with TTL [`RECORD_TTL_SECS`] and proxying disabled.
    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        name: &str,
        ip: Ipv4Addr,
    ) -> Result<(), crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
