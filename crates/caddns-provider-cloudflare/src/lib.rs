// # Cloudflare DNS Provider
//
// Cloudflare API v4 implementation of `DnsProvider` for caddns.
//
// ## Behaviour
//
// - Stateless: every call performs fresh requests, nothing is cached
// - No retries: a failed domain is picked up again by the next scheduled run
// - 30 second request timeout
// - Updates are full replaces: `type`, `name`, `content`, `ttl: 120`,
//   `proxied: false`
//
// ## Security Requirements
//
// - API token NEVER appears in logs or `Debug` output
// - Provider refuses to build with an empty token
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List Zones: GET `/zones?name=...`
// - List DNS Records: GET `/zones/:zone_id/dns_records?type=A&name=...`
// - Update DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use caddns_core::traits::{DnsProvider, ManagedRecord, RECORD_TTL_SECS};
use caddns_core::{Error, Result};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::time::Duration;

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Records requested per page when listing a zone
const PAGE_SIZE: u32 = 100;

const USER_AGENT: &str = concat!("caddns/", env!("CARGO_PKG_VERSION"));

/// Cloudflare response envelope
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiError>,
    result: Option<T>,
    result_info: Option<ResultInfo>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ResultInfo {
    #[serde(default)]
    total_pages: u32,
}

#[derive(Debug, Deserialize)]
struct Zone {
    id: String,
}

#[derive(Debug, Deserialize)]
struct DnsRecord {
    id: String,
    name: String,
    #[serde(default)]
    content: String,
}

impl From<DnsRecord> for ManagedRecord {
    fn from(record: DnsRecord) -> Self {
        ManagedRecord::new(record.name, record.id, record.content)
    }
}

/// Body of the full-replace update
#[derive(Debug, Serialize, PartialEq, Eq)]
struct RecordUpdate<'a> {
    #[serde(rename = "type")]
    record_type: &'static str,
    name: &'a str,
    content: String,
    ttl: u32,
    proxied: bool,
}

impl<'a> RecordUpdate<'a> {
    fn a_record(name: &'a str, ip: Ipv4Addr) -> Self {
        Self {
            record_type: "A",
            name,
            content: ip.to_string(),
            ttl: RECORD_TTL_SECS,
            proxied: false,
        }
    }
}

/// Decoded envelope: the `result` plus paging info, if any
struct Page<T> {
    result: T,
    info: Option<ResultInfo>,
}

/// Parse a Cloudflare response body and check its `success` flag
///
/// - `success: false` → `Error::Provider` with the first reported error
/// - body that is not an envelope → `Error::Provider` carrying the HTTP
///   status if the status was an error, otherwise `Error::Transport`
fn parse_envelope<T: DeserializeOwned>(status: u16, body: &str) -> Result<ApiResponse<T>> {
    let envelope: ApiResponse<T> = match serde_json::from_str(body) {
        Ok(envelope) => envelope,
        Err(e) if (200..300).contains(&status) => {
            return Err(Error::transport(format!("Unreadable Cloudflare response: {}", e)));
        }
        Err(_) => {
            return Err(Error::provider(
                i64::from(status),
                format!("HTTP {}: {}", status, snippet(body)),
            ));
        }
    };

    if !envelope.success {
        return Err(match envelope.errors.into_iter().next() {
            Some(first) if !first.message.is_empty() => Error::provider(first.code, first.message),
            Some(first) => Error::provider(first.code, "Cloudflare reported an error"),
            None => Error::provider(0, "Cloudflare reported an error"),
        });
    }

    Ok(envelope)
}

/// Decode an envelope whose `result` the caller needs
fn decode_envelope<T: DeserializeOwned>(status: u16, body: &str) -> Result<Page<T>> {
    let envelope = parse_envelope::<T>(status, body)?;
    let result = envelope
        .result
        .ok_or_else(|| Error::transport("Cloudflare response has no result"))?;
    Ok(Page {
        result,
        info: envelope.result_info,
    })
}

/// Decode an envelope where only `success` matters; `result` may be absent
fn decode_ack(status: u16, body: &str) -> Result<()> {
    parse_envelope::<IgnoredAny>(status, body).map(|_| ())
}

fn snippet(body: &str) -> &str {
    let body = body.trim();
    match body.char_indices().nth(200) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

/// Cloudflare DNS provider
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the API token.
pub struct CloudflareProvider {
    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// API root, without trailing slash
    base_url: String,

    /// HTTP client for API requests
    client: reqwest::Client,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("api_token", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a provider against the public Cloudflare API
    ///
    /// # Parameters
    ///
    /// - `api_token`: Cloudflare API token with Zone:Read and DNS:Edit permissions
    ///
    /// # Errors
    ///
    /// `Error::Config` if the token is empty or the HTTP client cannot be built.
    pub fn new(api_token: impl Into<String>) -> Result<Self> {
        Self::with_base_url(api_token, CLOUDFLARE_API_BASE)
    }

    /// Create a provider against an alternative API root (staging, tests)
    pub fn with_base_url(api_token: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.trim().is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_token,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send an authorized request, returning the status and raw body
    async fn exchange(&self, request: reqwest::RequestBuilder) -> Result<(u16, String)> {
        let response = request
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| Error::transport(format!("HTTP request failed: {}", e)))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| Error::transport(format!("Failed to read response body: {}", e)))?;

        Ok((status, body))
    }

    /// Send an authorized request and decode the envelope
    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<Page<T>> {
        let (status, body) = self.exchange(request).await?;
        decode_envelope(status, &body)
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    /// # API Call
    ///
    /// ```http
    /// GET /zones?name=example.com
    /// Authorization: Bearer <token>
    /// ```
    async fn resolve_zone_id(&self, zone_name: &str) -> Result<String> {
        tracing::debug!("Looking up zone ID for {}", zone_name);

        let request = self
            .client
            .get(self.url("/zones"))
            .query(&[("name", zone_name)]);
        let zones: Vec<Zone> = self.send(request).await?.result;

        let zone = zones
            .into_iter()
            .next()
            .ok_or_else(|| Error::not_found(format!("Zone not found: {}", zone_name)))?;

        tracing::debug!("Found zone ID: {}", zone.id);
        Ok(zone.id)
    }

    /// # API Call
    ///
    /// ```http
    /// GET /zones/:zone_id/dns_records?type=A&name=home.example.com&page=1&per_page=100
    /// Authorization: Bearer <token>
    /// ```
    async fn list_a_records(&self, zone_id: &str, name: Option<&str>) -> Result<Vec<ManagedRecord>> {
        let url = self.url(&format!("/zones/{}/dns_records", zone_id));
        let mut records = Vec::new();
        let mut page = 1u32;

        loop {
            let mut query = vec![
                ("type", "A".to_string()),
                ("page", page.to_string()),
                ("per_page", PAGE_SIZE.to_string()),
            ];
            if let Some(name) = name {
                query.push(("name", name.to_string()));
            }

            let request = self.client.get(&url).query(&query);
            let batch: Page<Vec<DnsRecord>> = self.send(request).await?;
            records.extend(batch.result.into_iter().map(ManagedRecord::from));

            match batch.info {
                Some(info) if page < info.total_pages => page += 1,
                _ => break,
            }
        }

        tracing::debug!("Listed {} A record(s) in zone {}", records.len(), zone_id);
        Ok(records)
    }

    /// # API Call
    ///
    /// ```http
    /// PUT /zones/:zone_id/dns_records/:record_id
    /// {"type": "A", "name": "...", "content": "1.2.3.4", "ttl": 120, "proxied": false}
    /// ```
    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        name: &str,
        ip: Ipv4Addr,
    ) -> Result<()> {
        tracing::info!("Updating Cloudflare DNS record: {} -> {}", name, ip);

        let url = self.url(&format!("/zones/{}/dns_records/{}", zone_id, record_id));
        let request = self
            .client
            .put(url)
            .json(&RecordUpdate::a_record(name, ip));
        let (status, body) = self.exchange(request).await?;
        decode_ack(status, &body)?;

        tracing::info!("DNS record updated successfully: {} -> {}", name, ip);
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "cloudflare"
    }
}
