// # HTTP IP Source
//
// Public IPv4 lookup through an HTTP echo service for caddns.
//
// ## Protocol
//
// `GET <url>` answering `{"ip": "203.0.113.7"}`. Services that answer
// with the bare address as plain text (ifconfig.me, icanhazip.com) are
// accepted too.
//
// ## No Caching
//
// Every `current()` call performs a request. The agent decides how often
// to ask; a cached answer would hide the very change it is looking for.

use caddns_core::traits::IpSource;
use caddns_core::{Error, Result};
use serde::Deserialize;
use std::net::Ipv4Addr;
use std::time::Duration;

/// Default IP echo service (IPv4 only endpoint)
pub const DEFAULT_IP_URL: &str = "https://api.ipify.org?format=json";

/// HTTP timeout for the lookup
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str = concat!("caddns/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct IpPayload {
    ip: String,
}

/// Extract the IPv4 address from a service response body
pub fn parse_ip_payload(body: &str) -> Result<Ipv4Addr> {
    let body = body.trim();
    let text = match serde_json::from_str::<IpPayload>(body) {
        Ok(payload) => payload.ip,
        Err(_) if !body.starts_with('{') => body.to_string(),
        Err(e) => return Err(Error::resolution(format!("Malformed IP payload: {}", e))),
    };

    let text = text.trim();
    text.parse::<Ipv4Addr>()
        .map_err(|_| Error::resolution(format!("Not an IPv4 address: {:?}", text)))
}

/// HTTP-based public IP source
#[derive(Debug, Clone)]
pub struct HttpIpSource {
    /// URL to fetch IP from
    url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpIpSource {
    /// Create a new HTTP IP source
    ///
    /// # Parameters
    ///
    /// - `url`: Echo service URL (e.g., [`DEFAULT_IP_URL`])
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }

    /// Source using [`DEFAULT_IP_URL`]
    pub fn with_default_url() -> Result<Self> {
        Self::new(DEFAULT_IP_URL)
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait::async_trait]
impl IpSource for HttpIpSource {
    async fn current(&self) -> Result<Ipv4Addr> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::resolution(format!("Request to {} failed: {}", self.url, e)))?;

        if !response.status().is_success() {
            return Err(Error::resolution(format!(
                "HTTP error from {}: {}",
                self.url,
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::resolution(format!("Failed to read response: {}", e)))?;

        let ip = parse_ip_payload(&body)?;
        tracing::debug!("Public IP from {}: {}", self.url, ip);
        Ok(ip)
    }
}
