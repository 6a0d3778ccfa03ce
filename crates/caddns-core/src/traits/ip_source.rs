// # IP Source Trait
//
// Defines the interface for looking up this machine's public IPv4 address.
//
// ## Implementations
//
// - HTTP echo service: `caddns-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use caddns_core::IpSource;
//
// let source = /* IpSource implementation */;
// let ip = source.current().await?;
// ```

use async_trait::async_trait;
use std::net::Ipv4Addr;

/// Trait for public IP lookup
///
/// Implementations must not cache: the agent exists to notice when the
/// address changes, so every call goes to the network.
#[async_trait]
pub trait IpSource: Send + Sync {
    /// Get the current public IPv4 address
    ///
    /// # Returns
    ///
    /// - `Ok(Ipv4Addr)`: The current address
    /// - `Err(Error::Resolution)`: Transport failure or malformed payload
    async fn current(&self) -> Result<Ipv4Addr, crate::Error>;
}
