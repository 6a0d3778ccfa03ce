//! Core traits for caddns
//!
//! This module defines the abstract interfaces the agent and the
//! provisioning code are written against.
//!
//! - [`ConfigStore`]: The persisted configuration document
//! - [`DnsProvider`]: Zone and A-record operations on the provider API
//! - [`IpSource`]: Public IPv4 lookup
//! - [`TaskScheduler`]: OS-level recurring trigger for the agent
//! - [`CommandRunner`]: Process execution used by the schedulers

pub mod config_store;
pub mod dns_provider;
pub mod ip_source;
pub mod task_scheduler;

pub use config_store::ConfigStore;
pub use dns_provider::{DnsProvider, ManagedRecord, RECORD_TTL_SECS};
pub use ip_source::IpSource;
pub use task_scheduler::{CommandOutput, CommandRunner, TaskScheduler};
