// # caddns-core
//
// Core library for caddns, a scheduled Cloudflare dynamic DNS updater.
//
// ## Architecture Overview
//
// - **ConfigStore**: The persisted JSON document (credential, zone, managed set)
// - **DnsProvider**: Zone and A-record operations on the provider API
// - **IpSource**: Public IPv4 lookup
// - **ReconcileAgent**: One unattended pass correcting drifted A records
// - **TaskScheduler**: The OS trigger that runs the agent daily
// - **DomainSetReconciler**: Managed-set changes and the matching install/teardown
// - **discovery**: Zone resolution and record listing for the operator
//
// ## Execution Contexts
//
// 1. **Operator run**: mutates the document and (re)installs the agent
// 2. **Agent run**: started by the OS trigger, reads the document and
//    reconciles records, then exits
//
// The two never run concurrently and share nothing but the document.

pub mod agent;
pub mod config;
pub mod discovery;
pub mod domains;
pub mod error;
pub mod launcher;
pub mod scheduler;
pub mod store;
pub mod traits;

// Re-export core types for convenience
pub use agent::{CycleReport, DomainOutcome, DomainReport, ReconcileAgent};
pub use config::{Config, ConfigPatch, SaveMode};
pub use domains::{DomainSetReconciler, ProvisionOutcome};
pub use error::{Error, Result};
pub use launcher::AgentLauncher;
pub use scheduler::Schedule;
pub use store::{FileConfigStore, MemoryConfigStore};
pub use traits::{
    CommandOutput, CommandRunner, ConfigStore, DnsProvider, IpSource, ManagedRecord,
    TaskScheduler,
};
