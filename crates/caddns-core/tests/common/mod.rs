//! Test doubles and common utilities for contract tests
//!
//! The doubles share their recorded state through `Arc`s, so a test keeps a
//! clone and inspects it after handing the original to the code under test.

#![allow(dead_code)]

use async_trait::async_trait;
use caddns_core::error::{Error, Result};
use caddns_core::scheduler::Schedule;
use caddns_core::traits::{
    CommandOutput, CommandRunner, DnsProvider, IpSource, ManagedRecord, TaskScheduler,
};
use caddns_core::Config;
use std::collections::{HashMap, HashSet};
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const ZONE_ID: &str = "023e105f4ecef8ad9ca31a8372d0c353";

/// A recorded `update_record` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateCall {
    pub zone_id: String,
    pub record_id: String,
    pub name: String,
    pub ip: Ipv4Addr,
}

/// In-memory provider holding one zone's A records
#[derive(Clone, Default)]
pub struct MockDnsProvider {
    records: Arc<Mutex<Vec<ManagedRecord>>>,
    zones: Arc<Mutex<HashMap<String, String>>>,
    updates: Arc<Mutex<Vec<UpdateCall>>>,
    lookups: Arc<AtomicUsize>,
    zone_lookups: Arc<AtomicUsize>,
    failing_lookups: Arc<Mutex<HashSet<String>>>,
    failing_updates: Arc<Mutex<HashSet<String>>>,
}

impl MockDnsProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(self, name: &str, content: &str) -> Self {
        {
            let mut records = self.records.lock().unwrap();
            let id = format!("rec-{}", records.len() + 1);
            records.push(ManagedRecord::new(name, id, content));
        }
        self
    }

    pub fn with_zone(self, name: &str, id: &str) -> Self {
        self.zones
            .lock()
            .unwrap()
            .insert(name.to_string(), id.to_string());
        self
    }

    pub fn fail_lookup_for(self, name: &str) -> Self {
        self.failing_lookups.lock().unwrap().insert(name.to_string());
        self
    }

    pub fn fail_update_for(self, name: &str) -> Self {
        self.failing_updates.lock().unwrap().insert(name.to_string());
        self
    }

    pub fn update_calls(&self) -> Vec<UpdateCall> {
        self.updates.lock().unwrap().clone()
    }

    pub fn update_call_count(&self) -> usize {
        self.updates.lock().unwrap().len()
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn zone_lookup_count(&self) -> usize {
        self.zone_lookups.load(Ordering::SeqCst)
    }

    pub fn content_of(&self, name: &str) -> Option<String> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.name == name)
            .map(|r| r.content.clone())
    }
}

#[async_trait]
impl DnsProvider for MockDnsProvider {
    async fn resolve_zone_id(&self, zone_name: &str) -> Result<String> {
        self.zone_lookups.fetch_add(1, Ordering::SeqCst);
        self.zones
            .lock()
            .unwrap()
            .get(zone_name)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("zone {}", zone_name)))
    }

    async fn list_a_records(
        &self,
        _zone_id: &str,
        name: Option<&str>,
    ) -> Result<Vec<ManagedRecord>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if let Some(name) = name {
            if self.failing_lookups.lock().unwrap().contains(name) {
                return Err(Error::transport(format!("lookup of {} timed out", name)));
            }
        }
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| name.is_none_or(|n| r.name == n))
            .cloned()
            .collect())
    }

    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        name: &str,
        ip: Ipv4Addr,
    ) -> Result<()> {
        self.updates.lock().unwrap().push(UpdateCall {
            zone_id: zone_id.to_string(),
            record_id: record_id.to_string(),
            name: name.to_string(),
            ip,
        });

        if self.failing_updates.lock().unwrap().contains(name) {
            return Err(Error::provider(1004, "DNS Validation Error"));
        }

        let mut records = self.records.lock().unwrap();
        if let Some(record) = records.iter_mut().find(|r| r.record_id == record_id) {
            record.content = ip.to_string();
        }
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// IP source returning a fixed address, optionally failing the first calls
#[derive(Clone)]
pub struct FixedIpSource {
    ip: Ipv4Addr,
    failures_left: Arc<AtomicUsize>,
    calls: Arc<AtomicUsize>,
}

impl FixedIpSource {
    pub fn new(ip: Ipv4Addr) -> Self {
        Self {
            ip,
            failures_left: Arc::new(AtomicUsize::new(0)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Fail the first `n` calls with a resolution error
    pub fn failing_first(self, n: usize) -> Self {
        self.failures_left.store(n, Ordering::SeqCst);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IpSource for FixedIpSource {
    async fn current(&self) -> Result<Ipv4Addr> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let failed = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(Error::resolution("ip service unreachable"));
        }
        Ok(self.ip)
    }
}

/// Command runner emulating `crontab` and `schtasks`
///
/// The crontab is an in-memory string; `None` means the user has none.
#[derive(Clone, Default)]
pub struct FakeCommandRunner {
    crontab: Arc<Mutex<Option<String>>>,
    calls: Arc<Mutex<Vec<(String, Vec<String>)>>>,
    fail_reads: Arc<Mutex<bool>>,
    fail_schtasks: Arc<Mutex<bool>>,
}

impl FakeCommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_crontab(table: &str) -> Self {
        let runner = Self::default();
        *runner.crontab.lock().unwrap() = Some(table.to_string());
        runner
    }

    pub fn fail_reads(self) -> Self {
        *self.fail_reads.lock().unwrap() = true;
        self
    }

    pub fn fail_schtasks(self) -> Self {
        *self.fail_schtasks.lock().unwrap() = true;
        self
    }

    pub fn crontab(&self) -> Option<String> {
        self.crontab.lock().unwrap().clone()
    }

    pub fn crontab_lines(&self) -> Vec<String> {
        self.crontab()
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for FakeCommandRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        stdin: Option<&str>,
    ) -> Result<CommandOutput> {
        self.calls
            .lock()
            .unwrap()
            .push((program.to_string(), args.to_vec()));

        let arg = args.first().map(String::as_str);
        match (program, arg) {
            ("crontab", Some("-l")) => {
                if *self.fail_reads.lock().unwrap() {
                    return Ok(CommandOutput {
                        success: false,
                        stdout: String::new(),
                        stderr: "crontab: permission denied".to_string(),
                    });
                }
                Ok(match self.crontab() {
                    Some(table) => CommandOutput {
                        success: true,
                        stdout: table,
                        stderr: String::new(),
                    },
                    None => CommandOutput {
                        success: false,
                        stdout: String::new(),
                        stderr: "no crontab for tester".to_string(),
                    },
                })
            }
            ("crontab", Some("-")) => {
                *self.crontab.lock().unwrap() = Some(stdin.unwrap_or_default().to_string());
                Ok(CommandOutput {
                    success: true,
                    ..CommandOutput::default()
                })
            }
            ("schtasks", _) => {
                let failing = *self.fail_schtasks.lock().unwrap();
                Ok(CommandOutput {
                    success: !failing,
                    stdout: String::new(),
                    stderr: if failing {
                        "ERROR: The system cannot find the file specified.".to_string()
                    } else {
                        String::new()
                    },
                })
            }
            _ => Err(Error::scheduler(format!("unexpected program {}", program))),
        }
    }
}

/// Scheduler that records calls instead of touching the OS
#[derive(Clone, Default)]
pub struct RecordingScheduler {
    calls: Arc<Mutex<Vec<String>>>,
    installed: Arc<Mutex<Option<PathBuf>>>,
    fail_install: Arc<Mutex<bool>>,
}

impl RecordingScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_install() -> Self {
        let scheduler = Self::default();
        *scheduler.fail_install.lock().unwrap() = true;
        scheduler
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn installed(&self) -> Option<PathBuf> {
        self.installed.lock().unwrap().clone()
    }
}

#[async_trait]
impl TaskScheduler for RecordingScheduler {
    async fn install(&self, agent_path: &Path, _schedule: &Schedule) -> Result<()> {
        self.calls.lock().unwrap().push("install".to_string());
        if *self.fail_install.lock().unwrap() {
            return Err(Error::scheduler("crontab - failed"));
        }
        *self.installed.lock().unwrap() = Some(agent_path.to_path_buf());
        Ok(())
    }

    async fn remove(&self) -> Result<()> {
        self.calls.lock().unwrap().push("remove".to_string());
        *self.installed.lock().unwrap() = None;
        Ok(())
    }

    fn scheduler_name(&self) -> &'static str {
        "recording"
    }
}

/// Document with credential and zone set, managing `domains`
pub fn provisioned_config(domains: &[&str]) -> Config {
    Config {
        api_key: Some("test-token".to_string()),
        zone_id: Some(ZONE_ID.to_string()),
        domains: domains.iter().map(|d| d.to_string()).collect(),
        ..Config::default()
    }
}
