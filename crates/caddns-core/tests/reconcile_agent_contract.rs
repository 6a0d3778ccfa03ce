//! Contract Test: Reconcile Agent
//!
//! Constraints verified:
//! - A record already at the current address is never rewritten
//! - A drifted record gets exactly one update with the current address
//! - A failure on one domain does not stop the remaining domains
//! - The public address is resolved at most once per cycle
//!
//! If this test fails, scheduled runs may hammer the API or leave records stale.

mod common;

use caddns_core::{DomainOutcome, ReconcileAgent};
use common::*;
use std::net::Ipv4Addr;

const CURRENT: Ipv4Addr = Ipv4Addr::new(5, 6, 7, 8);

fn agent(provider: &MockDnsProvider, ip: &FixedIpSource, domains: &[&str]) -> ReconcileAgent {
    ReconcileAgent::from_config(
        &provisioned_config(domains),
        Box::new(provider.clone()),
        Box::new(ip.clone()),
    )
    .expect("agent construction succeeds")
}

#[tokio::test]
async fn matching_record_is_not_updated() {
    let provider = MockDnsProvider::new().with_record("home.example.com", "5.6.7.8");
    let ip = FixedIpSource::new(CURRENT);

    let report = agent(&provider, &ip, &["home.example.com"]).run_cycle().await;

    assert_eq!(provider.update_call_count(), 0);
    assert_eq!(
        report.outcome("home.example.com"),
        Some(&DomainOutcome::Unchanged { ip: CURRENT })
    );
}

#[tokio::test]
async fn drifted_record_is_updated_once() {
    let provider = MockDnsProvider::new().with_record("home.example.com", "1.2.3.4");
    let ip = FixedIpSource::new(CURRENT);

    let report = agent(&provider, &ip, &["home.example.com"]).run_cycle().await;

    assert_eq!(
        provider.update_calls(),
        vec![UpdateCall {
            zone_id: ZONE_ID.to_string(),
            record_id: "rec-1".to_string(),
            name: "home.example.com".to_string(),
            ip: CURRENT,
        }]
    );
    assert_eq!(
        report.outcome("home.example.com"),
        Some(&DomainOutcome::Updated {
            previous: "1.2.3.4".to_string(),
            new: CURRENT,
        })
    );
}

#[tokio::test]
async fn second_cycle_after_update_is_idle() {
    let provider = MockDnsProvider::new().with_record("home.example.com", "1.2.3.4");
    let ip = FixedIpSource::new(CURRENT);
    let agent = agent(&provider, &ip, &["home.example.com"]);

    agent.run_cycle().await;
    let second = agent.run_cycle().await;

    assert_eq!(provider.update_call_count(), 1);
    assert_eq!(second.unchanged_count(), 1);
    assert_eq!(provider.content_of("home.example.com").as_deref(), Some("5.6.7.8"));
}

#[tokio::test]
async fn failed_update_does_not_stop_next_domain() {
    let provider = MockDnsProvider::new()
        .with_record("a.example.com", "1.2.3.4")
        .with_record("b.example.com", "1.2.3.4")
        .fail_update_for("a.example.com");
    let ip = FixedIpSource::new(CURRENT);

    let report = agent(&provider, &ip, &["a.example.com", "b.example.com"])
        .run_cycle()
        .await;

    let attempted: Vec<String> = provider.update_calls().into_iter().map(|c| c.name).collect();
    assert_eq!(attempted, vec!["a.example.com", "b.example.com"]);

    assert!(matches!(
        report.outcome("a.example.com"),
        Some(DomainOutcome::Failed { .. })
    ));
    assert!(matches!(
        report.outcome("b.example.com"),
        Some(DomainOutcome::Updated { .. })
    ));
    assert_eq!(provider.content_of("b.example.com").as_deref(), Some("5.6.7.8"));
    assert!(report.has_failures());
}

#[tokio::test]
async fn failed_lookup_does_not_stop_next_domain() {
    let provider = MockDnsProvider::new()
        .with_record("a.example.com", "1.2.3.4")
        .with_record("b.example.com", "1.2.3.4")
        .fail_lookup_for("a.example.com");
    let ip = FixedIpSource::new(CURRENT);

    let report = agent(&provider, &ip, &["a.example.com", "b.example.com"])
        .run_cycle()
        .await;

    assert!(matches!(
        report.outcome("a.example.com"),
        Some(DomainOutcome::Failed { .. })
    ));
    assert_eq!(provider.update_call_count(), 1);
    assert_eq!(report.updated_count(), 1);
}

#[tokio::test]
async fn missing_record_is_skipped() {
    let provider = MockDnsProvider::new().with_record("b.example.com", "1.2.3.4");
    let ip = FixedIpSource::new(CURRENT);

    let report = agent(&provider, &ip, &["gone.example.com", "b.example.com"])
        .run_cycle()
        .await;

    assert_eq!(report.outcome("gone.example.com"), Some(&DomainOutcome::Missing));
    assert_eq!(report.updated_count(), 1);
    assert!(!report.has_failures());
}

#[tokio::test]
async fn ip_resolved_once_per_cycle() {
    let provider = MockDnsProvider::new()
        .with_record("a.example.com", "1.2.3.4")
        .with_record("b.example.com", "5.6.7.8")
        .with_record("c.example.com", "9.9.9.9");
    let ip = FixedIpSource::new(CURRENT);
    let agent = agent(
        &provider,
        &ip,
        &["a.example.com", "b.example.com", "c.example.com"],
    );

    agent.run_cycle().await;
    assert_eq!(ip.call_count(), 1);

    // Never reused across cycles
    agent.run_cycle().await;
    assert_eq!(ip.call_count(), 2);
}

#[tokio::test]
async fn ip_not_resolved_when_no_record_exists() {
    let provider = MockDnsProvider::new();
    let ip = FixedIpSource::new(CURRENT);

    let report = agent(&provider, &ip, &["a.example.com"]).run_cycle().await;

    assert_eq!(ip.call_count(), 0);
    assert_eq!(report.missing_count(), 1);
}

#[tokio::test]
async fn failed_ip_resolution_is_retried_for_next_domain() {
    let provider = MockDnsProvider::new()
        .with_record("a.example.com", "1.2.3.4")
        .with_record("b.example.com", "1.2.3.4");
    let ip = FixedIpSource::new(CURRENT).failing_first(1);

    let report = agent(&provider, &ip, &["a.example.com", "b.example.com"])
        .run_cycle()
        .await;

    assert_eq!(ip.call_count(), 2);
    assert!(matches!(
        report.outcome("a.example.com"),
        Some(DomainOutcome::Failed { .. })
    ));
    assert!(matches!(
        report.outcome("b.example.com"),
        Some(DomainOutcome::Updated { .. })
    ));
}

#[tokio::test]
async fn empty_domain_set_yields_empty_report() {
    let provider = MockDnsProvider::new();
    let ip = FixedIpSource::new(CURRENT);

    let report = agent(&provider, &ip, &[]).run_cycle().await;

    assert!(report.domains.is_empty());
    assert_eq!(provider.lookup_count(), 0);
    assert_eq!(ip.call_count(), 0);
    assert!(report.finished_at >= report.started_at);
}

#[test]
fn agent_requires_zone_id() {
    let mut config = provisioned_config(&["a.example.com"]);
    config.zone_id = None;

    let result = ReconcileAgent::from_config(
        &config,
        Box::new(MockDnsProvider::new()),
        Box::new(FixedIpSource::new(CURRENT)),
    );

    assert!(matches!(result, Err(caddns_core::Error::Config(_))));
}
