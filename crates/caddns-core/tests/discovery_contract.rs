//! Contract Test: Zone Discovery
//!
//! Constraints verified:
//! - The zone id is resolved once and then served from the document
//! - A zone that does not exist leaves the document untouched
//! - Discovered record names are cached and drive the addable candidates
//!
//! If this test fails, operator commands make redundant or unsafe API calls.

mod common;

use caddns_core::discovery::{addable_candidates, discover_records, resolve_zone};
use caddns_core::traits::ConfigStore;
use caddns_core::{Config, ConfigPatch, Error, MemoryConfigStore, SaveMode};
use common::*;

#[tokio::test]
async fn zone_is_resolved_and_cached() {
    let store = MemoryConfigStore::new();
    let provider = MockDnsProvider::new().with_zone("example.com", "zone-123");

    let first = resolve_zone(&store, &provider, "Example.com.").await.unwrap();
    let second = resolve_zone(&store, &provider, "example.com").await.unwrap();

    assert_eq!(first, "zone-123");
    assert_eq!(second, "zone-123");
    assert_eq!(provider.zone_lookup_count(), 1);
    assert_eq!(
        store.load().await.unwrap().zone_id.as_deref(),
        Some("zone-123")
    );
}

#[tokio::test]
async fn unknown_zone_persists_nothing() {
    let store = MemoryConfigStore::new();
    store
        .save(ConfigPatch::api_key("test-token"), SaveMode::MergeFields)
        .await
        .unwrap();
    let provider = MockDnsProvider::new();

    let result = resolve_zone(&store, &provider, "nope.example").await;

    assert!(matches!(result, Err(Error::NotFound(_))));
    let config = store.load().await.unwrap();
    assert_eq!(config.zone_id, None);
    assert_eq!(config.api_key.as_deref(), Some("test-token"));
}

#[tokio::test]
async fn discovered_names_feed_candidates() {
    let store = MemoryConfigStore::with_config(provisioned_config(&["b.example.com"]));
    let provider = MockDnsProvider::new()
        .with_record("a.example.com", "1.1.1.1")
        .with_record("b.example.com", "1.1.1.1")
        .with_record("c.example.com", "1.1.1.1");

    let names = discover_records(&store, &provider).await.unwrap();
    assert_eq!(names, vec!["a.example.com", "b.example.com", "c.example.com"]);

    let config = store.load().await.unwrap();
    assert_eq!(config.possible, names);
    assert_eq!(
        addable_candidates(&config),
        vec!["a.example.com", "c.example.com"]
    );
}

#[tokio::test]
async fn discovery_requires_zone() {
    let store = MemoryConfigStore::with_config(Config::default());
    let provider = MockDnsProvider::new();

    let result = discover_records(&store, &provider).await;

    assert!(matches!(result, Err(Error::Config(_))));
    assert_eq!(provider.lookup_count(), 0);
}
