//! Integration tests for the cache and the call orchestrator
//!
//! These tests verify the complete read-through behaviour including:
//! - Key determinism
//! - TTL expiration and explicit invalidation
//! - Write-invalidation driven by the operation catalog
//! - Operator override (disable / enable)
//! - Loader failures and concurrent callers

use async_trait::async_trait;
use deskbridge_core::cache::{CacheConfig, ResponseCache};
use deskbridge_core::{BridgeError, CachedClient, Params, Payload, RemoteFacade, Result};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

/// Remote facade that records every call it receives
#[derive(Default)]
struct RecordingFacade {
    calls: Mutex<HashMap<String, usize>>,
    failing: Mutex<Vec<String>>,
}

impl RecordingFacade {
    fn calls(&self, operation: &str) -> usize {
        self.calls.lock().unwrap().get(operation).copied().unwrap_or(0)
    }

    fn fail(&self, operation: &str) {
        self.failing.lock().unwrap().push(operation.to_string());
    }
}

#[async_trait]
impl RemoteFacade for RecordingFacade {
    async fn invoke(&self, operation: &str, params: Params) -> Result<Payload> {
        let count = {
            let mut calls = self.calls.lock().unwrap();
            let count = calls.entry(operation.to_string()).or_insert(0);
            *count += 1;
            *count
        };
        if self.failing.lock().unwrap().iter().any(|op| op == operation) {
            return Err(BridgeError::remote(operation, "backend unavailable"));
        }
        Ok(Payload::Structured(json!({
            "operation": operation,
            "params": params,
            "served": count,
        })))
    }
}

fn params(value: Value) -> Params {
    match value {
        Value::Object(map) => map,
        _ => panic!("params must be an object"),
    }
}

fn setup(namespace: &str) -> (Arc<RecordingFacade>, Arc<ResponseCache>, CachedClient) {
    let facade = Arc::new(RecordingFacade::default());
    let cache = Arc::new(
        ResponseCache::new(
            CacheConfig::builder()
                .namespace(namespace)
                .enable_auto_cleanup(false)
                .build(),
        )
        .unwrap(),
    );
    let client = CachedClient::new(cache.clone(), facade.clone());
    (facade, cache, client)
}

#[tokio::test]
async fn test_key_ignores_member_order() {
    let cache = ResponseCache::with_namespace("order").unwrap();

    let a = params(json!({"spreadsheet_id": "s1", "range": "A1:B2", "opts": {"x": 1, "y": [2, 3]}}));
    let b = params(json!({"opts": {"y": [2, 3], "x": 1}, "range": "A1:B2", "spreadsheet_id": "s1"}));

    assert_eq!(
        cache.keys().build("read_sheet_values", &a),
        cache.keys().build("read_sheet_values", &b)
    );
}

#[tokio::test]
async fn test_loader_runs_once_within_ttl() {
    let cache = ResponseCache::with_namespace("ttl").unwrap();
    let counter = AtomicUsize::new(0);
    let loads = &counter;
    let loader = move || async move {
        loads.fetch_add(1, Ordering::SeqCst);
        Ok(Payload::Raw("labels".into()))
    };

    assert_ok!(cache.get_or_fetch("ttl:k", Duration::from_secs(60), false, loader).await);
    assert_ok!(cache.get_or_fetch("ttl:k", Duration::from_secs(60), false, loader).await);

    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_loader_runs_again_after_ttl() {
    let cache = ResponseCache::with_namespace("ttl").unwrap();
    let counter = AtomicUsize::new(0);
    let loads = &counter;
    let loader = move || async move {
        loads.fetch_add(1, Ordering::SeqCst);
        Ok(Payload::Raw("events".into()))
    };

    assert_ok!(cache.get_or_fetch("ttl:k", Duration::from_millis(50), false, loader).await);
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_ok!(cache.get_or_fetch("ttl:k", Duration::from_millis(50), false, loader).await);

    assert_eq!(counter.load(Ordering::SeqCst), 2);
    let stats = cache.stats().await;
    assert_eq!(stats.misses, 2);
    assert_eq!(stats.hits, 0);
}

#[tokio::test]
async fn test_invalidate_forces_reload() {
    let cache = ResponseCache::with_namespace("inv").unwrap();
    let counter = AtomicUsize::new(0);
    let loads = &counter;
    let loader = move || async move {
        loads.fetch_add(1, Ordering::SeqCst);
        Ok(Payload::Raw("doc".into()))
    };

    assert_ok!(cache.get_or_fetch("inv:k", Duration::from_secs(3600), false, loader).await);
    assert!(cache.invalidate("inv:k").await);
    assert_ok!(cache.get_or_fetch("inv:k", Duration::from_secs(3600), false, loader).await);

    assert_eq!(counter.load(Ordering::SeqCst), 2);
    assert_eq!(cache.stats().await.invalidations, 1);
}

#[tokio::test]
async fn test_invoice_search_then_send() {
    let (facade, cache, client) = setup("mail");
    let search = params(json!({"query": "invoice"}));

    // First lookup goes remote, the repeat is a hit
    let first = assert_ok!(client.call("search_gmail_messages", search.clone()).await);
    let repeat = assert_ok!(client.call("search_gmail_messages", search.clone()).await);
    assert_eq!(first, repeat);
    assert_eq!(facade.calls("search_gmail_messages"), 1);
    assert_eq!(cache.stats().await.hits, 1);

    // Sending purges the whole search family
    assert_ok!(
        client
            .call(
                "send_gmail_message",
                params(json!({"to": "billing@example.com", "subject": "Invoice", "body": "Attached"})),
            )
            .await
    );
    assert_eq!(cache.stats().await.invalidations, 1);

    // The repeat after invalidation re-executes the search
    let after = assert_ok!(client.call("search_gmail_messages", search).await);
    assert_eq!(facade.calls("search_gmail_messages"), 2);
    assert_ne!(after, first);
    assert_eq!(cache.stats().await.misses, 2);
}

#[tokio::test]
async fn test_sheet_write_invalidates_every_range() {
    let (facade, cache, client) = setup("sheets");

    let ranges = ["Sheet1!A1:B2", "Sheet1!C1", "Summary!A:A"];
    for range in ranges {
        assert_ok!(
            client
                .call("read_sheet_values", params(json!({"spreadsheet_id": "budget", "range": range})))
                .await
        );
    }
    let other = params(json!({"spreadsheet_id": "roadmap", "range": "Sheet1!A1:B2"}));
    assert_ok!(client.call("read_sheet_values", other.clone()).await);
    assert_eq!(cache.len().await, 4);

    assert_ok!(
        client
            .call(
                "modify_sheet_values",
                params(json!({"spreadsheet_id": "budget", "range": "Sheet1!A1", "values": [["42"]]})),
            )
            .await
    );

    // Only the other spreadsheet survives
    assert_eq!(cache.len().await, 1);
    for range in ranges {
        assert_ok!(
            client
                .call("read_sheet_values", params(json!({"spreadsheet_id": "budget", "range": range})))
                .await
        );
    }
    assert_eq!(facade.calls("read_sheet_values"), 7);

    assert_ok!(client.call("read_sheet_values", other).await);
    assert_eq!(facade.calls("read_sheet_values"), 7);
}

#[tokio::test]
async fn test_doc_and_sheet_edits_refresh_file_content() {
    let (facade, _cache, client) = setup("files");

    let doc = params(json!({"file_id": "doc1"}));
    let sheet = params(json!({"file_id": "sheet1"}));
    let before_doc = assert_ok!(client.call("get_drive_file_content", doc.clone()).await);
    let before_sheet = assert_ok!(client.call("get_drive_file_content", sheet.clone()).await);
    assert_eq!(facade.calls("get_drive_file_content"), 2);

    assert_ok!(
        client
            .call("modify_doc_text", params(json!({"document_id": "doc1", "text": "Agenda"})))
            .await
    );
    let after_doc = assert_ok!(client.call("get_drive_file_content", doc).await);
    assert_ne!(before_doc, after_doc);
    assert_eq!(facade.calls("get_drive_file_content"), 3);

    // The spreadsheet's file content was untouched by the document edit
    assert_ok!(client.call("get_drive_file_content", sheet.clone()).await);
    assert_eq!(facade.calls("get_drive_file_content"), 3);

    assert_ok!(
        client
            .call(
                "modify_sheet_values",
                params(json!({"spreadsheet_id": "sheet1", "range_name": "A1", "values": [["7"]]})),
            )
            .await
    );
    let after_sheet = assert_ok!(client.call("get_drive_file_content", sheet).await);
    assert_ne!(before_sheet, after_sheet);
    assert_eq!(facade.calls("get_drive_file_content"), 4);
}

#[tokio::test]
async fn test_disable_and_enable_cache() {
    let (facade, cache, client) = setup("override");
    let labels = Params::new();

    assert_ok!(client.call("list_gmail_labels", labels.clone()).await);

    client.disable_cache();
    assert_ok!(client.call("list_gmail_labels", labels.clone()).await);
    assert_ok!(client.call("list_gmail_labels", labels.clone()).await);
    assert_eq!(facade.calls("list_gmail_labels"), 3);

    // The entry stored before disabling is still served
    client.enable_cache();
    assert_ok!(client.call("list_gmail_labels", labels).await);
    assert_eq!(facade.calls("list_gmail_labels"), 3);

    let stats = cache.stats().await;
    assert_eq!(stats.bypasses, 2);
    assert_eq!(stats.sets, 1);
    assert_eq!(stats.hits, 1);
}

#[tokio::test]
async fn test_loader_failure_is_not_cached() {
    let (facade, cache, client) = setup("failure");
    facade.fail("get_doc_content");
    let doc = params(json!({"document_id": "d1"}));

    let err = assert_err!(client.call("get_doc_content", doc.clone()).await);
    assert!(matches!(err, BridgeError::Remote { .. }));
    assert!(cache.is_empty().await);

    assert_err!(client.call("get_doc_content", doc).await);
    assert_eq!(facade.calls("get_doc_content"), 2);
    assert_eq!(cache.stats().await.sets, 0);
}

#[tokio::test]
async fn test_failed_mutation_does_not_invalidate() {
    let (facade, cache, client) = setup("failed-write");
    facade.fail("create_event");
    let events = params(json!({"calendar_id": "primary"}));

    assert_ok!(client.call("get_events", events.clone()).await);
    assert_err!(
        client
            .call("create_event", params(json!({"calendar_id": "primary", "summary": "Standup"})))
            .await
    );

    assert_eq!(cache.stats().await.invalidations, 0);
    assert_ok!(client.call("get_events", events).await);
    assert_eq!(facade.calls("get_events"), 1);
}

#[tokio::test]
async fn test_namespaces_are_isolated() {
    let facade = Arc::new(RecordingFacade::default());
    let work = Arc::new(ResponseCache::with_namespace("work").unwrap());
    let home = Arc::new(ResponseCache::with_namespace("home").unwrap());
    let work_client = CachedClient::new(work.clone(), facade.clone());
    let home_client = CachedClient::new(home.clone(), facade.clone());

    assert_ok!(work_client.call("list_calendars", Params::new()).await);
    assert_ok!(home_client.call("list_calendars", Params::new()).await);
    assert_eq!(facade.calls("list_calendars"), 2);

    assert_ok!(work_client.call("create_event", params(json!({"calendar_id": "primary"}))).await);
    assert_ok!(home_client.call("list_calendars", Params::new()).await);

    assert_eq!(home.stats().await.hits, 1);
    assert_eq!(work.clear().await, 1);
    assert_eq!(home.len().await, 1);
}

#[tokio::test]
async fn test_concurrent_callers() {
    let (facade, cache, client) = setup("concurrent");
    let client = Arc::new(client);

    // Warm the entry so every concurrent caller hits
    assert_ok!(client.call("list_task_lists", Params::new()).await);

    let callers = (0..16).map(|_| {
        let client = client.clone();
        async move { client.call("list_task_lists", Params::new()).await }
    });
    let results = futures::future::join_all(callers).await;

    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(facade.calls("list_task_lists"), 1);
    assert_eq!(cache.stats().await.hits, 16);
}

#[tokio::test]
async fn test_lru_eviction_at_capacity() {
    let cache = ResponseCache::new(
        CacheConfig::builder()
            .namespace("lru")
            .max_entries(2)
            .enable_auto_cleanup(false)
            .build(),
    )
    .unwrap();
    let ttl = Duration::from_secs(60);

    cache.insert("lru:a".into(), Payload::Raw("a".into()), ttl).await;
    cache.insert("lru:b".into(), Payload::Raw("b".into()), ttl).await;
    // Touch "a" so "b" becomes least recently used
    assert!(cache.get("lru:a").await.is_some());
    cache.insert("lru:c".into(), Payload::Raw("c".into()), ttl).await;

    assert!(cache.contains_key("lru:a").await);
    assert!(!cache.contains_key("lru:b").await);
    assert!(cache.contains_key("lru:c").await);
    assert_eq!(cache.stats().await.evictions, 1);
}
