// tests/cache_backends.rs

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use plandag::cache::{
    CACHE_TOKEN_ENV, CACHE_URL_ENV, CacheEntry, CacheSettings, MemoryCache, RemoteCredentials,
    RestCache, ResultCache, build_cache,
};
use plandag::config::CacheSection;
use plandag::types::CacheBackendKind;

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn memory_cache_round_trip_and_overwrite() -> TestResult {
    let cache = MemoryCache::new();
    cache.set("k", json!(1), Duration::from_secs(60)).await?;
    cache.set("k", json!(2), Duration::from_secs(60)).await?;

    assert_eq!(cache.get("k").await?, Some(json!(2)));
    assert_eq!(cache.get("missing").await?, None);
    assert_eq!(cache.len(), 1);
    Ok(())
}

#[tokio::test]
async fn memory_cache_never_serves_stale_entries() -> TestResult {
    let cache = MemoryCache::new();
    cache.insert("k", json!("v"), Duration::from_millis(10));

    tokio::time::sleep(Duration::from_millis(30)).await;

    assert_eq!(cache.get("k").await?, None);
    assert!(cache.is_empty(), "stale entry should be evicted on read");
    Ok(())
}

#[tokio::test]
async fn purge_removes_only_expired_entries() {
    let cache = MemoryCache::new();
    cache.insert("old", json!(1), Duration::ZERO);
    cache.insert("fresh", json!(2), Duration::from_secs(60));

    assert_eq!(cache.purge_expired(), 1);
    assert_eq!(cache.get_fresh("fresh"), Some(json!(2)));
}

#[tokio::test]
async fn background_cleanup_sweeps_and_stops_with_the_cache() {
    let cache = Arc::new(MemoryCache::new());
    cache.insert("old", json!(1), Duration::ZERO);

    let handle = MemoryCache::spawn_cleanup(&cache, Duration::from_millis(10));
    tokio::time::sleep(Duration::from_millis(40)).await;
    assert!(cache.is_empty());

    drop(cache);
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("cleanup task should stop once the cache is dropped")
        .expect("cleanup task should not panic");
}

#[test]
fn entry_expiry_is_relative_to_stored_at() {
    let entry = CacheEntry::new("k", json!(null), Duration::from_secs(10));
    assert!(!entry.is_expired_at(entry.stored_at + chrono::Duration::seconds(9)));
    assert!(entry.is_expired_at(entry.stored_at + chrono::Duration::seconds(10)));
    assert!(!entry.is_expired_at(Utc::now()));
}

#[test]
fn settings_require_both_credentials() {
    let section = CacheSection::default();

    let only_url = CacheSettings::from_lookup(&section, |var| {
        (var == CACHE_URL_ENV).then(|| "https://kv.example".to_string())
    });
    assert!(only_url.remote.is_none());

    let both = CacheSettings::from_lookup(&section, |var| match var {
        v if v == CACHE_URL_ENV => Some("https://kv.example".to_string()),
        v if v == CACHE_TOKEN_ENV => Some("secret".to_string()),
        _ => None,
    });
    assert_eq!(
        both.remote,
        Some(RemoteCredentials {
            url: "https://kv.example".into(),
            token: "secret".into()
        })
    );
    assert_eq!(both.ttl, Duration::from_secs(86_400));
}

fn creds(server: &MockServer) -> RemoteCredentials {
    RemoteCredentials {
        url: server.uri(),
        token: "secret".into(),
    }
}

async fn mount_ping(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/ping"))
        .and(header("authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": "PONG" })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn rest_cache_reads_envelopes() -> TestResult {
    let server = MockServer::start().await;
    mount_ping(&server).await;

    let entry = CacheEntry::new("plandag:0000abcd", json!({ "temp": 21 }), Duration::from_secs(60));
    Mock::given(method("GET"))
        .and(path("/get/plandag:0000abcd"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "result": serde_json::to_string(&entry)? })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/get/plandag:ffffffff"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": null })))
        .mount(&server)
        .await;

    let cache = RestCache::connect(&creds(&server), Duration::from_secs(2)).await?;
    assert_eq!(cache.backend(), CacheBackendKind::Remote);
    assert_eq!(cache.get("plandag:0000abcd").await?, Some(json!({ "temp": 21 })));
    assert_eq!(cache.get("plandag:ffffffff").await?, None);
    Ok(())
}

#[tokio::test]
async fn rest_cache_treats_stale_envelopes_as_missing() -> TestResult {
    let server = MockServer::start().await;
    mount_ping(&server).await;

    let mut entry = CacheEntry::new("k", json!(1), Duration::from_secs(60));
    entry.stored_at = Utc::now() - chrono::Duration::seconds(120);
    Mock::given(method("GET"))
        .and(path("/get/k"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "result": serde_json::to_string(&entry)? })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/del/k"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": 1 })))
        .expect(1)
        .mount(&server)
        .await;

    let cache = RestCache::connect(&creds(&server), Duration::from_secs(2)).await?;
    assert_eq!(cache.get("k").await?, None);
    Ok(())
}

#[tokio::test]
async fn rest_cache_writes_with_expiry() -> TestResult {
    let server = MockServer::start().await;
    mount_ping(&server).await;

    Mock::given(method("POST"))
        .and(path("/set/k"))
        .and(query_param("EX", "90"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": "OK" })))
        .expect(1)
        .mount(&server)
        .await;

    let cache = RestCache::connect(&creds(&server), Duration::from_secs(2)).await?;
    cache.set("k", json!("v"), Duration::from_secs(90)).await?;
    Ok(())
}

#[tokio::test]
async fn rest_cache_surfaces_store_errors() -> TestResult {
    let server = MockServer::start().await;
    mount_ping(&server).await;

    Mock::given(method("GET"))
        .and(path("/get/k"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "error": "WRONGTYPE" })))
        .mount(&server)
        .await;

    let cache = RestCache::connect(&creds(&server), Duration::from_secs(2)).await?;
    let err = cache.get("k").await.expect_err("store error should surface");
    assert!(err.to_string().contains("WRONGTYPE"));
    Ok(())
}

#[tokio::test]
async fn build_cache_falls_back_when_the_store_rejects_the_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "error": "Unauthorized" })))
        .mount(&server)
        .await;

    let settings = CacheSettings {
        remote: Some(creds(&server)),
        ..CacheSettings::default()
    };
    let cache = build_cache(&settings).await;
    assert_eq!(cache.backend(), CacheBackendKind::Memory);
}

#[tokio::test]
async fn build_cache_uses_the_store_when_reachable() {
    let server = MockServer::start().await;
    mount_ping(&server).await;

    let settings = CacheSettings {
        remote: Some(creds(&server)),
        ..CacheSettings::default()
    };
    let cache = build_cache(&settings).await;
    assert_eq!(cache.backend(), CacheBackendKind::Remote);
}

#[tokio::test]
async fn build_cache_without_credentials_is_in_memory() {
    let settings = CacheSettings {
        cleanup_interval: None,
        ..CacheSettings::default()
    };
    assert_eq!(build_cache(&settings).await.backend(), CacheBackendKind::Memory);
}
