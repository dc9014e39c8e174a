// libs/semantic-cache-cell/tests/live_redis_test.rs
//
// Round-trip tests against a real redis instance. Run with
// `cargo test -p semantic-cache-cell -- --ignored` and REDIS_URL pointing at
// a disposable server.

use std::sync::Arc;

use chrono::Duration;
use serde_json::json;

use semantic_cache_cell::services::cache::SemanticCacheService;
use shared_config::AppConfig;
use shared_utils::clock::{Clock, FixedClock, SystemClock};

fn test_config() -> AppConfig {
    AppConfig {
        supabase_url: String::new(),
        supabase_service_key: String::new(),
        redis_url: std::env::var("REDIS_URL").ok(),
    }
}

fn live_service() -> SemanticCacheService {
    SemanticCacheService::new(&test_config(), Arc::new(SystemClock)).unwrap()
}

#[tokio::test]
#[ignore]
async fn put_then_get_returns_the_response_with_one_hit() {
    let service = live_service();
    let key = SemanticCacheService::make_key("when is my next opening", Some("live-test-1"));

    service
        .put(
            &key,
            "when is my next opening",
            "Tuesday at 10:00 with Dana",
            json!({"source": "scheduler"}),
            None,
        )
        .await
        .unwrap();

    let response = service.get(&key).await.unwrap().expect("expected a cache hit");

    assert_eq!(response.response_text, "Tuesday at 10:00 with Dana");
    assert_eq!(response.hit_count, 1);
    assert_eq!(response.metadata["source"], "scheduler");

    let second = service.get(&key).await.unwrap().unwrap();
    assert_eq!(second.hit_count, 2);
}

#[tokio::test]
#[ignore]
async fn overwriting_keeps_no_history_of_the_prior_value() {
    let service = live_service();
    let key = SemanticCacheService::make_key("overwrite roundtrip", Some("live-test-2"));

    service
        .put(&key, "overwrite roundtrip", "first answer", json!(null), None)
        .await
        .unwrap();
    let _ = service.get(&key).await.unwrap();

    service
        .put(&key, "overwrite roundtrip", "second answer", json!(null), None)
        .await
        .unwrap();

    let response = service.get(&key).await.unwrap().unwrap();
    assert_eq!(response.response_text, "second answer");
    // The overwrite reset the hit trail.
    assert_eq!(response.hit_count, 1);
}

#[tokio::test]
#[ignore]
async fn expired_entries_read_as_misses() {
    // Written through a clock pinned in the past, so the default one-hour
    // TTL has already elapsed for the reader.
    let past = SystemClock.now() - Duration::days(1);
    let writer =
        SemanticCacheService::new(&test_config(), Arc::new(FixedClock::at(past))).unwrap();
    let key = SemanticCacheService::make_key("expired roundtrip", Some("live-test-3"));

    writer
        .put(&key, "expired roundtrip", "stale answer", json!(null), None)
        .await
        .unwrap();

    let reader = live_service();
    assert!(reader.get(&key).await.unwrap().is_none());
}

#[tokio::test]
#[ignore]
async fn cleanup_reclaims_backdated_entries_but_keeps_fresh_ones() {
    let key_prefix = "cleanup roundtrip";
    let fresh_key = SemanticCacheService::make_key(key_prefix, Some("live-test-fresh"));
    let stale_key = SemanticCacheService::make_key(key_prefix, Some("live-test-stale"));

    let service = live_service();
    service
        .put(&fresh_key, key_prefix, "fresh answer", json!(null), None)
        .await
        .unwrap();
    let _ = service.get(&fresh_key).await.unwrap();

    // Backdated ten days with a generous TTL and no hits: caught by the
    // retention rule, not the expiry rule.
    let past = SystemClock.now() - Duration::days(10);
    let backdated_writer =
        SemanticCacheService::new(&test_config(), Arc::new(FixedClock::at(past))).unwrap();
    backdated_writer
        .put(
            &stale_key,
            key_prefix,
            "forgotten answer",
            json!(null),
            Some(past + Duration::days(30)),
        )
        .await
        .unwrap();

    let report = service.cleanup().await.unwrap();
    assert!(report.stale_removed >= 1);

    assert!(service.get(&fresh_key).await.unwrap().is_some());
    assert!(service.get(&stale_key).await.unwrap().is_none());
}
