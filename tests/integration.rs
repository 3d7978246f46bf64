//! Behavioural tests for the tier coordinator over in-memory tiers.
//!
//! Time is driven by a `ManualClock`, so expiry and staleness are exact.
//!
//! Run with: `cargo test --test integration`

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use cache_tiers::clock::ManualClock;
use cache_tiers::{
    CacheEvent, CoordinatorConfig, EventKind, SetOptions, Tier, TierCoordinator, TierSet,
};

const START: u64 = 1_700_000_000_000;

fn setup(config: CoordinatorConfig) -> (Arc<TierCoordinator>, Arc<ManualClock>, TierSet) {
    // RUST_LOG=cache_tiers=debug to see coordinator logs
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let clock = Arc::new(ManualClock::new(START));
    let tiers = TierSet::in_memory();
    let cache = TierCoordinator::with_clock(tiers.clone(), config, clock.clone());
    (cache, clock, tiers)
}

fn priority(p: u8) -> SetOptions {
    SetOptions::default().with_priority(p)
}

// =============================================================================
// Placement
// =============================================================================

#[tokio::test]
async fn test_session_example() {
    let (cache, clock, _) = setup(CoordinatorConfig::default());
    let before = cache.get_cache_stats().await.distribution.fast;

    let opts = priority(8).with_ttl(Duration::from_millis(60_000));
    assert!(cache.set("session:42", &json!({"x": 1}), &opts).await.unwrap());

    assert_eq!(cache.get("session:42").await, Some(json!({"x": 1})));
    assert_eq!(cache.get_cache_stats().await.distribution.fast, before + 1);

    clock.advance(60_001);
    assert_eq!(cache.get("session:42").await, None);
    assert_eq!(cache.get_cache_stats().await.distribution.fast, before);
}

#[tokio::test]
async fn test_top_priority_lands_in_fast_tier() {
    let (cache, _, _) = setup(CoordinatorConfig::default());

    for i in 0..10 {
        let key = format!("profile:{}", i);
        let value = json!({"id": i, "name": format!("user-{}", i)});
        let before = cache.get_cache_stats().await.distribution.fast;

        assert!(cache.set(&key, &value, &priority(9)).await.unwrap());
        assert_eq!(cache.get(&key).await, Some(value));
        assert_eq!(cache.get_cache_stats().await.distribution.fast, before + 1);
    }
}

#[tokio::test]
async fn test_large_payload_ignores_priority() {
    let config = CoordinatorConfig {
        large_object_threshold_bytes: 2_048,
        compression_threshold_bytes: 1_024,
        ..Default::default()
    };
    let (cache, _, tiers) = setup(config);
    let big = json!({"resources": "r".repeat(4_096)});

    for p in [0u8, 5, 9] {
        let key = format!("big:{}", p);
        assert!(cache.set(&key, &big, &priority(p)).await.unwrap());
        assert_eq!(cache.locate(&key).await, Some(Tier::DurableLarge));

        let entry = tiers.durable_large.get(&key).await.unwrap().unwrap();
        assert!(entry.metadata.compressed, "payload above compression threshold");
    }
}

#[tokio::test]
async fn test_compressed_and_plain_roundtrip() {
    let config = CoordinatorConfig {
        compression_threshold_bytes: 64,
        ..Default::default()
    };
    let (cache, _, tiers) = setup(config);
    let plain = json!({"a": 1});
    let packed = json!({"notes": ["n".repeat(200), "m".repeat(200)], "nested": {"ok": true}});

    cache.set("plain", &plain, &priority(5)).await.unwrap();
    cache.set("packed", &packed, &priority(5)).await.unwrap();

    assert!(!tiers.durable_small.get("plain").await.unwrap().unwrap().metadata.compressed);
    assert!(tiers.durable_small.get("packed").await.unwrap().unwrap().metadata.compressed);
    assert_eq!(cache.get("plain").await, Some(plain));
    assert_eq!(cache.get("packed").await, Some(packed));
}

// =============================================================================
// Expiry, deletion, promotion
// =============================================================================

#[tokio::test]
async fn test_expired_entry_disappears_from_stats() {
    let (cache, clock, _) = setup(CoordinatorConfig::default());
    let opts = priority(2).with_ttl(Duration::from_millis(500));

    cache.set("temp", &json!("soon gone"), &opts).await.unwrap();
    assert_eq!(cache.get_cache_stats().await.total_keys, 1);

    clock.advance(501);
    assert_eq!(cache.get("temp").await, None);
    assert_eq!(cache.get_cache_stats().await.total_keys, 0);
}

#[tokio::test]
async fn test_optimizer_evicts_unread_expired_entries() {
    let (cache, clock, _) = setup(CoordinatorConfig::default());
    let opts = priority(5).with_ttl(Duration::from_millis(500));

    for i in 0..5 {
        cache.set(&format!("tmp:{}", i), &json!(i), &opts).await.unwrap();
    }
    clock.advance(501);

    let report = cache.optimize_cache().await;
    assert_eq!(report.expired_evicted, 5);
    assert_eq!(cache.get_cache_stats().await.total_keys, 0);
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let (cache, _, _) = setup(CoordinatorConfig::default());

    assert!(cache.delete("never-set").await.unwrap());
    cache.set("k", &json!(1), &priority(5)).await.unwrap();
    assert!(cache.delete("k").await.unwrap());
    assert!(cache.delete("k").await.unwrap());
    assert_eq!(cache.get_cache_stats().await.total_keys, 0);
}

#[tokio::test]
async fn test_consecutive_hits_promote_to_fast() {
    let config = CoordinatorConfig {
        frequency_promotion_threshold: 4,
        ..Default::default()
    };
    let (cache, _, tiers) = setup(config);
    let promotions = Arc::new(AtomicUsize::new(0));
    let p = promotions.clone();
    cache.on(EventKind::Promote, move |_| {
        p.fetch_add(1, Ordering::Relaxed);
    });

    cache.set("article", &json!({"title": "breathing"}), &priority(1)).await.unwrap();
    for _ in 0..4 {
        assert!(cache.get("article").await.is_some());
    }

    let entry = tiers.fast.get("article").await.unwrap().unwrap();
    assert_eq!(entry.metadata.assigned_tier, Tier::Fast);
    assert!(tiers.durable_large.get("article").await.unwrap().is_none());
    assert_eq!(promotions.load(Ordering::Relaxed), 1);
}

// =============================================================================
// Statistics, batches, events
// =============================================================================

#[tokio::test]
async fn test_hit_rate_bounds() {
    let (cache, _, _) = setup(CoordinatorConfig::default());
    assert_eq!(cache.get_cache_stats().await.hit_rate, 0.0);

    cache.set("a", &json!(1), &priority(5)).await.unwrap();
    for key in ["a", "b", "a", "c", "a"] {
        cache.get(key).await;
        let rate = cache.get_cache_stats().await.hit_rate;
        assert!((0.0..=1.0).contains(&rate));
    }

    let stats = cache.get_cache_stats().await;
    assert_eq!((stats.hits, stats.misses), (3, 2));
}

#[tokio::test]
async fn test_batch_with_oversized_entry() {
    let config = CoordinatorConfig {
        fast_tier_limit_bytes: 1_024,
        small_tier_limit_bytes: 1_024,
        large_tier_limit_bytes: 1_024,
        large_object_threshold_bytes: 512,
        ..Default::default()
    };
    let (cache, _, _) = setup(config);

    let entries = vec![
        ("ok:1".to_string(), json!({"n": 1})),
        ("too-big".to_string(), json!({"blob": "b".repeat(4_000)})),
        ("ok:2".to_string(), json!({"n": 2})),
    ];
    let stored = cache.set_multiple(entries, &priority(5)).await.unwrap();

    assert_eq!(stored, vec!["ok:1".to_string(), "ok:2".to_string()]);
    let values = cache.get_multiple(&["ok:1", "too-big", "ok:2"]).await;
    assert_eq!(values["ok:1"], Some(json!({"n": 1})));
    assert_eq!(values["too-big"], None);
    assert_eq!(values["ok:2"], Some(json!({"n": 2})));

    let removed = cache.delete_multiple(&["ok:1", "too-big", "ok:2"]).await;
    assert_eq!(removed, vec!["ok:1".to_string(), "ok:2".to_string()]);
}

#[tokio::test]
async fn test_lifecycle_events_and_destroy() {
    let (cache, _, _) = setup(CoordinatorConfig::default());
    let kinds = Arc::new(parking_lot::Mutex::new(Vec::new()));

    for kind in [EventKind::Set, EventKind::Hit, EventKind::Miss, EventKind::Delete] {
        let k = kinds.clone();
        cache.on(kind, move |e: &CacheEvent| k.lock().push(e.kind()));
    }

    cache.set("e", &json!(1), &priority(9)).await.unwrap();
    cache.get("e").await;
    cache.delete("e").await.unwrap();
    cache.get("e").await;

    assert_eq!(
        *kinds.lock(),
        vec![EventKind::Set, EventKind::Hit, EventKind::Delete, EventKind::Miss]
    );

    cache.destroy();
    cache.set("after", &json!(1), &priority(9)).await.unwrap();
    assert_eq!(kinds.lock().len(), 4);
    assert_eq!(cache.get("after").await, Some(json!(1)));
}

#[tokio::test]
async fn test_loose_config_is_defaulted() {
    let raw = json!({
        "fastTierLimitBytes": -5,
        "smallTierLimitBytes": "lots",
        "defaultTTLMillis": 1_000,
        "optimizationIntervalMillis": 0
    });
    let (config, warnings) = CoordinatorConfig::from_value(&raw);
    let defaults = CoordinatorConfig::default();

    assert_eq!(config.fast_tier_limit_bytes, defaults.fast_tier_limit_bytes);
    assert_eq!(config.small_tier_limit_bytes, defaults.small_tier_limit_bytes);
    assert_eq!(config.optimization_interval_millis, defaults.optimization_interval_millis);
    assert_eq!(config.default_ttl_millis, 1_000);
    assert_eq!(warnings.len(), 3);

    let (cache, _, _) = setup(config);
    assert!(cache.config_warnings().is_empty());
}
