//! Integration tests for the tag cache
//!
//! These tests verify the complete cache functionality including:
//! - Single compute per key under concurrent misses
//! - Stale-while-revalidate behavior under a real profile window
//! - Read-your-writes via tag update, including updates that race a refresh
//! - Eventual consistency via tag revalidation
//! - Invalidation through the `Invalidator` seam

use agentdeck_cache::{
    profile, tag, CacheBinding, CacheConfig, CacheError, CacheKeyBuilder, CacheProfile,
    Freshness, Invalidator, RevalidateProfile, Tag, TagCache,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

fn short_lived_cache() -> TagCache {
    TagCache::new(
        CacheConfig::builder()
            .profile(
                "short",
                CacheProfile::new(
                    Duration::ZERO,
                    Duration::from_millis(60),
                    Duration::from_millis(400),
                ),
            )
            .build(),
    )
}

/// A tiny "database" whose reads go through the cache
#[derive(Clone, Default)]
struct Rows {
    rows: Arc<RwLock<Vec<String>>>,
    reads: Arc<AtomicUsize>,
}

impl Rows {
    async fn read(&self, cache: &TagCache, binding: &CacheBinding) -> Vec<String> {
        let rows = self.clone();
        cache
            .get_or_compute(
                CacheKeyBuilder::new("rows").build(),
                binding,
                move || async move {
                    rows.reads.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, CacheError>(rows.rows.read().await.clone())
                },
            )
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn test_concurrent_misses_compute_once() {
    let cache = TagCache::new(CacheConfig::default());
    let binding = CacheBinding::new(profile::AGENTS).tag(tag::AGENT_STATS);
    let calls = Arc::new(AtomicUsize::new(0));

    let tasks = (0..10).map(|_| {
        let cache = cache.clone();
        let binding = binding.clone();
        let calls = calls.clone();
        async move {
            cache
                .get_or_compute("agent_stats".to_string(), &binding, move || async move {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok::<_, CacheError>(calls.fetch_add(1, Ordering::SeqCst) as u32)
                })
                .await
                .unwrap()
        }
    });

    let results: Vec<u32> = futures::future::join_all(tasks).await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(results.iter().all(|v| *v == 0));
}

#[tokio::test]
async fn test_fresh_reads_make_no_upstream_call() {
    let cache = TagCache::new(CacheConfig::default());
    let binding = CacheBinding::new(profile::HOURS).tag(tag::COMPONENT_TEMPLATES);
    let rows = Rows::default();
    rows.rows.write().await.push("button".to_string());

    for _ in 0..5 {
        assert_eq!(rows.read(&cache, &binding).await, vec!["button".to_string()]);
    }

    assert_eq!(rows.reads.load(Ordering::SeqCst), 1);
    let stats = cache.stats().await;
    assert_eq!(stats.hits, 4);
    assert_eq!(stats.misses, 1);
}

#[tokio::test]
async fn test_update_gives_read_your_writes() {
    let cache = TagCache::new(CacheConfig::default());
    let templates = Tag::from(tag::COMPONENT_TEMPLATES);
    let binding = CacheBinding::new(profile::HOURS).tag(templates.clone());
    let rows = Rows::default();

    assert!(rows.read(&cache, &binding).await.is_empty());

    rows.rows.write().await.push("card".to_string());
    // Without invalidation the cached empty list is still served
    assert!(rows.read(&cache, &binding).await.is_empty());

    cache.update_tag(&templates).await.unwrap();
    assert_eq!(rows.read(&cache, &binding).await, vec!["card".to_string()]);
}

#[tokio::test]
async fn test_revalidate_converges_after_refresh() {
    let cache = TagCache::new(CacheConfig::default());
    let templates = Tag::from(tag::COMPONENT_TEMPLATES);
    let binding = CacheBinding::new(profile::HOURS).tag(templates.clone());
    let rows = Rows::default();
    rows.rows.write().await.extend(["a".to_string(), "b".to_string()]);

    assert_eq!(rows.read(&cache, &binding).await.len(), 2);

    rows.rows.write().await.retain(|r| r != "a");
    cache
        .revalidate_tag(&templates, RevalidateProfile::named(profile::HOURS))
        .await
        .unwrap();

    // First read after revalidation may still see the deleted row
    let stale = rows.read(&cache, &binding).await;
    assert_eq!(stale.len(), 2);

    cache.flush_refreshes().await;
    assert_eq!(rows.read(&cache, &binding).await, vec!["b".to_string()]);
}

#[tokio::test]
async fn test_profile_window_drives_background_refresh() {
    let cache = short_lived_cache();
    let binding = CacheBinding::new("short").tag("rows");
    let rows = Rows::default();

    rows.read(&cache, &binding).await;
    rows.rows.write().await.push("late".to_string());

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(cache.freshness("rows").await, Some(Freshness::Stale));

    // Many stale reads, one refresh
    for _ in 0..5 {
        assert!(rows.read(&cache, &binding).await.is_empty());
    }
    cache.flush_refreshes().await;

    assert_eq!(rows.read(&cache, &binding).await, vec!["late".to_string()]);
    assert_eq!(rows.reads.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_update_during_refresh_discards_refreshed_value() {
    let cache = short_lived_cache();
    let t = Tag::from("rows");
    let binding = CacheBinding::new("short").tag(t.clone());

    let _: u32 = cache
        .get_or_compute("slow".to_string(), &binding, || async { Ok::<_, CacheError>(1) })
        .await
        .unwrap();
    cache.revalidate_tag(&t, RevalidateProfile::Inline { expire: None }).await.unwrap();

    // Stale read starts a slow refresh that read pre-write state
    let served: u32 = cache
        .get_or_compute("slow".to_string(), &binding, || async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok::<_, CacheError>(2)
        })
        .await
        .unwrap();
    assert_eq!(served, 1);

    tokio::time::sleep(Duration::from_millis(20)).await;
    cache.update_tag(&t).await.unwrap();
    cache.flush_refreshes().await;

    assert!(!cache.contains_key("slow").await);

    let next: u32 = cache
        .get_or_compute("slow".to_string(), &binding, || async { Ok::<_, CacheError>(3) })
        .await
        .unwrap();
    assert_eq!(next, 3);
}

#[tokio::test]
async fn test_invalidator_seam() {
    let cache = TagCache::new(CacheConfig::default());
    let invalidator: Arc<dyn Invalidator> = Arc::new(cache.clone());
    let caps = tag::agent_capabilities("component-builder");
    let binding = CacheBinding::new(profile::AGENTS).tag(caps.clone());

    let _: Vec<String> = cache
        .get_or_compute("caps".to_string(), &binding, || async {
            Ok::<_, CacheError>(vec!["generate".to_string()])
        })
        .await
        .unwrap();

    let event = invalidator
        .revalidate_tag(&caps, RevalidateProfile::named(profile::AGENTS))
        .await
        .unwrap();
    assert_eq!(event.keys, vec!["caps".to_string()]);
    assert_eq!(cache.freshness("caps").await, Some(Freshness::Stale));

    let event = invalidator.update_tag(&caps).await.unwrap();
    assert_eq!(event.keys.len(), 1);
    assert!(cache.is_empty().await);
}

#[tokio::test]
async fn test_entries_carry_binding_tags() {
    let cache = TagCache::new(CacheConfig::default());
    let binding = CacheBinding::new(profile::DAYS).tag(tag::llm_context("gpt-4"));

    let _: u32 = cache
        .get_or_compute("ctx".to_string(), &binding, || async { Ok::<_, CacheError>(8192) })
        .await
        .unwrap();

    assert_eq!(
        cache.tags_of("ctx").await,
        Some(vec![Tag::from("llm-context-gpt-4")])
    );
}
