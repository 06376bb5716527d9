//! Main cache store: get-or-compute with stale-while-revalidate and tag invalidation

use crate::binding::CacheBinding;
use crate::config::CacheConfig;
use crate::entry::CacheEntry;
use crate::error::{CacheError, Result};
use crate::invalidation::{InvalidationEvent, InvalidationReason, Invalidator, RevalidateProfile};
use crate::profile::{CacheProfile, ProfileRegistry};
use crate::tag::Tag;
use crate::types::{CacheKey, CacheStats, CacheValue, Freshness};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt::Display;
use std::future::Future;
use std::sync::{Arc, MutexGuard, PoisonError};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Tag-indexed cache with named profiles
///
/// This implementation provides:
/// - Thread-safe async access via RwLock
/// - At most one compute per key at a time
/// - Stale-while-revalidate with deduplicated background refreshes
/// - Tag revalidation (eventual) and tag update (read-your-writes)
/// - LRU eviction when the entry limit is reached
///
/// Cloning is cheap; clones share the same storage.
#[derive(Clone)]
pub struct TagCache {
    inner: Arc<Inner>,
}

struct Inner {
    config: CacheConfig,
    store: RwLock<CacheStore>,
    compute_locks: Mutex<HashMap<CacheKey, Arc<Mutex<()>>>>,
    refreshes: Mutex<Vec<JoinHandle<()>>>,
    /// Locked after `store`, never held across an await
    epochs: std::sync::Mutex<TagEpochs>,
}

/// Per-tag invalidation counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct TagEpoch {
    updated: u64,
    revalidated: u64,
}

/// Tag epochs captured when a compute starts
type EpochSnapshot = Vec<(Tag, TagEpoch)>;

/// Epochs for tags that a running compute carries
///
/// A tag is tracked only while at least one compute holds a snapshot of it,
/// so invalidating tags nobody is computing leaves nothing behind.
#[derive(Default)]
struct TagEpochs {
    epochs: HashMap<Tag, TagEpoch>,
    in_flight: HashMap<Tag, usize>,
}

impl TagEpochs {
    fn begin(&mut self, tags: &[Tag]) -> EpochSnapshot {
        tags.iter()
            .map(|tag| {
                *self.in_flight.entry(tag.clone()).or_default() += 1;
                (tag.clone(), self.current(tag))
            })
            .collect()
    }

    fn end(&mut self, snapshot: &EpochSnapshot) {
        for (tag, _) in snapshot {
            let Some(count) = self.in_flight.get_mut(tag) else {
                continue;
            };
            *count -= 1;
            if *count == 0 {
                self.in_flight.remove(tag);
                self.epochs.remove(tag);
            }
        }
    }

    fn current(&self, tag: &Tag) -> TagEpoch {
        self.epochs.get(tag).copied().unwrap_or_default()
    }

    fn bump(&mut self, tag: &Tag, bump: impl FnOnce(&mut TagEpoch)) {
        if self.in_flight.contains_key(tag) {
            bump(self.epochs.entry(tag.clone()).or_default());
        }
    }
}

/// Releases a compute's epoch snapshot when dropped, including on panic or cancellation
struct ComputeTicket {
    cache: TagCache,
    snapshot: EpochSnapshot,
}

impl Drop for ComputeTicket {
    fn drop(&mut self) {
        self.cache.epochs().end(&self.snapshot);
    }
}

/// Internal cache storage
struct CacheStore {
    /// Main storage: key -> entry
    entries: HashMap<CacheKey, CacheEntry>,

    /// LRU tracking: maintains access order
    lru_queue: VecDeque<CacheKey>,

    /// Current cache statistics
    stats: CacheStats,

    /// Keys with a background refresh in flight
    refreshing: HashSet<CacheKey>,
}

enum Lookup {
    Fresh(CacheValue),
    Stale { value: CacheValue, refresh: bool },
    Miss,
}

impl CacheStore {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            lru_queue: VecDeque::new(),
            stats: CacheStats::default(),
            refreshing: HashSet::new(),
        }
    }

    fn touch(&mut self, key: &str) {
        self.lru_queue.retain(|k| k != key);
        self.lru_queue.push_back(key.to_string());
    }

    fn remove_entry(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.lru_queue.retain(|k| k != key);
        self.stats.entries = self.entries.len();
        Some(entry)
    }

    fn put(&mut self, entry: CacheEntry, max_entries: usize) {
        let key = entry.key.clone();
        if self.entries.contains_key(&key) {
            debug!("Replacing cache entry: {}", key);
        } else {
            while self.entries.len() >= max_entries {
                let Some(oldest) = self.lru_queue.pop_front() else {
                    break;
                };
                debug!("Evicting entry due to max_entries limit: {}", oldest);
                self.entries.remove(&oldest);
                self.stats.evictions_size += 1;
            }
            debug!("Inserting new cache entry: {}", key);
        }
        self.entries.insert(key.clone(), entry);
        self.touch(&key);
    }
}

impl TagCache {
    /// Create a new cache with the given configuration
    pub fn new(config: CacheConfig) -> Self {
        info!(
            "Initializing tag cache (max_entries: {}, profiles: {})",
            config.max_entries,
            config.profiles.len()
        );

        Self {
            inner: Arc::new(Inner {
                config,
                store: RwLock::new(CacheStore::new()),
                compute_locks: Mutex::new(HashMap::new()),
                refreshes: Mutex::new(Vec::new()),
                epochs: std::sync::Mutex::new(TagEpochs::default()),
            }),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    pub fn profiles(&self) -> &ProfileRegistry {
        &self.inner.config.profiles
    }

    /// Resolve a profile by name
    pub fn profile(&self, name: &str) -> Result<CacheProfile> {
        self.inner.config.profiles.get(name)
    }

    /// Return the cached value for `key`, computing it when missing or expired
    ///
    /// - fresh entry: returned as is
    /// - stale entry: returned as is, one background refresh is started
    /// - missing or expired: `compute` runs before returning; concurrent callers
    ///   for the same key wait for that compute instead of starting their own
    ///
    /// A failed compute is returned to the caller and never stored.
    pub async fn get_or_compute<T, E, F, Fut>(
        &self,
        key: CacheKey,
        binding: &CacheBinding,
        compute: F,
    ) -> std::result::Result<T, E>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        E: From<CacheError> + Display + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<T, E>> + Send + 'static,
    {
        let profile = self.profile(&binding.profile)?;

        match self.lookup(&key).await {
            Lookup::Fresh(value) => {
                debug!("Cache hit: {}", key);
                Ok(serde_json::from_value(value).map_err(CacheError::from)?)
            }
            Lookup::Stale { value, refresh } => {
                debug!("Serving stale entry: {}", key);
                if refresh {
                    self.spawn_refresh(key, binding.clone(), profile, compute).await;
                }
                Ok(serde_json::from_value(value).map_err(CacheError::from)?)
            }
            Lookup::Miss => self.compute_and_store(key, binding, profile, compute).await,
        }
    }

    /// Mark every entry carrying `tag` stale; `profile` bounds how long it may still be served
    pub async fn revalidate_tag(&self, tag: &Tag, profile: RevalidateProfile) -> Result<InvalidationEvent> {
        let expire = profile.resolve_expire(&self.inner.config.profiles)?;

        let mut store = self.inner.store.write().await;
        self.epochs().bump(tag, |epoch| epoch.revalidated += 1);

        let mut keys = Vec::new();
        for (key, entry) in store.entries.iter_mut() {
            if entry.has_tag(tag) {
                entry.mark_stale(expire);
                keys.push(key.clone());
            }
        }
        store.stats.revalidations += 1;

        info!("Revalidated {} entries with tag: {}", keys.len(), tag);
        Ok(InvalidationEvent::new(
            InvalidationReason::TagRevalidated {
                tag: tag.to_string(),
            },
            keys,
        ))
    }

    /// Drop every entry carrying `tag`; computes already running for it will not be stored
    pub async fn update_tag(&self, tag: &Tag) -> Result<InvalidationEvent> {
        let mut store = self.inner.store.write().await;
        self.epochs().bump(tag, |epoch| epoch.updated += 1);

        let keys: Vec<CacheKey> = store
            .entries
            .iter()
            .filter(|(_, entry)| entry.has_tag(tag))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &keys {
            store.remove_entry(key);
        }
        store.stats.updates += 1;
        self.update_stats(&mut store);

        info!("Updated tag {}: dropped {} entries", tag, keys.len());
        Ok(InvalidationEvent::new(
            InvalidationReason::TagUpdated {
                tag: tag.to_string(),
            },
            keys,
        ))
    }

    /// Remove a specific entry from the cache
    pub async fn invalidate_key(&self, key: &str) -> Option<CacheValue> {
        let mut store = self.inner.store.write().await;
        let entry = store.remove_entry(key)?;
        debug!("Removed cache entry: {}", key);
        Some(entry.value)
    }

    /// Freshness of the entry stored under `key`, if any
    pub async fn freshness(&self, key: &str) -> Option<Freshness> {
        let store = self.inner.store.read().await;
        store.entries.get(key).map(CacheEntry::freshness)
    }

    /// Tags stamped on the entry stored under `key`, if any
    pub async fn tags_of(&self, key: &str) -> Option<Vec<Tag>> {
        let store = self.inner.store.read().await;
        store.entries.get(key).map(|e| e.metadata.tags.clone())
    }

    /// Check if a key exists in the cache (without updating access time)
    pub async fn contains_key(&self, key: &str) -> bool {
        let store = self.inner.store.read().await;
        store.entries.contains_key(key)
    }

    /// Clear all entries from the cache
    pub async fn clear(&self) {
        let mut store = self.inner.store.write().await;

        let count = store.entries.len();
        store.entries.clear();
        store.lru_queue.clear();
        store.stats.entries = 0;

        info!("Cleared {} entries from cache", count);
    }

    /// Remove all expired entries
    pub async fn cleanup_expired(&self) -> Vec<InvalidationEvent> {
        let mut store = self.inner.store.write().await;

        let expired_keys: Vec<CacheKey> = store
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        if expired_keys.is_empty() {
            return Vec::new();
        }

        for key in &expired_keys {
            store.remove_entry(key);
        }
        store.stats.evictions_ttl += expired_keys.len() as u64;

        debug!("Cleaned up {} expired entries", expired_keys.len());
        let context = format!("Cleaned up {} expired entries", expired_keys.len());
        vec![InvalidationEvent::new(InvalidationReason::Expired, expired_keys).with_context(context)]
    }

    /// Wait for every background refresh started so far
    pub async fn flush_refreshes(&self) {
        let handles: Vec<JoinHandle<()>> = {
            let mut refreshes = self.inner.refreshes.lock().await;
            refreshes.drain(..).collect()
        };

        for handle in handles {
            if let Err(e) = handle.await {
                warn!("Background refresh task panicked: {}", e);
            }
        }
    }

    /// Get cache statistics
    pub async fn stats(&self) -> CacheStats {
        let store = self.inner.store.read().await;
        store.stats.clone()
    }

    /// Get number of entries in cache
    pub async fn len(&self) -> usize {
        let store = self.inner.store.read().await;
        store.entries.len()
    }

    /// Check if cache is empty
    pub async fn is_empty(&self) -> bool {
        let store = self.inner.store.read().await;
        store.entries.is_empty()
    }

    /// Spawn the periodic cleanup task if enabled
    pub fn spawn_auto_cleanup(&self) -> Option<JoinHandle<()>> {
        if !self.inner.config.enable_auto_cleanup {
            return None;
        }
        Some(tokio::spawn(start_auto_cleanup(self.clone())))
    }

    async fn lookup(&self, key: &str) -> Lookup {
        let mut store = self.inner.store.write().await;

        let freshness = store.entries.get(key).map(CacheEntry::freshness);
        let Some(freshness) = freshness else {
            debug!("Cache miss: {}", key);
            store.stats.misses += 1;
            return Lookup::Miss;
        };

        if freshness == Freshness::Expired {
            debug!("Cache entry expired: {}", key);
            store.remove_entry(key);
            store.stats.misses += 1;
            store.stats.evictions_ttl += 1;
            return Lookup::Miss;
        }

        let value = match store.entries.get_mut(key) {
            Some(entry) => {
                entry.mark_accessed();
                entry.value.clone()
            }
            None => return Lookup::Miss,
        };
        store.touch(key);

        if freshness == Freshness::Fresh {
            store.stats.hits += 1;
            Lookup::Fresh(value)
        } else {
            store.stats.stale_hits += 1;
            let refresh = store.refreshing.insert(key.to_string());
            Lookup::Stale { value, refresh }
        }
    }

    async fn compute_and_store<T, E, F, Fut>(
        &self,
        key: CacheKey,
        binding: &CacheBinding,
        profile: CacheProfile,
        compute: F,
    ) -> std::result::Result<T, E>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        E: From<CacheError> + Display + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<T, E>> + Send + 'static,
    {
        let lock = self.compute_lock(&key).await;
        let guard = lock.lock().await;

        let outcome = self.compute_locked(&key, binding, profile, compute).await;

        drop(guard);
        self.release_lock(&key, lock).await;
        outcome
    }

    async fn compute_locked<T, E, F, Fut>(
        &self,
        key: &str,
        binding: &CacheBinding,
        profile: CacheProfile,
        compute: F,
    ) -> std::result::Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<CacheError> + Display,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        // Another caller may have stored a value while we waited for the lock
        let existing = {
            let store = self.inner.store.read().await;
            store
                .entries
                .get(key)
                .filter(|entry| !entry.is_expired())
                .map(|entry| entry.value.clone())
        };
        if let Some(value) = existing {
            debug!("Cache filled by concurrent compute: {}", key);
            return Ok(serde_json::from_value(value).map_err(CacheError::from)?);
        }

        let ticket = self.begin_compute(binding);
        let value = compute().await.map_err(|e| {
            warn!("Compute failed for {}: {}", key, e);
            e
        })?;

        let json = serde_json::to_value(&value).map_err(CacheError::from)?;
        self.store_value(key, json, binding, profile, &ticket.snapshot, false)
            .await;
        Ok(value)
    }

    async fn spawn_refresh<T, E, F, Fut>(
        &self,
        key: CacheKey,
        binding: CacheBinding,
        profile: CacheProfile,
        compute: F,
    ) where
        T: Serialize + DeserializeOwned + Send + 'static,
        E: From<CacheError> + Display + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<T, E>> + Send + 'static,
    {
        let cache = self.clone();
        let handle = tokio::spawn(async move {
            let lock = cache.compute_lock(&key).await;
            let guard = lock.lock().await;
            let ticket = cache.begin_compute(&binding);

            // Run the compute in its own task so a panic still reaches the cleanup below
            let task_key = key.clone();
            let computed = tokio::spawn(async move {
                match compute().await {
                    Ok(value) => match serde_json::to_value(&value) {
                        Ok(json) => Some(json),
                        Err(e) => {
                            error!(
                                "Background refresh of {} produced unserializable value: {}",
                                task_key, e
                            );
                            None
                        }
                    },
                    Err(e) => {
                        warn!("Background refresh of {} failed, keeping stale value: {}", task_key, e);
                        None
                    }
                }
            })
            .await
            .unwrap_or_else(|e| {
                error!("Background refresh of {} panicked, keeping stale value: {}", key, e);
                None
            });

            let failed = computed.is_none();
            if let Some(json) = computed {
                cache
                    .store_value(&key, json, &binding, profile, &ticket.snapshot, true)
                    .await;
            }

            drop(ticket);
            drop(guard);
            cache.release_lock(&key, lock).await;

            let mut store = cache.inner.store.write().await;
            store.refreshing.remove(&key);
            if failed {
                store.stats.refresh_failures += 1;
            }
        });

        let mut refreshes = self.inner.refreshes.lock().await;
        refreshes.retain(|h| !h.is_finished());
        refreshes.push(handle);
    }

    /// Store a computed value unless one of its tags was updated since `snapshot`
    async fn store_value(
        &self,
        key: &str,
        value: CacheValue,
        binding: &CacheBinding,
        profile: CacheProfile,
        snapshot: &EpochSnapshot,
        background: bool,
    ) -> bool {
        let mut store = self.inner.store.write().await;

        let mut revalidated_since = false;
        {
            let epochs = self.epochs();
            for (tag, before) in snapshot {
                let now = epochs.current(tag);
                if now.updated != before.updated {
                    debug!("Discarding value for {}: tag {} updated during compute", key, tag);
                    return false;
                }
                revalidated_since |= now.revalidated != before.revalidated;
            }
        }

        let mut entry = CacheEntry::new(key.to_string(), value, binding, profile);
        if revalidated_since {
            entry.mark_stale(None);
        }
        store.put(entry, self.inner.config.max_entries);

        if background {
            store.stats.background_refreshes += 1;
        } else {
            store.stats.recomputes += 1;
        }
        self.update_stats(&mut store);
        true
    }

    fn epochs(&self) -> MutexGuard<'_, TagEpochs> {
        self.inner.epochs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin_compute(&self, binding: &CacheBinding) -> ComputeTicket {
        let snapshot = self.epochs().begin(&binding.tags);
        ComputeTicket {
            cache: self.clone(),
            snapshot,
        }
    }

    async fn compute_lock(&self, key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.inner.compute_locks.lock().await;
        locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn release_lock(&self, key: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.inner.compute_locks.lock().await;
        // map + this handle; anything more means someone is waiting
        if Arc::strong_count(&lock) <= 2 {
            locks.remove(key);
        }
    }

    fn update_stats(&self, store: &mut CacheStore) {
        if self.inner.config.enable_metrics {
            store.stats.entries = store.entries.len();
        }
    }
}

#[async_trait]
impl Invalidator for TagCache {
    async fn revalidate_tag(&self, tag: &Tag, profile: RevalidateProfile) -> Result<InvalidationEvent> {
        TagCache::revalidate_tag(self, tag, profile).await
    }

    async fn update_tag(&self, tag: &Tag) -> Result<InvalidationEvent> {
        TagCache::update_tag(self, tag).await
    }
}

/// Background task for automatic cache cleanup
pub async fn start_auto_cleanup(cache: TagCache) {
    let interval = cache.inner.config.cleanup_interval;

    info!("Starting automatic cache cleanup task (interval: {:?})", interval);

    loop {
        tokio::time::sleep(interval).await;

        let events = cache.cleanup_expired().await;
        if !events.is_empty() {
            debug!("Auto cleanup: {} events", events.len());
        }
    }
}
