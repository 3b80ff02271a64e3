//! Read-through response cache with TTL expiry, LRU eviction and pattern invalidation

use crate::cache::{
    config::CacheConfig,
    entry::CacheEntry,
    key::CacheKeyBuilder,
    types::{CacheKey, CacheStats, CacheValue},
};
use crate::error::{BridgeError, Result};
use chrono::Utc;
use regex::Regex;
use lru::LruCache;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Namespaced response cache
///
/// This implementation provides:
/// - Thread-safe async access via RwLock
/// - Read-through lookups via [`get_or_fetch`](Self::get_or_fetch)
/// - Expired entries treated as absent
/// - LRU eviction when `max_entries` is reached
/// - Exact and regex-based invalidation
/// - A global on/off switch independent of per-call bypass
///
/// Instances are constructed explicitly and shared by `Arc`; two caches never
/// see each other's entries.
pub struct ResponseCache {
    config: CacheConfig,

    keys: CacheKeyBuilder,

    /// Internal storage
    store: RwLock<CacheStore>,

    enabled: AtomicBool,
}

/// Internal cache storage
struct CacheStore {
    /// Entries in access order; bounded by `max_entries`
    entries: LruCache<CacheKey, CacheEntry>,

    stats: CacheStats,
}

impl CacheStore {
    fn remove(&mut self, key: &str) -> bool {
        if self.entries.pop(key).is_some() {
            self.stats.entries = self.entries.len();
            true
        } else {
            false
        }
    }

    fn put(&mut self, key: CacheKey, entry: CacheEntry) {
        if !self.entries.contains(&key) && self.entries.len() >= self.entries.cap().get() {
            if let Some((evicted, _)) = self.entries.pop_lru() {
                debug!("Evicting entry due to max_entries limit: {}", evicted);
                self.stats.evictions += 1;
            }
        }

        self.entries.put(key, entry);
        self.stats.sets += 1;
        self.stats.entries = self.entries.len();
    }
}

impl ResponseCache {
    /// Create a new cache with the given configuration
    pub fn new(config: CacheConfig) -> Result<Self> {
        config.validate().map_err(BridgeError::Configuration)?;
        let capacity = NonZeroUsize::new(config.max_entries).ok_or_else(|| {
            BridgeError::Configuration("max_entries must be greater than 0".to_string())
        })?;
        info!(
            "Initializing response cache (namespace: {}, max_entries: {})",
            config.namespace, config.max_entries
        );

        let store = CacheStore {
            entries: LruCache::new(capacity),
            stats: CacheStats::default(),
        };

        Ok(Self {
            keys: CacheKeyBuilder::new(config.namespace.clone()),
            enabled: AtomicBool::new(config.enabled),
            config,
            store: RwLock::new(store),
        })
    }

    /// Create a cache with default settings under the given namespace
    pub fn with_namespace(namespace: impl Into<String>) -> Result<Self> {
        Self::new(CacheConfig::builder().namespace(namespace).build())
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Key builder bound to this cache's namespace
    pub fn keys(&self) -> &CacheKeyBuilder {
        &self.keys
    }

    /// Return the cached value for `key`, or run `loader` and cache its result
    ///
    /// With `bypass` set, or while the cache is disabled, the store is neither
    /// read nor written; the call still counts as a miss and a bypass. A
    /// failing loader leaves the store untouched. The lock is not held while
    /// the loader runs, so two concurrent misses on one key may both load.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        bypass: bool,
        loader: F,
    ) -> Result<CacheValue>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CacheValue>>,
    {
        if bypass || !self.is_enabled() {
            {
                let mut store = self.store.write().await;
                store.stats.misses += 1;
                store.stats.bypasses += 1;
            }
            debug!("Cache bypass: {}", key);
            return loader().await;
        }

        if let Some(value) = self.get(key).await {
            return Ok(value);
        }

        let value = loader().await?;
        self.insert(key.to_string(), value.clone(), ttl).await;
        Ok(value)
    }

    /// Look up a value, counting a hit or a miss
    ///
    /// Expired entries are removed and reported as absent.
    pub async fn get(&self, key: &str) -> Option<CacheValue> {
        let mut store = self.store.write().await;
        let now = Utc::now();

        // `get` also marks the entry most recently used
        let lookup = store
            .entries
            .get(key)
            .map(|entry| entry.is_valid_at(now).then(|| entry.value.clone()));

        match lookup {
            Some(Some(value)) => {
                store.stats.hits += 1;
                debug!("Cache hit: {}", key);
                Some(value)
            }
            Some(None) => {
                debug!("Cache entry expired: {}", key);
                store.remove(key);
                store.stats.misses += 1;
                None
            }
            None => {
                store.stats.misses += 1;
                debug!("Cache miss: {}", key);
                None
            }
        }
    }

    /// Store a value under `key` for `ttl`
    pub async fn insert(&self, key: CacheKey, value: CacheValue, ttl: Duration) {
        let mut store = self.store.write().await;
        debug!("Caching {} for {:?}", key, ttl);
        store.put(key, CacheEntry::new(value, ttl));
    }

    /// Check if a live entry exists (without touching counters or LRU order)
    pub async fn contains_key(&self, key: &str) -> bool {
        let store = self.store.read().await;
        store
            .entries
            .peek(key)
            .map(|entry| !entry.is_expired())
            .unwrap_or(false)
    }

    /// Remove one entry; returns whether it existed
    pub async fn invalidate(&self, key: &str) -> bool {
        let mut store = self.store.write().await;
        let existed = store.remove(key);
        if existed {
            store.stats.invalidations += 1;
            debug!("Invalidated cache entry: {}", key);
        }
        existed
    }

    /// Remove every entry whose key matches `pattern`; returns the count
    pub async fn invalidate_pattern(&self, pattern: &Regex) -> usize {
        let mut store = self.store.write().await;

        let keys_to_remove: Vec<CacheKey> = store
            .entries
            .iter()
            .filter(|(key, _)| pattern.is_match(key))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &keys_to_remove {
            store.remove(key);
        }

        let removed = keys_to_remove.len();
        store.stats.invalidations += removed as u64;
        debug!("Invalidated {} entries matching {}", removed, pattern);
        removed
    }

    /// Compile `pattern` and invalidate every matching entry
    pub async fn invalidate_matching(&self, pattern: &str) -> Result<usize> {
        let regex = Regex::new(pattern)?;
        Ok(self.invalidate_pattern(&regex).await)
    }

    /// Remove all entries and reset statistics; returns the count removed
    pub async fn clear(&self) -> usize {
        let mut store = self.store.write().await;

        let count = store.entries.len();
        store.entries.clear();
        store.stats = CacheStats::default();

        info!("Cleared {} entries from cache", count);
        count
    }

    /// Remove all expired entries; returns the count removed
    pub async fn cleanup_expired(&self) -> usize {
        let mut store = self.store.write().await;
        let now = Utc::now();

        let expired_keys: Vec<CacheKey> = store
            .entries
            .iter()
            .filter(|(_, entry)| !entry.is_valid_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            store.remove(key);
        }

        if !expired_keys.is_empty() {
            debug!("Cleaned up {} expired entries", expired_keys.len());
        }
        expired_keys.len()
    }

    /// Force every lookup to call its loader until [`enable`](Self::enable)
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::SeqCst);
        info!("Response cache disabled");
    }

    /// Resume serving lookups from the store
    ///
    /// Entries stored before [`disable`](Self::disable) are still served if
    /// they have not expired.
    pub fn enable(&self) {
        self.enabled.store(true, Ordering::SeqCst);
        info!("Response cache enabled");
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Get cache statistics
    pub async fn stats(&self) -> CacheStats {
        let store = self.store.read().await;
        store.stats.clone()
    }

    /// Get number of entries in cache
    pub async fn len(&self) -> usize {
        let store = self.store.read().await;
        store.entries.len()
    }

    /// Check if cache is empty
    pub async fn is_empty(&self) -> bool {
        let store = self.store.read().await;
        store.entries.is_empty()
    }
}

/// Spawn the background sweep of expired entries
///
/// Returns `None` when auto cleanup is disabled in the cache's configuration.
/// The task holds a strong reference; abort the handle to stop it.
pub fn spawn_cleanup_task(cache: Arc<ResponseCache>) -> Option<JoinHandle<()>> {
    if !cache.config.enable_auto_cleanup {
        return None;
    }

    let interval = cache.config.cleanup_interval;
    info!("Starting automatic cache cleanup task (interval: {:?})", interval);

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = cache.cleanup_expired().await;
            if removed > 0 {
                debug!("Auto cleanup removed {} entries", removed);
            }
        }
    }))
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("namespace", &self.config.namespace)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
