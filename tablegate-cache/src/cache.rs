//! In-memory TTL cache with table-level invalidation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::trace;

use tablegate_core::constants::CACHE_KEY_SEPARATOR;

/// Longest lifetime an entry can have. Larger TTLs are clamped to it.
pub const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Cache entry with an absolute expiry.
#[derive(Clone)]
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Cache configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of entries
    pub max_entries: usize,
    /// Time-to-live in milliseconds. Zero disables caching.
    pub ttl_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            ttl_ms: 60_000,
        }
    }
}

impl CacheConfig {
    /// Configuration with the given TTL and the default capacity.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl_ms: ttl.as_millis() as u64,
            ..Self::default()
        }
    }

    /// Configuration that disables caching.
    pub fn disabled() -> Self {
        Self {
            ttl_ms: 0,
            ..Self::default()
        }
    }

    /// Returns true if entries can be stored at all.
    pub fn is_enabled(&self) -> bool {
        self.ttl_ms > 0 && self.max_entries > 0
    }

    /// Default TTL as a `Duration`.
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }
}

/// Cache key for a collection.
pub fn table_prefix(table: &str) -> String {
    format!("{}{}", table, CACHE_KEY_SEPARATOR)
}

/// Cache key for a single record.
pub fn record_key(table: &str, id: &str) -> String {
    format!("{}{}{}", table, CACHE_KEY_SEPARATOR, id)
}

/// In-memory cache keyed by `table` or `table:id`.
///
/// Thread-safe. An entry is never returned past its expiry; expired entries
/// are evicted lazily on lookup or by [`cleanup_expired`](Self::cleanup_expired).
///
/// Every removal or invalidation bumps a generation counter. A reader that
/// fetched a value from the backend can store it with
/// [`set_if_generation`](Self::set_if_generation) so that a write which landed
/// in between is not shadowed by the stale value.
pub struct TtlCache<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    generation: AtomicU64,
    config: CacheConfig,
}

impl<V: Clone> TtlCache<V> {
    /// Creates a new cache with default configuration.
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    /// Creates a cache with custom configuration.
    pub fn with_config(config: CacheConfig) -> Self {
        let capacity = if config.is_enabled() {
            config.max_entries.min(1024)
        } else {
            0
        };
        Self {
            entries: RwLock::new(HashMap::with_capacity(capacity)),
            generation: AtomicU64::new(0),
            config,
        }
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Returns true if writes are stored.
    pub fn is_enabled(&self) -> bool {
        self.config.is_enabled()
    }

    /// Gets a live entry, evicting it if it has expired.
    pub fn get(&self, key: &str) -> Option<V> {
        {
            let entries = self.entries.read();
            match entries.get(key) {
                None => return None,
                Some(e) if !e.is_expired() => return Some(e.value.clone()),
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write();
        if entries.get(key).is_some_and(|e| e.is_expired()) {
            entries.remove(key);
            trace!(key, "Evicted expired cache entry");
        }
        None
    }

    /// Caches a value with the configured TTL. No-op when caching is disabled.
    pub fn set(&self, key: impl Into<String>, value: V) {
        self.set_with_ttl(key, value, self.config.ttl());
    }

    /// Caches a value with a custom TTL. A zero TTL stores nothing.
    pub fn set_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        if !self.is_enabled() || ttl.is_zero() {
            return;
        }
        let mut entries = self.entries.write();
        self.insert(&mut entries, key.into(), value, ttl);
    }

    /// Invalidation generation. Changes whenever an entry may have been removed.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Caches a value with the configured TTL unless the cache was invalidated
    /// after `generation` was read. Returns true if the value was stored.
    pub fn set_if_generation(&self, key: impl Into<String>, value: V, generation: u64) -> bool {
        if !self.is_enabled() {
            return false;
        }
        let mut entries = self.entries.write();
        if self.generation() != generation {
            trace!(generation, "Skipping cache fill after invalidation");
            return false;
        }
        self.insert(&mut entries, key.into(), value, self.config.ttl());
        true
    }

    fn bump(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    fn insert(
        &self,
        entries: &mut HashMap<String, CacheEntry<V>>,
        key: String,
        value: V,
        ttl: Duration,
    ) {
        if entries.len() >= self.config.max_entries && !entries.contains_key(&key) {
            entries.retain(|_, e| !e.is_expired());
        }
        if entries.len() >= self.config.max_entries && !entries.contains_key(&key) {
            if let Some(oldest_key) = entries
                .iter()
                .min_by_key(|(_, e)| e.inserted_at)
                .map(|(k, _)| k.clone())
            {
                entries.remove(&oldest_key);
            }
        }

        let now = Instant::now();
        let Some(expires_at) = now.checked_add(ttl.min(MAX_TTL)) else {
            trace!(key = %key, "TTL out of range, not caching");
            return;
        };
        entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: now,
                expires_at,
            },
        );
    }

    /// Removes a cached entry. Returns true if one was present.
    pub fn remove(&self, key: &str) -> bool {
        let mut entries = self.entries.write();
        self.bump();
        entries.remove(key).is_some()
    }

    /// Removes every entry whose key starts with `prefix`. Returns the number removed.
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        let mut entries = self.entries.write();
        self.bump();
        let before = entries.len();
        entries.retain(|k, _| !k.starts_with(prefix));
        before - entries.len()
    }

    /// Removes the collection entry for `table` and every `table:*` record entry.
    pub fn invalidate_table(&self, table: &str) -> usize {
        let prefix = table_prefix(table);
        let mut entries = self.entries.write();
        self.bump();
        let before = entries.len();
        entries.retain(|k, _| k != table && !k.starts_with(&prefix));
        before - entries.len()
    }

    /// Returns true if a live entry exists for `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries
            .read()
            .get(key)
            .is_some_and(|e| !e.is_expired())
    }

    /// Clears all cached entries.
    pub fn clear(&self) {
        let mut entries = self.entries.write();
        self.bump();
        entries.clear();
    }

    /// Removes all expired entries. Returns the number removed.
    pub fn cleanup_expired(&self) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, e| !e.is_expired());
        before - entries.len()
    }

    /// Returns the number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Returns cache statistics.
    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.read();
        let expired = entries.values().filter(|e| e.is_expired()).count();
        CacheStats {
            total_entries: entries.len(),
            expired_entries: expired,
            valid_entries: entries.len().saturating_sub(expired),
            capacity: self.config.max_entries,
        }
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache statistics.
#[derive(Clone, Debug, Serialize)]
pub struct CacheStats {
    /// Stored entries, expired ones included
    pub total_entries: usize,
    /// Entries past their TTL but not yet evicted
    pub expired_entries: usize,
    /// Live entries
    pub valid_entries: usize,
    /// Configured maximum
    pub capacity: usize,
}
