//! Search cache keyed by a salted digest of the normalized query.
//!
//! Lookups never touch recency, so eviction follows insertion order: once the
//! capacity is exceeded the oldest stored query goes first. Expired entries are
//! treated as absent on lookup and simply overwritten by the next insert.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use crate::scraping::config::CacheConfig;
use crate::scraping::error::ScrapingError;

/// Cached URL list with its insertion time.
#[derive(Clone, Debug)]
struct CacheEntry {
    urls: Vec<String>,
    stored_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.stored_at) < ttl
    }
}

/// Lowercase, collapse internal whitespace and trim a raw query.
#[must_use]
pub fn normalize_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build the cache key for a query: hex SHA-256 of the normalized query plus salt.
#[must_use]
pub fn cache_key(query: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_query(query).as_bytes());
    hasher.update(salt.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Process-wide cache of search URL lists.
pub struct SearchCache {
    ttl: Duration,
    salt: String,
    entries: Mutex<LruCache<String, CacheEntry>>,
}

impl SearchCache {
    /// Create a new cache with the given configuration.
    ///
    /// # Errors
    /// Returns an error if the capacity is zero.
    pub fn new(config: &CacheConfig) -> Result<Self, ScrapingError> {
        let capacity = NonZeroUsize::new(config.capacity)
            .ok_or_else(|| ScrapingError::Config("cache.capacity must be > 0".to_string()))?;

        Ok(Self {
            ttl: config.ttl(),
            salt: config.salt.clone(),
            entries: Mutex::new(LruCache::new(capacity)),
        })
    }

    /// Key under which `query` is stored.
    #[must_use]
    pub fn key_for(&self, query: &str) -> String {
        cache_key(query, &self.salt)
    }

    /// Get the cached URLs for a query, if present and not expired.
    pub async fn get(&self, query: &str) -> Option<Vec<String>> {
        self.get_at(&self.key_for(query), Instant::now()).await
    }

    /// Store the URLs found for a query, evicting the oldest entry when full.
    pub async fn insert(&self, query: &str, urls: &[String]) {
        self.insert_at(self.key_for(query), urls, Instant::now())
            .await;
    }

    /// Number of stored entries, including expired ones not yet overwritten.
    pub async fn entry_count(&self) -> usize {
        self.entries.lock().await.len()
    }

    async fn get_at(&self, key: &str, now: Instant) -> Option<Vec<String>> {
        let entries = self.entries.lock().await;
        entries
            .peek(key)
            .filter(|entry| entry.is_fresh(now, self.ttl))
            .map(|entry| entry.urls.clone())
    }

    async fn insert_at(&self, key: String, urls: &[String], now: Instant) {
        let mut entries = self.entries.lock().await;
        let entry = CacheEntry {
            urls: urls.to_vec(),
            stored_at: now,
        };
        if let Some((evicted, _)) = entries.push(key.clone(), entry) {
            if evicted != key {
                tracing::debug!("Search cache full, evicted oldest entry {evicted}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(capacity: usize, ttl_seconds: u64) -> SearchCache {
        let config = CacheConfig {
            ttl_seconds,
            capacity,
            salt: "ddg_v2".to_string(),
        };
        match SearchCache::new(&config) {
            Ok(cache) => cache,
            Err(err) => unreachable!("valid cache config rejected: {err}"),
        }
    }

    fn urls(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_normalize_query() {
        assert_eq!(normalize_query("  Rust   MEETUP\tСПб "), "rust meetup спб");
        assert_eq!(normalize_query(""), "");
    }

    #[test]
    fn test_cache_key_ignores_case_and_whitespace() {
        assert_eq!(cache_key(" Foo  Bar ", "ddg_v2"), cache_key("foo bar", "ddg_v2"));
        assert_ne!(cache_key("foo bar", "ddg_v2"), cache_key("foo baz", "ddg_v2"));
        assert_ne!(cache_key("foo bar", "ddg_v2"), cache_key("foo bar", "other"));
        assert_eq!(cache_key("foo bar", "ddg_v2").len(), 64);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let config = CacheConfig {
            capacity: 0,
            ..CacheConfig::default()
        };
        assert!(SearchCache::new(&config).is_err());
    }

    #[tokio::test]
    async fn test_hit_returns_stored_list() {
        let cache = cache(10, 1800);
        let stored = urls(&["https://a.ru/1", "https://b.com/2"]);
        cache.insert("IT конференции", &stored).await;

        assert_eq!(cache.get("it   конференции").await, Some(stored));
        assert_eq!(cache.get("другой запрос").await, None);
    }

    #[tokio::test]
    async fn test_empty_result_is_cached() {
        let cache = cache(10, 1800);
        cache.insert("nothing", &[]).await;
        assert_eq!(cache.get("nothing").await, Some(Vec::new()));
    }

    #[tokio::test]
    async fn test_ttl_boundary() {
        let cache = cache(10, 1800);
        let t0 = Instant::now();
        let key = cache.key_for("query");
        cache.insert_at(key.clone(), &urls(&["https://a.ru"]), t0).await;

        let ttl = Duration::from_secs(1800);
        let eps = Duration::from_millis(1);
        assert!(cache.get_at(&key, t0 + ttl - eps).await.is_some());
        assert!(cache.get_at(&key, t0 + ttl + eps).await.is_none());
    }

    #[tokio::test]
    async fn test_eviction_is_insertion_ordered() {
        let cache = cache(3, 1800);
        cache.insert("first", &urls(&["https://1.ru"])).await;
        cache.insert("second", &urls(&["https://2.ru"])).await;
        cache.insert("third", &urls(&["https://3.ru"])).await;

        // Reading the oldest entry must not protect it from eviction.
        assert!(cache.get("first").await.is_some());

        cache.insert("fourth", &urls(&["https://4.ru"])).await;

        assert_eq!(cache.entry_count().await, 3);
        assert!(cache.get("first").await.is_none());
        assert!(cache.get("second").await.is_some());
        assert!(cache.get("third").await.is_some());
        assert!(cache.get("fourth").await.is_some());
    }

    #[tokio::test]
    async fn test_expired_entry_is_refreshed_in_place() {
        let cache = cache(10, 1800);
        let t0 = Instant::now();
        let key = cache.key_for("query");
        cache.insert_at(key.clone(), &urls(&["https://old.ru"]), t0).await;

        let later = t0 + Duration::from_secs(3600);
        assert!(cache.get_at(&key, later).await.is_none());

        cache.insert_at(key.clone(), &urls(&["https://new.ru"]), later).await;
        assert_eq!(cache.get_at(&key, later).await, Some(urls(&["https://new.ru"])));
        assert_eq!(cache.entry_count().await, 1);
    }
}
