//! Web search and scraping for event discovery.
//!
//! This module provides:
//! - DuckDuckGo HTML search with link cleaning and host filtering
//! - A salted-digest search cache with TTL and insertion-ordered eviction
//! - Page fetching with main-content isolation

pub mod cache;
pub mod config;
pub mod content;
pub mod engines;
pub mod error;
pub mod types;
pub mod urls;

pub use cache::SearchCache;
pub use config::{CacheConfig, ScrapingConfig};
pub use content::{PageFetcher, PageSource};
pub use engines::{DuckDuckGo, WebSearch};
pub use error::ScrapingError;
pub use types::PageContent;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

/// Per-key locks held while a cache miss is being searched.
type InFlight = Mutex<HashMap<String, Arc<Mutex<()>>>>;

/// Scraping service that fronts the search engine with the cache and fetches pages.
#[derive(Clone)]
pub struct ScrapingService {
    cache: Arc<SearchCache>,
    engine: Arc<dyn WebSearch>,
    pages: Arc<dyn PageSource>,
    in_flight: Arc<InFlight>,
}

impl ScrapingService {
    /// Create a service backed by DuckDuckGo and the HTTP page fetcher.
    ///
    /// The cache is owned by the caller so it can outlive and be shared between services.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid or an HTTP client cannot be created.
    pub fn new(config: &ScrapingConfig, cache: Arc<SearchCache>) -> Result<Self, ScrapingError> {
        config.validate()?;
        let engine = Arc::new(DuckDuckGo::new(config)?);
        let pages = Arc::new(PageFetcher::new(config)?);
        Ok(Self::with_backends(cache, engine, pages))
    }

    /// Create a service over arbitrary search and page backends.
    #[must_use]
    pub fn with_backends(
        cache: Arc<SearchCache>,
        engine: Arc<dyn WebSearch>,
        pages: Arc<dyn PageSource>,
    ) -> Self {
        Self {
            cache,
            engine,
            pages,
            in_flight: Arc::default(),
        }
    }

    /// Return cached URLs for the query, or search and cache the result (even if empty).
    ///
    /// Concurrent callers whose queries share a cache key wait for the first
    /// search instead of issuing their own.
    pub async fn get_or_search(&self, query: &str) -> Vec<String> {
        let key = self.cache.key_for(query);
        let slot = Arc::clone(self.in_flight.lock().await.entry(key.clone()).or_default());

        let urls = {
            let _searching = slot.lock().await;
            self.lookup_or_search(query).await
        };

        let mut in_flight = self.in_flight.lock().await;
        // Only the map and this caller still hold the slot.
        if Arc::strong_count(&slot) <= 2 {
            in_flight.remove(&key);
        }
        drop(in_flight);
        urls
    }

    async fn lookup_or_search(&self, query: &str) -> Vec<String> {
        if let Some(cached) = self.cache.get(query).await {
            tracing::info!("Cache hit for search: {query}");
            return cached;
        }

        let urls = self.engine.search(query).await;
        self.cache.insert(query, &urls).await;
        let cached = self.cache.entry_count().await;
        tracing::debug!(
            "{} returned {} URLs, {cached} searches cached",
            self.engine.name(),
            urls.len()
        );
        urls
    }

    /// Fetch a page and extract its content, `None` on any failure.
    pub async fn scrape_page(&self, url: &str) -> Option<PageContent> {
        self.pages.fetch_and_extract(url).await
    }

    /// Shared search cache.
    #[must_use]
    pub const fn cache(&self) -> &Arc<SearchCache> {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::scraping::types::ScrapeFuture;

    struct CountingSearch {
        calls: AtomicUsize,
        urls: Vec<String>,
    }

    impl WebSearch for CountingSearch {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn search<'a>(&'a self, _query: &'a str) -> ScrapeFuture<'a, Vec<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let urls = self.urls.clone();
            Box::pin(async move {
                tokio::task::yield_now().await;
                urls
            })
        }
    }

    struct NoPages;

    impl PageSource for NoPages {
        fn fetch_and_extract<'a>(&'a self, _url: &'a str) -> ScrapeFuture<'a, Option<PageContent>> {
            Box::pin(async { None })
        }
    }

    fn service(urls: Vec<String>) -> (ScrapingService, Arc<CountingSearch>) {
        let cache = match SearchCache::new(&CacheConfig::default()) {
            Ok(cache) => Arc::new(cache),
            Err(err) => unreachable!("default cache config rejected: {err}"),
        };
        let engine = Arc::new(CountingSearch {
            calls: AtomicUsize::new(0),
            urls,
        });
        let service = ScrapingService::with_backends(cache, engine.clone(), Arc::new(NoPages));
        (service, engine)
    }

    #[test]
    fn test_service_creation() {
        let cache = SearchCache::new(&CacheConfig::default()).map(Arc::new);
        assert!(cache.is_ok());
        if let Ok(cache) = cache {
            assert!(ScrapingService::new(&ScrapingConfig::default(), cache).is_ok());
        }
    }

    #[tokio::test]
    async fn test_second_lookup_served_from_cache() {
        let (service, engine) = service(vec!["https://a.ru/".to_string()]);

        let first = service.get_or_search("Rust meetup").await;
        let second = service.get_or_search("  rust   MEETUP ").await;

        assert_eq!(first, second);
        assert_eq!(engine.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_search_is_cached() {
        let (service, engine) = service(Vec::new());

        assert!(service.get_or_search("nothing here").await.is_empty());
        assert!(service.get_or_search("nothing here").await.is_empty());
        assert_eq!(engine.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_misses_share_one_search() {
        let (service, engine) = service(vec!["https://a.ru/".to_string()]);

        let (first, second) = tokio::join!(
            service.get_or_search("q x y"),
            service.get_or_search("Q  X Y"),
        );

        assert_eq!(first, second);
        assert_eq!(engine.calls.load(Ordering::SeqCst), 1);
        assert!(service.in_flight.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_distinct_queries_search_separately() {
        let (service, engine) = service(Vec::new());

        tokio::join!(service.get_or_search("rust"), service.get_or_search("go"));

        assert_eq!(engine.calls.load(Ordering::SeqCst), 2);
        assert_eq!(service.cache().entry_count().await, 2);
    }

    #[tokio::test]
    async fn test_scrape_page_failure_is_none() {
        let (service, _) = service(Vec::new());
        assert!(service.scrape_page("https://a.ru/").await.is_none());
    }
}
