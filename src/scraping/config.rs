//! Configuration for the scraping module.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::scraping::error::ScrapingError;

/// Configuration for search and page scraping.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScrapingConfig {
    /// Timeout for the search engine request.
    #[serde(with = "duration_serde")]
    pub search_timeout: Duration,
    /// Timeout for each candidate page fetch.
    #[serde(with = "duration_serde")]
    pub page_timeout: Duration,
    /// Connection timeout shared by both clients.
    #[serde(with = "duration_serde")]
    pub connect_timeout: Duration,
    /// Browser-like user agent sent to the search engine.
    pub search_user_agent: String,
    /// Bot user agent sent to candidate pages.
    pub page_user_agent: String,
    /// Search engine region parameter (`kl`).
    pub region: String,
    /// Search engine recency parameter (`df`).
    pub time_filter: String,
    /// Maximum number of URLs kept from one search.
    pub max_results: usize,
    /// Maximum length of the body excerpt, in characters.
    pub excerpt_max_chars: usize,
    /// Host suffixes a result must end with to be kept.
    pub allowed_suffixes: Vec<String>,
    /// Search engines and aggregators whose links are never followed.
    pub denied_hosts: Vec<String>,
    /// Search cache configuration.
    pub cache_config: CacheConfig,
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            search_timeout: Duration::from_secs(15),
            page_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            search_user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36".to_string(),
            page_user_agent: "Mozilla/5.0 (compatible; EventBot/1.0)".to_string(),
            region: "ru-ru".to_string(),
            time_filter: "y".to_string(),
            max_results: 10,
            excerpt_max_chars: 1500,
            allowed_suffixes: default_allowed_suffixes(),
            denied_hosts: default_denied_hosts(),
            cache_config: CacheConfig::default(),
        }
    }
}

impl ScrapingConfig {
    /// Create a new config with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the search request timeout.
    #[must_use]
    pub const fn with_search_timeout(mut self, timeout: Duration) -> Self {
        self.search_timeout = timeout;
        self
    }

    /// Set the page fetch timeout.
    #[must_use]
    pub const fn with_page_timeout(mut self, timeout: Duration) -> Self {
        self.page_timeout = timeout;
        self
    }

    /// Set the search cache configuration.
    #[must_use]
    pub fn with_cache(mut self, cache_config: CacheConfig) -> Self {
        self.cache_config = cache_config;
        self
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any limit or timeout is zero.
    pub fn validate(&self) -> Result<(), ScrapingError> {
        if self.search_timeout.is_zero() || self.page_timeout.is_zero() {
            return Err(ScrapingError::Config(
                "search_timeout and page_timeout must be > 0".to_string(),
            ));
        }

        if self.max_results == 0 {
            return Err(ScrapingError::Config("max_results must be > 0".to_string()));
        }

        if self.excerpt_max_chars == 0 {
            return Err(ScrapingError::Config(
                "excerpt_max_chars must be > 0".to_string(),
            ));
        }

        if self.allowed_suffixes.is_empty() {
            return Err(ScrapingError::Config(
                "allowed_suffixes must not be empty".to_string(),
            ));
        }

        self.cache_config.validate()
    }
}

/// Search cache configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Time-to-live of a cached URL list (seconds).
    pub ttl_seconds: u64,
    /// Maximum number of cached queries.
    pub capacity: usize,
    /// Salt mixed into the query digest.
    pub salt: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 1800, // 30 minutes
            capacity: 200,
            salt: "ddg_v2".to_string(),
        }
    }
}

impl CacheConfig {
    /// TTL as a duration.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    /// Validate cache limits.
    ///
    /// # Errors
    /// Returns an error if the capacity or TTL is zero.
    pub fn validate(&self) -> Result<(), ScrapingError> {
        if self.capacity == 0 {
            return Err(ScrapingError::Config(
                "cache.capacity must be > 0".to_string(),
            ));
        }
        if self.ttl_seconds == 0 {
            return Err(ScrapingError::Config(
                "cache.ttl_seconds must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Country-code and generic suffixes relevant to the target audience.
fn default_allowed_suffixes() -> Vec<String> {
    [
        ".ru", ".su", ".рф", ".xn--p1ai", ".moscow", ".tech", ".com", ".org", ".net",
    ]
    .iter()
    .map(|s| (*s).to_string())
    .collect()
}

/// Search engines and social aggregators that only loop back to listings.
fn default_denied_hosts() -> Vec<String> {
    [
        "duckduckgo.com",
        "yandex.ru",
        "yandex.com",
        "google.com",
        "google.ru",
        "vk.com",
        "vk.ru",
    ]
    .iter()
    .map(|s| (*s).to_string())
    .collect()
}

/// Serde module for Duration serialization.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
