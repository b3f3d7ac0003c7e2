//! Agent configuration: defaults, environment overrides and validation.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::events::pipeline::{PipelineConfig, PipelineError};
use crate::llm::{LlmConfig, LlmError};
use crate::scraping::{CacheConfig, ScrapingConfig, ScrapingError};

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 3000;

/// Ollama endpoint override.
pub const ENV_OLLAMA_URL: &str = "EVENTS_OLLAMA_URL";
/// Completion model override.
pub const ENV_MODEL: &str = "EVENTS_MODEL";
/// HTTP port override.
pub const ENV_PORT: &str = "EVENTS_PORT";
/// Pacing delay override, in milliseconds.
pub const ENV_PACING_MS: &str = "EVENTS_PACING_MS";
/// Search cache TTL override, in seconds.
pub const ENV_CACHE_TTL_SECS: &str = "EVENTS_CACHE_TTL_SECS";
/// Search request timeout override, in seconds.
pub const ENV_SEARCH_TIMEOUT_SECS: &str = "EVENTS_SEARCH_TIMEOUT_SECS";
/// Page fetch timeout override, in seconds.
pub const ENV_PAGE_TIMEOUT_SECS: &str = "EVENTS_PAGE_TIMEOUT_SECS";

/// Invalid configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable holds an unusable value.
    #[error("invalid value for {name}: '{value}'")]
    InvalidEnv {
        /// Variable name.
        name: &'static str,
        /// Raw value.
        value: String,
    },
    /// Scraping settings rejected.
    #[error(transparent)]
    Scraping(#[from] ScrapingError),
    /// Model settings rejected.
    #[error(transparent)]
    Llm(#[from] LlmError),
    /// Pipeline settings rejected.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    /// Port zero.
    #[error("port must be > 0")]
    Port,
}

/// Complete agent configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Search and page scraping.
    pub scraping: ScrapingConfig,
    /// Completion model.
    pub llm: LlmConfig,
    /// Orchestrator settings.
    pub pipeline: PipelineConfig,
    /// HTTP port.
    pub port: u16,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            scraping: ScrapingConfig::default(),
            llm: LlmConfig::default(),
            pipeline: PipelineConfig::default(),
            port: DEFAULT_PORT,
        }
    }
}

impl AgentConfig {
    /// Defaults with `EVENTS_*` environment overrides applied.
    ///
    /// # Errors
    /// Returns an error if an override cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults with overrides read through `lookup`.
    ///
    /// # Errors
    /// Returns an error if an override cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_OLLAMA_URL) {
            config.llm.base_url = Some(url);
        }
        if let Some(model) = lookup(ENV_MODEL) {
            config.llm.model = model;
        }
        if let Some(port) = parse_env(&lookup, ENV_PORT)? {
            config.port = port;
        }
        if let Some(pacing_ms) = parse_env(&lookup, ENV_PACING_MS)? {
            config.pipeline.pacing_ms = pacing_ms;
        }
        if let Some(secs) = parse_env(&lookup, ENV_SEARCH_TIMEOUT_SECS)? {
            config.scraping = config.scraping.with_search_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = parse_env(&lookup, ENV_PAGE_TIMEOUT_SECS)? {
            config.scraping = config.scraping.with_page_timeout(Duration::from_secs(secs));
        }
        if let Some(ttl_seconds) = parse_env(&lookup, ENV_CACHE_TTL_SECS)? {
            let cache_config = CacheConfig {
                ttl_seconds,
                ..config.scraping.cache_config.clone()
            };
            config.scraping = config.scraping.with_cache(cache_config);
        }

        Ok(config)
    }

    /// Validate every section.
    ///
    /// # Errors
    /// Returns the first invalid setting found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scraping.validate()?;
        self.llm.validate()?;
        self.pipeline.validate()?;
        if self.port == 0 {
            return Err(ConfigError::Port);
        }
        Ok(())
    }
}

fn parse_env<F, T>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&'static str) -> Option<String>,
    T: std::str::FromStr,
{
    let Some(value) = lookup(name) else {
        return Ok(None);
    };
    value
        .trim()
        .parse()
        .map(Some)
        .map_err(|_| ConfigError::InvalidEnv { name, value })
}
