//! Application state shared across all request handlers.

use std::sync::Arc;

use crate::config::AgentConfig;
use crate::events::{ArchiveSearch, EventPipeline};
use crate::llm::OllamaModel;
use crate::scraping::{ScrapingService, SearchCache};

/// Shared application state.
pub struct AppState {
    /// Event discovery pipeline, including its cache-fronted scraping service.
    pub pipeline: EventPipeline,
    /// Model name, reported by the health endpoint.
    pub model_name: String,
    /// Archive of past events, when one is attached.
    pub archive: Option<Arc<dyn ArchiveSearch>>,
}

impl AppState {
    /// Build the production pipeline (DuckDuckGo, HTTP fetcher, Ollama) from config.
    ///
    /// # Errors
    /// Returns an error if the config is invalid or a client cannot be created.
    pub fn new(config: &AgentConfig) -> Result<Arc<Self>, Box<dyn std::error::Error + Send + Sync>> {
        config.validate()?;

        let cache = Arc::new(SearchCache::new(&config.scraping.cache_config)?);
        let scraping = ScrapingService::new(&config.scraping, cache)?;
        let model = OllamaModel::new(&config.llm)
            .map_err(|e| format!("Failed to create Ollama client: {e}"))?;
        let pipeline = EventPipeline::new(scraping, Arc::new(model), config.pipeline.clone())?;

        Ok(Self::with_pipeline(pipeline, config.llm.model.clone()))
    }

    /// Wrap an already-assembled pipeline, without an archive.
    #[must_use]
    pub fn with_pipeline(pipeline: EventPipeline, model_name: String) -> Arc<Self> {
        Self::with_archive(pipeline, model_name, None)
    }

    /// Wrap an already-assembled pipeline and an optional archive backend.
    #[must_use]
    pub fn with_archive(
        pipeline: EventPipeline,
        model_name: String,
        archive: Option<Arc<dyn ArchiveSearch>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            pipeline,
            model_name,
            archive,
        })
    }

    /// Scraping service behind the pipeline.
    #[must_use]
    pub const fn scraping(&self) -> &ScrapingService {
        self.pipeline.scraping()
    }
}
