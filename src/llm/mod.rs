//! Language-model access for field extraction.
//!
//! The model is an external text-in/text-out service. Everything that talks to
//! it goes through [`LanguageModel`], so the pipeline can run against Ollama in
//! production and against canned responses in tests.

pub mod ollama;

pub use ollama::OllamaModel;

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Boxed future type for completion calls.
pub type LlmFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors raised by a language-model backend.
#[derive(Debug, Error)]
pub enum LlmError {
    /// HTTP client error from Rig.
    #[error("http client error: {0}")]
    HttpClient(#[from] rig::http_client::Error),
    /// Completion error.
    #[error("completion error: {0}")]
    Completion(#[from] rig::completion::CompletionError),
    /// The model answered without any text.
    #[error("model returned an empty response")]
    EmptyResponse,
    /// Invalid configuration.
    #[error("invalid llm configuration: {0}")]
    InvalidConfig(String),
}

/// Text-in/text-out completion service.
pub trait LanguageModel: Send + Sync {
    /// Model identifier, used in logs.
    fn model_name(&self) -> &str;

    /// Send a fully-formed prompt and return the raw model text.
    ///
    /// # Errors
    /// Returns an error if the model cannot be reached or returns nothing.
    fn complete<'a>(&'a self, prompt: &'a str) -> LlmFuture<'a, Result<String, LlmError>>;
}

/// Completion model settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Ollama completion model name.
    pub model: String,
    /// Temperature for generation.
    pub temperature: f64,
    /// Optional max tokens.
    pub max_tokens: Option<u64>,
    /// Optional custom base URL.
    pub base_url: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gemma3:4b".to_string(),
            temperature: 0.0,
            max_tokens: Some(1024),
            base_url: None,
        }
    }
}

impl LlmConfig {
    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if the model name is empty or the base URL is invalid.
    pub fn validate(&self) -> Result<(), LlmError> {
        if self.model.trim().is_empty() {
            return Err(LlmError::InvalidConfig("model must not be empty".to_string()));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(LlmError::InvalidConfig(
                "temperature must be within 0.0..=2.0".to_string(),
            ));
        }

        if let Some(base_url) = &self.base_url {
            Url::parse(base_url)
                .map_err(|e| LlmError::InvalidConfig(format!("base_url: {e}")))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(LlmConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let config = LlmConfig {
            base_url: Some("not a url".to_string()),
            ..LlmConfig::default()
        };
        assert!(matches!(config.validate(), Err(LlmError::InvalidConfig(_))));
    }

    #[test]
    fn test_empty_model_rejected() {
        let config = LlmConfig {
            model: "  ".to_string(),
            ..LlmConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
