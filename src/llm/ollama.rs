//! Ollama completion client built on Rig.

use reqwest::Client as ReqwestClient;
use rig::client::{CompletionClient, Nothing};
use rig::completion::CompletionModel;
use rig::message::AssistantContent;
use rig::providers::ollama;

use crate::llm::{LanguageModel, LlmConfig, LlmError, LlmFuture};

/// System preamble shared by every extraction call.
const PREAMBLE: &str =
    "Ты извлекаешь структурированные данные о мероприятиях. Отвечай только JSON-объектом.";

/// Ollama-backed [`LanguageModel`].
pub struct OllamaModel {
    model: ollama::CompletionModel,
    model_name: String,
    temperature: f64,
    max_tokens: Option<u64>,
}

impl OllamaModel {
    /// Create a new model client from config.
    ///
    /// # Errors
    /// Returns an error if the config is invalid or the Ollama client cannot be built.
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        config.validate()?;

        let builder = ollama::Client::<ReqwestClient>::builder().api_key(Nothing);
        let builder = if let Some(base_url) = &config.base_url {
            builder.base_url(base_url)
        } else {
            builder
        };
        let client = builder.build()?;
        let model = client.completion_model(config.model.clone());

        Ok(Self {
            model,
            model_name: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

impl LanguageModel for OllamaModel {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn complete<'a>(&'a self, prompt: &'a str) -> LlmFuture<'a, Result<String, LlmError>> {
        Box::pin(async move {
            let request = self
                .model
                .completion_request(prompt.to_string())
                .preamble(PREAMBLE.to_string())
                .temperature(self.temperature)
                .max_tokens_opt(self.max_tokens)
                .build();

            let response = self.model.completion(request).await?;
            let text = extract_text(&response.choice);
            if text.trim().is_empty() {
                return Err(LlmError::EmptyResponse);
            }
            Ok(text)
        })
    }
}

fn extract_text(choice: &rig::OneOrMany<AssistantContent>) -> String {
    let mut out = String::new();
    for content in choice.iter() {
        if let AssistantContent::Text(text) = content {
            out.push_str(&text.text);
        }
    }
    out
}
