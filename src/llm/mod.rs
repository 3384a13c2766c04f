//! Language model abstraction and the Ollama-backed completion client.
//!
//! The assistant treats the model as a black box: one prompt in, one completion out, no
//! streaming and no retries. The Ollama adapter issues a single non-streaming
//! `/api/generate` request per call.

use crate::config::Config;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced while generating a completion.
#[derive(Debug, Error)]
pub enum LanguageModelError {
    /// Provider was unreachable or the model is not installed.
    #[error("Language model unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Failed to generate completion: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// Interface implemented by completion providers.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Produce a completion for the fully composed prompt.
    async fn generate(&self, prompt: &str) -> Result<String, LanguageModelError>;
}

/// Build the language model client described by the configuration.
pub fn language_model_from_config(config: &Config) -> Arc<dyn LanguageModel> {
    Arc::new(OllamaLanguageModel::new(
        config.ollama_url.clone(),
        config.llm_model.clone(),
    ))
}

/// Completion client for a local Ollama runtime.
pub struct OllamaLanguageModel {
    http: Client,
    base_url: String,
    model: String,
}

impl OllamaLanguageModel {
    /// Build a client for `model` served at `base_url`.
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
            model: model.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    done: bool,
}

#[async_trait]
impl LanguageModel for OllamaLanguageModel {
    async fn generate(&self, prompt: &str) -> Result<String, LanguageModelError> {
        let payload = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
        });

        tracing::debug!(model = %self.model, prompt_chars = prompt.len(), "Invoking language model");
        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                LanguageModelError::ProviderUnavailable(format!(
                    "failed to reach Ollama at {}: {error}",
                    self.base_url
                ))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            let body = response.text().await.unwrap_or_default();
            return Err(LanguageModelError::ProviderUnavailable(format!(
                "model '{}' not available at {}: {body}",
                self.model,
                self.endpoint()
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LanguageModelError::GenerationFailed(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let body: OllamaResponse = response.json().await.map_err(|error| {
            LanguageModelError::InvalidResponse(format!(
                "failed to decode Ollama response: {error}"
            ))
        })?;

        if !body.done {
            return Err(LanguageModelError::InvalidResponse(
                "Ollama response incomplete (streaming not supported)".into(),
            ));
        }

        Ok(body.response)
    }
}
