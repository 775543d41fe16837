use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// `response_format` value asking a provider to constrain its answer to a
/// single JSON object. Groq passes it through as OpenAI `response_format`,
/// Ollama maps it to `format: "json"`.
pub const JSON_MODE: &str = "json_object";


#[derive(Error, Debug)]
pub enum LlmProviderError {
    /// Transport failure, including the per-attempt client timeout.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// The backend answered but the answer is unusable (error status,
    /// empty choices).
    #[error("{provider} returned an error: {message}")]
    Provider { provider: String, message: String },

    /// Provider cannot be built from the given settings, e.g. no API key.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl LlmProviderError {
    pub fn provider(provider: &str, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    /// The attempt ran into its client timeout rather than failing fast.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Http(e) if e.is_timeout())
    }
}


/// Who answered a completion and what it cost. Fallback fields are only
/// set by `LlmProviderWithFallback`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LlmMetadata {
    pub provider: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_prompt: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_completion: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_total: Option<u32>,
    #[serde(default)]
    pub fallback_used: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_error: Option<String>,
}

impl LlmMetadata {
    pub fn new(provider: &str, model: &str) -> Self {
        Self {
            provider: provider.to_string(),
            model: model.to_string(),
            ..Default::default()
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = Some(base_url.to_string());
        self
    }

    pub fn with_usage(mut self, prompt: u32, completion: u32) -> Self {
        self.tokens_prompt = Some(prompt);
        self.tokens_completion = Some(completion);
        self.tokens_total = Some(prompt.saturating_add(completion));
        self
    }
}

/// Chat-completion backend used for preference extraction.
///
/// When `response_format` is `Some(JSON_MODE)` the returned text must be a
/// JSON object; the extractor still parses leniently, since small local
/// models occasionally wrap it in prose or code fences. Implementations
/// bound each call with their own client timeout, which has to be shorter
/// than the caller's extraction budget for a fallback to get a turn.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        response_format: Option<&str>,
    ) -> Result<(String, LlmMetadata), LlmProviderError>;

    fn provider_name(&self) -> &str;

    fn model_name(&self) -> &str;
}

#[async_trait]
impl LlmProvider for Arc<dyn LlmProvider> {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        response_format: Option<&str>,
    ) -> Result<(String, LlmMetadata), LlmProviderError> {
        (**self).generate(system_prompt, user_prompt, response_format).await
    }

    fn provider_name(&self) -> &str {
        (**self).provider_name()
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}
