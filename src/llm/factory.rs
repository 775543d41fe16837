use std::sync::Arc;

use tracing::{info, warn};

use super::embeddings::EmbeddingGenerator;
use super::providers::base::{LlmProvider, LlmProviderError};
use super::providers::fallback::LlmProviderWithFallback;
use super::providers::groq::GroqProvider;
use super::providers::ollama::OllamaProvider;
use crate::core::config::MahalleConfig;
use crate::core::error::Result;
use crate::DEFAULT_OLLAMA_URL;


pub struct LlmProviderFactory;

impl LlmProviderFactory {

    pub fn create(
        provider: &str,
        model: &str,
        api_key: Option<&str>,
        base_url: Option<&str>,
        temperature: f64,
        timeout: std::time::Duration,
    ) -> std::result::Result<Arc<dyn LlmProvider>, LlmProviderError> {
        match provider.to_lowercase().as_str() {
            "groq" => Ok(Arc::new(GroqProvider::new(
                api_key.unwrap_or_default(),
                model,
                base_url.map(String::from),
                temperature,
                timeout,
            )?)),
            "ollama" => Ok(Arc::new(OllamaProvider::new(
                base_url.unwrap_or(DEFAULT_OLLAMA_URL),
                model,
                temperature,
                timeout,
            )?)),
            other => Err(LlmProviderError::Config(format!(
                "Unknown provider: {other}. Supported: groq, ollama"
            ))),
        }
    }

    /// Primary provider from config, wrapped with the local Ollama fallback
    /// when enabled. A primary that cannot be constructed (e.g. no Groq key)
    /// degrades to the fallback alone.
    pub fn from_config(config: &MahalleConfig) -> Result<Arc<dyn LlmProvider>> {
        let timeout = config.llm_timeout();
        let primary = Self::create(
            &config.llm_provider,
            &config.llm_model,
            config.llm_api_key.as_deref(),
            config.llm_base_url.as_deref(),
            config.llm_temperature,
            timeout,
        );

        if !config.llm_fallback_enabled || config.llm_provider.eq_ignore_ascii_case("ollama") {
            return Ok(primary?);
        }

        let fallback: Arc<dyn LlmProvider> = Arc::new(OllamaProvider::new(
            &config.llm_fallback_url,
            &config.llm_fallback_model,
            config.llm_temperature,
            timeout,
        )?);

        match primary {
            Ok(primary) => Ok(Arc::new(LlmProviderWithFallback::new(primary, Some(fallback)))),
            Err(LlmProviderError::Config(reason)) => {
                warn!("Primary LLM provider unusable ({}); using fallback only", reason);
                Ok(fallback)
            }
            Err(e) => Err(e.into()),
        }
    }
}


pub struct EmbeddingProviderFactory;

impl EmbeddingProviderFactory {

    pub fn from_config(config: &MahalleConfig) -> Result<EmbeddingGenerator> {
        info!(
            "Creating embedding provider {} ({})",
            config.embedding_provider, config.embedding_model
        );
        Ok(EmbeddingGenerator::new(
            config.embedding_provider.clone(),
            config.embedding_url.clone(),
            config.embedding_model.clone(),
            config.embedding_api_key.clone(),
            config.embedding_timeout(),
            config.embedding_cache_size,
            config.embedding_cache_ttl_secs,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio_test::assert_ok;

    #[test]
    fn test_unknown_provider_is_error() {
        let result = LlmProviderFactory::create("anthropic", "m", None, None, 0.1, Duration::from_secs(1));
        assert!(matches!(result, Err(LlmProviderError::Config(_))));
    }

    #[test]
    fn test_groq_without_key_falls_back_to_ollama() {
        let config = MahalleConfig {
            llm_api_key: None,
            ..Default::default()
        };
        let provider = assert_ok!(LlmProviderFactory::from_config(&config));
        assert_eq!(provider.provider_name(), "ollama");
        assert_eq!(provider.model_name(), config.llm_fallback_model);
    }

    #[test]
    fn test_groq_without_key_and_no_fallback_is_error() {
        let config = MahalleConfig {
            llm_api_key: None,
            llm_fallback_enabled: false,
            ..Default::default()
        };
        assert!(LlmProviderFactory::from_config(&config).is_err());
    }

    #[test]
    fn test_groq_with_key_wraps_fallback() {
        let config = MahalleConfig {
            llm_api_key: Some("gsk_test".to_string()),
            ..Default::default()
        };
        let provider = assert_ok!(LlmProviderFactory::from_config(&config));
        assert_eq!(provider.provider_name(), "groq");
    }

    #[test]
    fn test_embedding_factory_rejects_unknown_provider() {
        let config = MahalleConfig {
            embedding_provider: "word2vec".to_string(),
            ..Default::default()
        };
        assert!(EmbeddingProviderFactory::from_config(&config).is_err());
    }
}
