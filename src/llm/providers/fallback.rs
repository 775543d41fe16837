

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

use super::base::{LlmMetadata, LlmProvider, LlmProviderError};

/// Wraps a primary provider and retries a failed call once on a secondary
/// (normally a local Ollama model).
pub struct LlmProviderWithFallback {
    primary: Arc<dyn LlmProvider>,
    fallback: Option<Arc<dyn LlmProvider>>,
    using_fallback: AtomicBool,
    fallback_count: AtomicUsize,
    primary_failures: AtomicUsize,
}

impl LlmProviderWithFallback {

    pub fn new(primary: Arc<dyn LlmProvider>, fallback: Option<Arc<dyn LlmProvider>>) -> Self {
        match &fallback {
            Some(f) => info!(
                "LlmProviderWithFallback initialized: primary={}/{}, fallback={}/{}",
                primary.provider_name(),
                primary.model_name(),
                f.provider_name(),
                f.model_name()
            ),
            None => info!(
                "LlmProviderWithFallback initialized without fallback: primary={}",
                primary.provider_name()
            ),
        }

        Self {
            primary,
            fallback,
            using_fallback: AtomicBool::new(false),
            fallback_count: AtomicUsize::new(0),
            primary_failures: AtomicUsize::new(0),
        }
    }


    async fn fallback_generate(
        &self,
        fallback: &dyn LlmProvider,
        system_prompt: &str,
        user_prompt: &str,
        response_format: Option<&str>,
        original_error: &LlmProviderError,
    ) -> Result<(String, LlmMetadata), LlmProviderError> {
        warn!(
            "Falling back to {} ({}) due to: {}",
            fallback.provider_name(),
            fallback.model_name(),
            original_error
        );

        let (content, mut metadata) = fallback
            .generate(system_prompt, user_prompt, response_format)
            .await?;

        metadata.fallback_used = true;
        metadata.original_provider = Some(self.primary.provider_name().to_string());
        metadata.original_error = Some(original_error.to_string());

        self.using_fallback.store(true, Ordering::SeqCst);
        let total = self.fallback_count.fetch_add(1, Ordering::SeqCst) + 1;
        info!("Fallback successful! total_fallbacks={}", total);

        Ok((content, metadata))
    }


    pub fn is_using_fallback(&self) -> bool {
        self.using_fallback.load(Ordering::SeqCst)
    }


    pub fn fallback_count(&self) -> usize {
        self.fallback_count.load(Ordering::SeqCst)
    }


    pub fn primary_failures(&self) -> usize {
        self.primary_failures.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for LlmProviderWithFallback {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        response_format: Option<&str>,
    ) -> Result<(String, LlmMetadata), LlmProviderError> {
        match self.primary.generate(system_prompt, user_prompt, response_format).await {
            Ok((content, metadata)) => {
                self.using_fallback.store(false, Ordering::SeqCst);
                self.primary_failures.store(0, Ordering::SeqCst);
                Ok((content, metadata))
            }
            Err(e) => {
                let failures = self.primary_failures.fetch_add(1, Ordering::SeqCst) + 1;
                if e.is_timeout() {
                    warn!("Primary LLM provider timed out ({}x): {}", failures, e);
                } else {
                    warn!("Primary LLM provider failed ({}x): {}", failures, e);
                }

                match &self.fallback {
                    Some(fallback) => {
                        self.fallback_generate(
                            fallback.as_ref(),
                            system_prompt,
                            user_prompt,
                            response_format,
                            &e,
                        )
                        .await
                    }
                    None => Err(e),
                }
            }
        }
    }

    fn provider_name(&self) -> &str {
        match &self.fallback {
            Some(fallback) if self.is_using_fallback() => fallback.provider_name(),
            _ => self.primary.provider_name(),
        }
    }

    fn model_name(&self) -> &str {
        match &self.fallback {
            Some(fallback) if self.is_using_fallback() => fallback.model_name(),
            _ => self.primary.model_name(),
        }
    }
}
