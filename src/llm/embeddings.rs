use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lru::LruCache;
use parking_lot::Mutex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info};


#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Empty text")]
    EmptyText,

    #[error("Provider not implemented: {0}")]
    NotImplemented(String),

    #[error("Embedding service unavailable: {0}")]
    Unavailable(String),
}

/// Text-to-vector capability shared by catalog indexing and query ranking.
#[async_trait]
pub trait Embedder: Send + Sync {

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;


    fn model_name(&self) -> &str;
}


#[derive(Serialize)]
struct OllamaEmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct OpenAIEmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct OpenAIEmbeddingResponse {
    data: Vec<OpenAIEmbeddingData>,
}

#[derive(Deserialize)]
struct OpenAIEmbeddingData {
    embedding: Vec<f32>,
}


struct EmbeddingCache {
    entries: Mutex<LruCache<String, (Vec<f32>, Instant)>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl EmbeddingCache {
    fn new(capacity: usize, ttl_secs: u64) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl: Duration::from_secs(ttl_secs),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn key(model: &str, text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(model.as_bytes());
        hasher.update(b"\0");
        hasher.update(text.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn get(&self, key: &str) -> Option<Vec<f32>> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some((vector, created)) if created.elapsed() < self.ttl => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(vector.clone())
            }
            _ => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    fn put(&self, key: String, vector: Vec<f32>) {
        self.entries.lock().put(key, (vector, Instant::now()));
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }

    fn clear(&self) {
        self.entries.lock().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}


pub struct EmbeddingGenerator {
    provider: String,
    url: String,
    model: String,
    api_key: Option<String>,
    client: Client,
    cache: EmbeddingCache,
}

impl EmbeddingGenerator {
    /// `provider` is `ollama` (`url` is the Ollama host) or `openai` (`url` is
    /// the API base, e.g. `https://api.openai.com/v1`).
    pub fn new(
        provider: impl Into<String>,
        url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
        cache_size: usize,
        cache_ttl_secs: u64,
    ) -> Result<Self, EmbeddingError> {
        let provider = provider.into().to_lowercase();
        if !matches!(provider.as_str(), "ollama" | "openai") {
            return Err(EmbeddingError::NotImplemented(provider));
        }
        let model = model.into();
        let url = url.into().trim_end_matches('/').to_string();

        info!(
            "EmbeddingGenerator initialized: provider={}, model={}, cache={}",
            provider, model, cache_size
        );

        Ok(Self {
            provider,
            url,
            model,
            api_key,
            client: Client::builder().timeout(timeout).build()?,
            cache: EmbeddingCache::new(cache_size, cache_ttl_secs),
        })
    }


    pub async fn generate(&self, text: &str, use_cache: bool) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyText);
        }

        let key = EmbeddingCache::key(&self.model, text);
        if use_cache {
            if let Some(cached) = self.cache.get(&key) {
                debug!("Cache HIT for: {}...", crate::safe_truncate(text, 50));
                return Ok(cached);
            }
        }

        let embedding = match self.provider.as_str() {
            "ollama" => self.generate_ollama(text).await?,
            "openai" => self.generate_openai(text).await?,
            other => return Err(EmbeddingError::NotImplemented(other.to_string())),
        };

        if embedding.is_empty() {
            return Err(EmbeddingError::InvalidResponse("empty embedding".to_string()));
        }

        if use_cache {
            self.cache.put(key, embedding.clone());
        }
        Ok(embedding)
    }

    async fn generate_ollama(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let request = OllamaEmbeddingRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .client
            .post(format!("{}/api/embeddings", self.url))
            .json(&request)
            .send()
            .await?
            .error_for_status()
            .map_err(EmbeddingError::Http)?
            .json::<OllamaEmbeddingResponse>()
            .await?;

        Ok(response.embedding)
    }

    async fn generate_openai(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| EmbeddingError::InvalidResponse("API key required".to_string()))?;

        let request = OpenAIEmbeddingRequest {
            model: &self.model,
            input: text,
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()
            .map_err(EmbeddingError::Http)?
            .json::<OpenAIEmbeddingResponse>()
            .await?;

        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| EmbeddingError::InvalidResponse("No embedding in response".to_string()))
    }


    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }

    /// (hits, misses) since the last clear.
    pub fn cache_stats(&self) -> (u64, u64) {
        (
            self.cache.hits.load(Ordering::Relaxed),
            self.cache.misses.load(Ordering::Relaxed),
        )
    }


    pub fn clear_cache(&self) {
        self.cache.clear();
        info!("Embedding cache cleared");
    }


    pub fn provider(&self) -> &str {
        &self.provider
    }
}

#[async_trait]
impl Embedder for EmbeddingGenerator {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.generate(text, true).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator(provider: &str) -> Result<EmbeddingGenerator, EmbeddingError> {
        EmbeddingGenerator::new(
            provider,
            "http://localhost:11434/",
            "all-minilm",
            None,
            Duration::from_secs(1),
            4,
            60,
        )
    }

    #[test]
    fn test_unknown_provider_rejected() {
        assert!(matches!(generator("sentencepiece"), Err(EmbeddingError::NotImplemented(_))));
    }

    #[tokio::test]
    async fn test_empty_text_rejected_before_network() {
        let generator = generator("ollama").unwrap();
        let result = generator.generate("   ", true).await;
        assert!(matches!(result, Err(EmbeddingError::EmptyText)));
    }

    #[tokio::test]
    async fn test_openai_requires_key() {
        let generator = generator("openai").unwrap();
        let result = generator.generate("quiet green area", false).await;
        assert!(matches!(result, Err(EmbeddingError::InvalidResponse(_))));
    }

    #[test]
    fn test_cache_lru_and_stats() {
        let cache = EmbeddingCache::new(2, 60);
        let a = EmbeddingCache::key("m", "a");
        let b = EmbeddingCache::key("m", "b");
        let c = EmbeddingCache::key("m", "c");

        cache.put(a.clone(), vec![1.0]);
        cache.put(b.clone(), vec![2.0]);
        assert_eq!(cache.get(&a), Some(vec![1.0]));
        cache.put(c.clone(), vec![3.0]);

        assert_eq!(cache.get(&b), None);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.hits.load(Ordering::Relaxed), 1);
        assert_eq!(cache.misses.load(Ordering::Relaxed), 1);
        assert_ne!(EmbeddingCache::key("m1", "a"), EmbeddingCache::key("m2", "a"));
    }

    #[test]
    fn test_cache_expires_entries() {
        let cache = EmbeddingCache::new(2, 0);
        let key = EmbeddingCache::key("m", "a");
        cache.put(key.clone(), vec![1.0]);
        assert_eq!(cache.get(&key), None);
    }
}
