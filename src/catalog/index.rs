use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use super::record::NeighborhoodRecord;
use super::CatalogError;
use crate::llm::embeddings::Embedder;

const DEFAULT_BUILD_CONCURRENCY: usize = 8;

/// Precomputed record embeddings, persisted next to the catalog file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingIndex {
    pub model: String,
    pub dimension: usize,
    pub fingerprint: String,
    pub built_at: DateTime<Utc>,
    pub vectors: HashMap<String, Vec<f32>>,
}

impl EmbeddingIndex {

    pub fn fingerprint(records: &[NeighborhoodRecord]) -> String {
        let mut hasher = Sha256::new();
        for record in records {
            hasher.update(record.id.as_bytes());
            hasher.update(b"\n");
            hasher.update(record.embedding_text().as_bytes());
            hasher.update(b"\n");
        }
        format!("{:x}", hasher.finalize())
    }


    pub async fn build(
        records: &[NeighborhoodRecord],
        embedder: &dyn Embedder,
    ) -> Result<Self, CatalogError> {
        Self::build_with_concurrency(records, embedder, DEFAULT_BUILD_CONCURRENCY).await
    }

    /// Records whose embedding fails are left out of the index; the store
    /// excludes them at assembly.
    pub async fn build_with_concurrency(
        records: &[NeighborhoodRecord],
        embedder: &dyn Embedder,
        concurrency: usize,
    ) -> Result<Self, CatalogError> {
        info!(
            "Building embedding index for {} records (model={})",
            records.len(),
            embedder.model_name()
        );

        let results: Vec<(String, Result<Vec<f32>, _>)> = stream::iter(records)
            .map(|record| async move {
                let text = record.embedding_text();
                (record.id.clone(), embedder.embed(&text).await)
            })
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await;

        let mut vectors = HashMap::with_capacity(results.len());
        let mut failures = 0usize;
        for (id, result) in results {
            match result {
                Ok(vector) => {
                    vectors.insert(id, vector);
                }
                Err(e) => {
                    failures += 1;
                    warn!("Failed to embed record {}: {}", id, e);
                }
            }
        }

        if vectors.is_empty() && !records.is_empty() {
            return Err(CatalogError::Index(format!(
                "no record could be embedded ({failures} failures)"
            )));
        }

        let dimension = dominant_dimension(vectors.values().map(Vec::len));
        info!(
            "Embedding index built: {} vectors, dim={}, failures={}",
            vectors.len(),
            dimension,
            failures
        );

        Ok(Self {
            model: embedder.model_name().to_string(),
            dimension,
            fingerprint: Self::fingerprint(records),
            built_at: Utc::now(),
            vectors,
        })
    }


    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&raw)?)
    }


    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), CatalogError> {
        let path = path.as_ref();
        std::fs::write(path, serde_json::to_vec(self)?)?;
        info!("Embedding index written to {}", path.display());
        Ok(())
    }


    pub fn is_current(&self, model: &str, records: &[NeighborhoodRecord]) -> bool {
        self.model == model && self.fingerprint == Self::fingerprint(records)
    }

    /// Reuses the index at `path` when it matches the catalog and model,
    /// otherwise rebuilds and rewrites it.
    pub async fn load_or_build(
        path: impl AsRef<Path>,
        records: &[NeighborhoodRecord],
        embedder: &dyn Embedder,
    ) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        if path.exists() {
            match Self::load(path) {
                Ok(index) if index.is_current(embedder.model_name(), records) => {
                    info!("Using embedding index {} ({} vectors)", path.display(), index.vectors.len());
                    return Ok(index);
                }
                Ok(_) => info!("Embedding index {} is stale, rebuilding", path.display()),
                Err(e) => warn!("Unreadable embedding index {}: {}, rebuilding", path.display(), e),
            }
        }

        let index = Self::build(records, embedder).await?;
        index.save(path)?;
        Ok(index)
    }


    pub fn get(&self, id: &str) -> Option<&[f32]> {
        self.vectors.get(id).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

/// Most common non-zero vector length; ties go to the smaller dimension.
pub(crate) fn dominant_dimension(lengths: impl Iterator<Item = usize>) -> usize {
    let mut counts: HashMap<usize, usize> = HashMap::new();
    for len in lengths.filter(|len| *len > 0) {
        *counts.entry(len).or_default() += 1;
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
        .map(|(dim, _)| dim)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixture_records, FailingEmbedder, KeywordEmbedder};

    #[tokio::test]
    async fn test_build_embeds_every_record() {
        let records = fixture_records();
        let embedder = KeywordEmbedder::default();

        let index = EmbeddingIndex::build(&records, &embedder).await.unwrap();

        assert_eq!(index.len(), records.len());
        assert_eq!(index.dimension, KeywordEmbedder::DIMENSION);
        assert_eq!(index.model, "keyword-test");
        assert!(index.is_current("keyword-test", &records));
        assert!(!index.is_current("other-model", &records));
    }

    #[tokio::test]
    async fn test_build_fails_when_nothing_embeds() {
        let records = fixture_records();
        let result = EmbeddingIndex::build(&records, &FailingEmbedder).await;
        assert!(matches!(result, Err(CatalogError::Index(_))));
    }

    #[tokio::test]
    async fn test_save_load_and_staleness() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        let mut records = fixture_records();
        let embedder = KeywordEmbedder::default();

        let built = EmbeddingIndex::load_or_build(&path, &records, &embedder).await.unwrap();
        let loaded = EmbeddingIndex::load(&path).unwrap();
        assert_eq!(loaded.fingerprint, built.fingerprint);
        assert_eq!(loaded.get(&records[0].id), built.get(&records[0].id));

        records[0].description = Some("changed description".to_string());
        assert!(!loaded.is_current("keyword-test", &records));
        let rebuilt = EmbeddingIndex::load_or_build(&path, &records, &embedder).await.unwrap();
        assert_ne!(rebuilt.fingerprint, built.fingerprint);
    }

    #[test]
    fn test_fingerprint_is_order_sensitive_and_stable() {
        let records = fixture_records();
        let mut reversed = records.clone();
        reversed.reverse();

        assert_eq!(EmbeddingIndex::fingerprint(&records), EmbeddingIndex::fingerprint(&records));
        assert_ne!(EmbeddingIndex::fingerprint(&records), EmbeddingIndex::fingerprint(&reversed));
    }
}
