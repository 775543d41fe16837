use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use super::filter::CandidateSet;
use crate::catalog::NeighborhoodRecord;
use crate::llm::embeddings::Embedder;


#[derive(Error, Debug)]
pub enum RankerError {
    #[error("embedding service unavailable: {0}")]
    Unavailable(String),

    #[error("embedding timed out after {0:?}")]
    TimedOut(Duration),

    #[error("query embedding has dimension {query}, catalog uses {catalog}")]
    DimensionMismatch { query: usize, catalog: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedCandidate<'a> {
    pub record: &'a NeighborhoodRecord,
    /// Raw cosine similarity. Ordering uses this, never the rounded score.
    pub similarity: f64,
    /// Display score in [0, 100], one decimal.
    pub score: f64,
}

impl<'a> RankedCandidate<'a> {
    pub fn new(record: &'a NeighborhoodRecord, similarity: f64) -> Self {
        Self {
            record,
            similarity,
            score: display_score(similarity),
        }
    }
}


pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let (mut dot, mut mag_a, mut mag_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        mag_a += x * x;
        mag_b += y * y;
    }
    let denom = mag_a.sqrt() * mag_b.sqrt();
    if denom < f64::EPSILON {
        0.0
    } else {
        (dot / denom).clamp(-1.0, 1.0)
    }
}

/// Maps a similarity to the [0, 100] display scale, rounded to 0.1.
/// Negative similarity shows as 0.
pub fn display_score(similarity: f64) -> f64 {
    if !similarity.is_finite() {
        return 0.0;
    }
    (similarity.clamp(0.0, 1.0) * 1000.0).round() / 10.0
}

/// Orders candidates by similarity, best first. Exactly equal similarity
/// falls back to higher welfare, then name, then district, so output never
/// depends on catalog order.
pub fn order_candidates<'a>(
    query_vector: &[f32],
    candidates: &CandidateSet<'a>,
    top_n: usize,
) -> Vec<RankedCandidate<'a>> {
    let mut ranked: Vec<RankedCandidate<'a>> = candidates
        .records
        .iter()
        .map(|record| RankedCandidate::new(record, cosine_similarity(query_vector, &record.embedding)))
        .collect();

    ranked.sort_by(|a, b| {
        b.similarity
            .total_cmp(&a.similarity)
            .then_with(|| welfare_desc(a.record, b.record))
            .then_with(|| a.record.name.cmp(&b.record.name))
            .then_with(|| a.record.district.cmp(&b.record.district))
    });
    ranked.truncate(top_n);
    ranked
}

fn welfare_desc(a: &NeighborhoodRecord, b: &NeighborhoodRecord) -> Ordering {
    let key = |r: &NeighborhoodRecord| r.welfare_index.unwrap_or(f64::NEG_INFINITY);
    key(b).total_cmp(&key(a))
}


pub struct SimilarityRanker {
    embedder: Arc<dyn Embedder>,
    top_n: usize,
    timeout: Duration,
    dimension: usize,
}

impl SimilarityRanker {
    /// `dimension` is the catalog's embedding dimension.
    pub fn new(embedder: Arc<dyn Embedder>, top_n: usize, timeout: Duration, dimension: usize) -> Self {
        Self {
            embedder,
            top_n: top_n.max(1),
            timeout,
            dimension,
        }
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }

    /// Embeds `text` and returns the best `top_n` candidates. An empty
    /// candidate set short-circuits without calling the embedder.
    pub async fn rank<'a>(
        &self,
        text: &str,
        candidates: &CandidateSet<'a>,
    ) -> Result<Vec<RankedCandidate<'a>>, RankerError> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = tokio::time::timeout(self.timeout, self.embedder.embed(text))
            .await
            .map_err(|_| RankerError::TimedOut(self.timeout))?
            .map_err(|e| RankerError::Unavailable(e.to_string()))?;

        if query_vector.len() != self.dimension {
            return Err(RankerError::DimensionMismatch {
                query: query_vector.len(),
                catalog: self.dimension,
            });
        }

        let ranked = order_candidates(&query_vector, candidates, self.top_n);
        debug!(
            "Ranked {} candidate(s), returning {} (model={})",
            candidates.total_surviving(),
            ranked.len(),
            self.embedder.model_name()
        );
        Ok(ranked)
    }
}
