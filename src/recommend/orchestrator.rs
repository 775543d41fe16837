use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use strum::{Display, IntoStaticStr};
use thiserror::Error;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use super::filter::{CandidateSet, ConstraintFilter};
use super::models::{Rationale, Recommendation};
use super::preferences::Preferences;
use super::ranker::{RankerError, SimilarityRanker};
use super::synthesizer::RecommendationSynthesizer;
use crate::catalog::CatalogStore;
use crate::core::config::MahalleConfig;
use crate::llm::embeddings::Embedder;
use crate::llm::extractor::{Extraction, ExtractionError, PreferenceExtractor};

pub const UNAVAILABLE_RATIONALE: &str =
    "Preference extraction is currently unavailable, so no filters were applied. Showing the closest matches to your query across all neighborhoods.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PipelineStage {
    Received,
    Extracting,
    ExtractionDegraded,
    Filtering,
    Ranking,
    Synthesizing,
    Completed,
    Failed,
}


#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("query is required")]
    EmptyQuery,

    #[error("ranking unavailable: {0}")]
    RankerUnavailable(#[from] RankerError),
}

impl PipelineError {
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::EmptyQuery => "empty_query",
            PipelineError::RankerUnavailable(_) => "ranker_unavailable",
        }
    }
}

/// Everything a single request produced, including the stages it passed
/// through.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub request_id: Uuid,
    pub query: String,
    pub rationale: Rationale,
    pub preferences: Preferences,
    pub filters_applied: Vec<String>,
    pub total_neighborhoods: usize,
    pub filtered_neighborhoods: usize,
    pub recommendations: Vec<Recommendation>,
    pub message: Option<String>,
    pub stages: Vec<PipelineStage>,
}


struct StageTrace {
    stages: Vec<PipelineStage>,
}

impl StageTrace {
    fn new() -> Self {
        Self {
            stages: vec![PipelineStage::Received],
        }
    }

    fn enter(&mut self, stage: PipelineStage) {
        tracing::debug!("stage -> {}", stage);
        self.stages.push(stage);
    }
}

/// Drives one query through extraction, filtering, ranking and synthesis.
/// Holds no per-request state; a single instance serves concurrent requests.
pub struct Orchestrator {
    catalog: Arc<CatalogStore>,
    extractor: Arc<dyn PreferenceExtractor>,
    filter: ConstraintFilter,
    ranker: SimilarityRanker,
    synthesizer: RecommendationSynthesizer,
    extraction_timeout: Duration,
}

impl Orchestrator {
    pub fn new(
        catalog: Arc<CatalogStore>,
        extractor: Arc<dyn PreferenceExtractor>,
        embedder: Arc<dyn Embedder>,
        config: &MahalleConfig,
    ) -> Self {
        let dimension = catalog.dimension();
        Self {
            catalog,
            extractor,
            filter: ConstraintFilter::new(config.default_apartment_size_sqm, config.currency.clone()),
            ranker: SimilarityRanker::new(embedder, config.top_n, config.embedding_timeout(), dimension),
            synthesizer: RecommendationSynthesizer::new(
                config.default_apartment_size_sqm,
                config.currency.clone(),
            ),
            extraction_timeout: config.extraction_timeout(),
        }
    }

    pub fn catalog(&self) -> &CatalogStore {
        &self.catalog
    }

    pub async fn recommend(&self, query: &str) -> Result<PipelineReport, PipelineError> {
        let request_id = Uuid::new_v4();
        let span = info_span!("recommend", %request_id);
        self.run(request_id, query).instrument(span).await
    }

    async fn run(&self, request_id: Uuid, query: &str) -> Result<PipelineReport, PipelineError> {
        let started = Instant::now();
        let query = query.trim();
        if query.is_empty() {
            return Err(PipelineError::EmptyQuery);
        }
        info!("Query received: {}", crate::safe_truncate_ellipsis(query, 100));

        let mut trace = StageTrace::new();

        trace.enter(PipelineStage::Extracting);
        let (preferences, rationale) = self.extract(query).await;

        let degraded = rationale.is_degraded();
        let (candidates, filters_applied) = if degraded {
            trace.enter(PipelineStage::ExtractionDegraded);
            (CandidateSet::full(&self.catalog), Vec::new())
        } else {
            trace.enter(PipelineStage::Filtering);
            let outcome = self.filter.apply(&self.catalog, &preferences);
            (outcome.candidates, outcome.filters_applied)
        };

        let total_neighborhoods = candidates.total_considered;
        let filtered_neighborhoods = candidates.total_surviving();

        trace.enter(PipelineStage::Ranking);
        let ranking_text = if degraded {
            query
        } else {
            preferences.intent.as_deref().unwrap_or(query)
        };
        let ranked = match self.ranker.rank(ranking_text, &candidates).await {
            Ok(ranked) => ranked,
            Err(e) => {
                trace.enter(PipelineStage::Failed);
                warn!("Ranking failed after stages {:?}: {}", trace.stages, e);
                return Err(e.into());
            }
        };

        trace.enter(PipelineStage::Synthesizing);
        let recommendations = self.synthesizer.synthesize(&ranked, &preferences);

        let message = recommendations.is_empty().then(|| {
            format!(
                "No neighborhoods match all of your criteria (0 of {total_neighborhoods}). Try relaxing your budget or amenity requirements."
            )
        });

        trace.enter(PipelineStage::Completed);
        info!(
            "Completed: {} of {} neighborhoods passed filters, {} recommended, degraded={}, took {:?}",
            filtered_neighborhoods,
            total_neighborhoods,
            recommendations.len(),
            degraded,
            started.elapsed()
        );

        Ok(PipelineReport {
            request_id,
            query: query.to_string(),
            rationale,
            preferences,
            filters_applied,
            total_neighborhoods,
            filtered_neighborhoods,
            recommendations,
            message,
            stages: trace.stages,
        })
    }

    /// Never fails: an unreachable or slow extractor and an empty
    /// extraction both degrade to unfiltered ranking.
    async fn extract(&self, query: &str) -> (Preferences, Rationale) {
        let result = tokio::time::timeout(self.extraction_timeout, self.extractor.extract(query))
            .await
            .unwrap_or(Err(ExtractionError::TimedOut(self.extraction_timeout)));

        match result {
            Ok(extraction) if extraction.is_empty() => {
                info!("No preferences understood; ranking without filters");
                (Preferences::default(), Rationale::NotUnderstood(extraction.rationale))
            }
            Ok(Extraction {
                preferences,
                rationale,
            }) => (preferences, Rationale::Model(rationale)),
            Err(e) => {
                warn!("Preference extraction degraded: {}", e);
                (Preferences::default(), Rationale::Unavailable(UNAVAILABLE_RATIONALE.to_string()))
            }
        }
    }
}
