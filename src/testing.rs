//! Deterministic doubles and fixtures shared by unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::catalog::{CatalogStore, NeighborhoodRecord};
use crate::llm::embeddings::{Embedder, EmbeddingError};
use crate::llm::extractor::{Extraction, ExtractionError, PreferenceExtractor};
use crate::llm::providers::base::{LlmMetadata, LlmProvider, LlmProviderError};
use crate::recommend::preferences::Preferences;

const KEYWORD_BUCKETS: [&[&str]; 8] = [
    &["green", "park", "nature", "tree", "forest"],
    &["quiet", "calm", "peaceful"],
    &["family", "school", "children", "kids"],
    &["vibrant", "lively", "nightlife", "cafe", "restaurant"],
    &["metro", "transit", "station", "commute"],
    &["sea", "coast", "bosphorus", "promenade"],
    &["affordable", "cheap"],
    &["dense", "crowded", "busy"],
];

/// Bag-of-keywords embedder: one dimension per keyword bucket.
#[derive(Default)]
pub struct KeywordEmbedder {
    calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub const DIMENSION: usize = KEYWORD_BUCKETS.len();

    pub fn vector(text: &str) -> Vec<f32> {
        let text = text.to_lowercase();
        KEYWORD_BUCKETS
            .iter()
            .map(|bucket| bucket.iter().map(|kw| text.matches(kw).count()).sum::<usize>() as f32)
            .collect()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyText);
        }
        Ok(Self::vector(text))
    }

    fn model_name(&self) -> &str {
        "keyword-test"
    }
}


pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Err(EmbeddingError::Unavailable("connection refused".to_string()))
    }

    fn model_name(&self) -> &str {
        "failing-test"
    }
}

/// Answers after `delay`; used to trip timeouts.
pub struct StallingEmbedder(pub Duration);

#[async_trait]
impl Embedder for StallingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        tokio::time::sleep(self.0).await;
        Ok(KeywordEmbedder::vector(text))
    }

    fn model_name(&self) -> &str {
        "keyword-test"
    }
}


pub enum ScriptedExtractor {
    Returns(Extraction),
    Fails,
    Stalls(Duration),
}

impl ScriptedExtractor {
    pub fn returning(preferences: Preferences, rationale: &str) -> Self {
        Self::Returns(Extraction {
            preferences,
            rationale: rationale.to_string(),
        })
    }
}

#[async_trait]
impl PreferenceExtractor for ScriptedExtractor {
    async fn extract(&self, _query: &str) -> Result<Extraction, ExtractionError> {
        match self {
            Self::Returns(extraction) => Ok(extraction.clone()),
            Self::Fails => Err(ExtractionError::Unavailable("connection refused".to_string())),
            Self::Stalls(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(Extraction::not_understood())
            }
        }
    }
}


pub struct ScriptedProvider {
    name: String,
    reply: Option<String>,
    delay: Duration,
}

impl ScriptedProvider {
    pub fn replying(name: &str, content: &str) -> Self {
        Self {
            name: name.to_string(),
            reply: Some(content.to_string()),
            delay: Duration::ZERO,
        }
    }

    pub fn failing(name: &str) -> Self {
        Self {
            name: name.to_string(),
            reply: None,
            delay: Duration::ZERO,
        }
    }

    /// Answers (or fails) only after `delay`, like a slow HTTP backend.
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn generate(
        &self,
        _system_prompt: &str,
        _user_prompt: &str,
        _response_format: Option<&str>,
    ) -> Result<(String, LlmMetadata), LlmProviderError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.reply {
            Some(content) => Ok((content.clone(), LlmMetadata::new(&self.name, "scripted"))),
            None => Err(LlmProviderError::provider(&self.name, "service is down")),
        }
    }

    fn provider_name(&self) -> &str {
        &self.name
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

#[allow(clippy::too_many_arguments)]
pub fn record(
    name: &str,
    district: &str,
    green: f64,
    welfare: f64,
    population: u64,
    rent_per_sqm: f64,
    amenities: [u32; 5],
    casualties: u32,
    description: &str,
) -> NeighborhoodRecord {
    let [restaurants, schools, parks, cafes, stations] = amenities;
    let mut record = NeighborhoodRecord::new(name, district);
    record.green_index = Some(green);
    record.welfare_index = Some(welfare);
    record.population = Some(population);
    record.rent_per_sqm = Some(rent_per_sqm);
    record.restaurants = Some(restaurants);
    record.schools = Some(schools);
    record.parks = Some(parks);
    record.cafes = Some(cafes);
    record.total_stations = Some(stations);
    record.casualties = Some(casualties);
    record.severely_damaged_buildings = Some(casualties * 10);
    record.heavily_damaged_buildings = Some(casualties * 20);
    record.description = Some(description.to_string());
    record
}

/// Six neighborhoods across three districts, without embeddings.
/// `Emirgan` (rent 200/sqm, green 0.8, 3 parks) fits a 30,000 TRY budget
/// for the default 80 sqm.
pub fn fixture_records() -> Vec<NeighborhoodRecord> {
    let mut sparse = NeighborhoodRecord::new("Cumhuriyet", "Esenyurt");
    sparse.welfare_index = Some(0.35);
    sparse.population = Some(45_000);
    sparse.description = Some("Affordable family neighborhood near the metro station".to_string());

    vec![
        record(
            "Moda", "Kadıköy", 0.55, 0.85, 32_000, 450.0, [40, 3, 2, 35, 10], 4,
            "Lively seaside neighborhood full of cafes, restaurants and nightlife",
        ),
        record(
            "Caddebostan", "Kadıköy", 0.75, 0.90, 25_000, 400.0, [20, 5, 4, 15, 6], 2,
            "Family friendly seaside promenade with good schools",
        ),
        record(
            "Emirgan", "Sarıyer", 0.80, 0.80, 9_000, 200.0, [6, 2, 3, 4, 2], 0,
            "Quiet green area with a large park, trees and nature by the Bosphorus",
        ),
        record(
            "Bahçeköy", "Sarıyer", 0.85, 0.55, 12_000, 150.0, [2, 1, 3, 1, 1], 1,
            "Calm green village next to the forest, affordable and peaceful",
        ),
        record(
            "Fatih", "Esenyurt", 0.20, 0.30, 60_000, 120.0, [15, 6, 1, 8, 12], 12,
            "Dense affordable area with metro access and many schools",
        ),
        sparse,
    ]
}

/// Gives every record its keyword embedding.
pub fn embedded(records: Vec<NeighborhoodRecord>) -> Vec<NeighborhoodRecord> {
    records
        .into_iter()
        .map(|mut record| {
            record.embedding = KeywordEmbedder::vector(&record.embedding_text());
            record
        })
        .collect()
}


pub fn catalog_of(records: Vec<NeighborhoodRecord>) -> CatalogStore {
    CatalogStore::from_records(embedded(records)).expect("fixture catalog")
}


pub fn fixture_catalog() -> CatalogStore {
    catalog_of(fixture_records())
}
