pub mod parse;
pub mod prompt;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use self::parse::parse_answer;
use self::prompt::{build_extraction_prompt, SYSTEM_PROMPT};
use super::providers::base::{LlmProvider, JSON_MODE};
use crate::recommend::preferences::Preferences;

pub const NOT_UNDERSTOOD_RATIONALE: &str =
    "Your preferences could not be determined from the query, so no filters were applied.";

const DEFAULT_REASONING: &str = "Understanding user preferences...";


#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("preference extraction unavailable: {0}")]
    Unavailable(String),

    #[error("preference extraction timed out after {0:?}")]
    TimedOut(Duration),
}

/// Preferences plus the human-readable rationale behind them.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub preferences: Preferences,
    pub rationale: String,
}

impl Extraction {
    pub fn not_understood() -> Self {
        Self {
            preferences: Preferences::default(),
            rationale: NOT_UNDERSTOOD_RATIONALE.to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.preferences.is_empty()
    }
}

/// Turns a free-text query into structured preferences.
///
/// Malformed or unparsable model output is not an error: implementations
/// return empty preferences with [`NOT_UNDERSTOOD_RATIONALE`]. `Err` is
/// reserved for an unreachable backend.
#[async_trait]
pub trait PreferenceExtractor: Send + Sync {
    async fn extract(&self, query: &str) -> Result<Extraction, ExtractionError>;
}


pub struct LlmPreferenceExtractor<P: LlmProvider> {
    provider: P,
}

impl<P: LlmProvider> LlmPreferenceExtractor<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Interprets a raw model answer.
    pub fn interpret(answer: &str) -> Extraction {
        let parsed = parse_answer(answer);

        let Some(raw_preferences) = parsed.preferences else {
            warn!("Model answer had no preferences object: {}", crate::safe_truncate_ellipsis(answer, 120));
            return Extraction::not_understood();
        };

        let preferences = Preferences::from_json(&raw_preferences);
        if preferences.is_empty() {
            debug!("Model answer produced no usable preferences");
            return Extraction::not_understood();
        }

        Extraction {
            preferences,
            rationale: parsed
                .reasoning
                .unwrap_or_else(|| DEFAULT_REASONING.to_string()),
        }
    }
}

#[async_trait]
impl<P: LlmProvider> PreferenceExtractor for LlmPreferenceExtractor<P> {
    async fn extract(&self, query: &str) -> Result<Extraction, ExtractionError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Extraction::not_understood());
        }

        let (answer, metadata) = self
            .provider
            .generate(SYSTEM_PROMPT, &build_extraction_prompt(query), Some(JSON_MODE))
            .await
            .map_err(|e| ExtractionError::Unavailable(e.to_string()))?;

        let extraction = Self::interpret(&answer);
        info!(
            "Extracted {} constraint(s) via {}/{} (fallback={})",
            extraction.preferences.constraint_count(),
            metadata.provider,
            metadata.model,
            metadata.fallback_used
        );
        Ok(extraction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedProvider;

    #[tokio::test]
    async fn test_extracts_json_answer() {
        let extractor = LlmPreferenceExtractor::new(ScriptedProvider::replying(
            "scripted",
            r#"{"reasoning": "Green and affordable.", "preferences": {"monthly_budget": 30000, "min_green_index": 0.7, "min_parks": 2, "intent": "green area"}}"#,
        ));

        let extraction = extractor.extract("green area, 30k budget").await.unwrap();
        assert_eq!(extraction.rationale, "Green and affordable.");
        assert_eq!(extraction.preferences.monthly_budget, Some(30000.0));
        assert_eq!(extraction.preferences.min_parks, Some(2));
        assert_eq!(extraction.preferences.intent.as_deref(), Some("green area"));
    }

    #[tokio::test]
    async fn test_malformed_answer_is_not_understood() {
        let extractor = LlmPreferenceExtractor::new(ScriptedProvider::replying("scripted", "no idea, sorry"));

        let extraction = extractor.extract("asdfgh").await.unwrap();
        assert!(extraction.is_empty());
        assert_eq!(extraction.rationale, NOT_UNDERSTOOD_RATIONALE);
    }

    #[tokio::test]
    async fn test_all_null_answer_is_not_understood() {
        let extractor = LlmPreferenceExtractor::new(ScriptedProvider::replying(
            "scripted",
            r#"{"reasoning": "Nothing stated.", "preferences": {"monthly_budget": null, "min_parks": null}}"#,
        ));

        let extraction = extractor.extract("hello").await.unwrap();
        assert_eq!(extraction, Extraction::not_understood());
    }

    #[tokio::test]
    async fn test_blank_query_skips_provider() {
        let extractor = LlmPreferenceExtractor::new(ScriptedProvider::failing("scripted"));
        let extraction = extractor.extract("   ").await.unwrap();
        assert!(extraction.is_empty());
    }

    #[tokio::test]
    async fn test_provider_failure_is_unavailable() {
        let extractor = LlmPreferenceExtractor::new(ScriptedProvider::failing("scripted"));
        let result = extractor.extract("quiet area").await;
        assert!(matches!(result, Err(ExtractionError::Unavailable(_))));
    }

    #[test]
    fn test_interpret_legacy_layout_defaults_reasoning() {
        let extraction = LlmPreferenceExtractor::<ScriptedProvider>::interpret(
            "PREFERENCES: {\"min_cafes\": 5, \"min_restaurants\": 5}",
        );
        assert_eq!(extraction.preferences.min_cafes, Some(5));
        assert_eq!(extraction.rationale, DEFAULT_REASONING);
    }
}
