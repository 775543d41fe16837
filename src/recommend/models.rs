use serde::Serialize;

use super::money::Money;
use super::orchestrator::{PipelineReport, PipelineStage};
use super::preferences::Preferences;

/// Where a response's rationale came from. Degraded sources tell the
/// caller that no preference filtering took place.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source", content = "text", rename_all = "snake_case")]
pub enum Rationale {
    Model(String),
    NotUnderstood(String),
    Unavailable(String),
}

impl Rationale {
    pub fn text(&self) -> &str {
        match self {
            Rationale::Model(text) | Rationale::NotUnderstood(text) | Rationale::Unavailable(text) => text,
        }
    }

    pub fn is_degraded(&self) -> bool {
        !matches!(self, Rationale::Model(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Amenities {
    pub restaurants: Option<u32>,
    pub schools: Option<u32>,
    pub parks: Option<u32>,
    pub cafes: Option<u32>,
    pub total_stations: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EarthquakeScenario {
    pub casualties: Option<u32>,
    pub severely_damaged_buildings: Option<u32>,
    pub heavily_damaged_buildings: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NeighborhoodDetails {
    pub green_index: Option<f64>,
    pub welfare_index: Option<f64>,
    pub population: Option<u64>,
    pub rent_per_sqm: Option<f64>,
    pub amenities: Amenities,
    pub earthquake: EarthquakeScenario,
}

/// Present only when the user stated a budget.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinancialSummary {
    pub monthly_rent: Money,
    /// `budget - monthly_rent`, exact in minor units.
    pub budget_remaining: Money,
    pub over_budget: bool,
    pub apartment_size_sqm: f64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub rank: usize,
    pub neighborhood: String,
    pub district: String,
    pub similarity_score: f64,
    pub match_reasons: Vec<String>,
    pub details: NeighborhoodDetails,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub financial: Option<FinancialSummary>,
}


#[derive(Debug, Clone, Serialize)]
pub struct RecommendationResponse {
    pub status: ResponseStatus,
    pub query: String,
    pub reasoning: Rationale,
    pub preferences: Preferences,
    pub filters_applied: Vec<String>,
    pub total_neighborhoods: usize,
    pub filtered_neighborhoods: usize,
    pub recommendations: Vec<Recommendation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub stages: Vec<PipelineStage>,
}

impl From<PipelineReport> for RecommendationResponse {
    fn from(report: PipelineReport) -> Self {
        Self {
            status: ResponseStatus::Success,
            query: report.query,
            reasoning: report.rationale,
            preferences: report.preferences,
            filters_applied: report.filters_applied,
            total_neighborhoods: report.total_neighborhoods,
            filtered_neighborhoods: report.filtered_neighborhoods,
            recommendations: report.recommendations,
            message: report.message,
            stages: report.stages,
        }
    }
}


#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub status: ResponseStatus,
    pub error: String,
    pub kind: &'static str,
}

impl ErrorResponse {
    pub fn new(kind: &'static str, error: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            error: error.into(),
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rationale_serialization() {
        let value = serde_json::to_value(Rationale::NotUnderstood("n/a".to_string())).unwrap();
        assert_eq!(value, json!({"source": "not_understood", "text": "n/a"}));
        assert!(Rationale::Unavailable(String::new()).is_degraded());
        assert!(!Rationale::Model("ok".to_string()).is_degraded());
    }

    #[test]
    fn test_error_response_shape() {
        let value = serde_json::to_value(ErrorResponse::new("empty_query", "Query is required")).unwrap();
        assert_eq!(
            value,
            json!({"status": "error", "error": "Query is required", "kind": "empty_query"})
        );
    }
}
