use super::models::{Amenities, EarthquakeScenario, FinancialSummary, NeighborhoodDetails, Recommendation};
use super::money::Money;
use super::preferences::Preferences;
use super::ranker::RankedCandidate;
use crate::catalog::NeighborhoodRecord;
use crate::format_thousands;

const WELL_UNDER_BUDGET_MARGIN: Money = Money::from_minor(500_000);


pub struct RecommendationSynthesizer {
    default_apartment_size_sqm: f64,
    currency: String,
}

impl RecommendationSynthesizer {
    pub fn new(default_apartment_size_sqm: f64, currency: impl Into<String>) -> Self {
        Self {
            default_apartment_size_sqm,
            currency: currency.into(),
        }
    }

    /// Ranks are 1..N in the order given; the ranker's ordering is kept.
    pub fn synthesize(&self, ranked: &[RankedCandidate<'_>], prefs: &Preferences) -> Vec<Recommendation> {
        ranked
            .iter()
            .enumerate()
            .map(|(i, candidate)| {
                let financial = self.financial_summary(candidate.record, prefs);
                let mut match_reasons = self.match_reasons(candidate.record, prefs, financial.as_ref());
                if match_reasons.is_empty() {
                    match_reasons.push(format!(
                        "Closest match to your description ({}% similarity)",
                        candidate.score
                    ));
                }

                Recommendation {
                    rank: i + 1,
                    neighborhood: candidate.record.name.clone(),
                    district: candidate.record.district.clone(),
                    similarity_score: candidate.score,
                    match_reasons,
                    details: details(candidate.record),
                    financial,
                }
            })
            .collect()
    }

    /// Budget known and rent known: rent for the stated size (or the
    /// default) and what is left of the budget.
    pub fn financial_summary(&self, record: &NeighborhoodRecord, prefs: &Preferences) -> Option<FinancialSummary> {
        let budget = prefs.monthly_budget.and_then(Money::from_major)?;
        let size = prefs.effective_apartment_size(self.default_apartment_size_sqm);
        let monthly_rent = Money::rent_for(record.rent_per_sqm?, size)?;
        let budget_remaining = budget - monthly_rent;

        Some(FinancialSummary {
            monthly_rent,
            budget_remaining,
            over_budget: budget_remaining.is_negative(),
            apartment_size_sqm: size,
            currency: self.currency.clone(),
        })
    }

    /// One reason per stated preference the record satisfies. Unstated
    /// dimensions never produce a reason.
    pub fn match_reasons(
        &self,
        record: &NeighborhoodRecord,
        prefs: &Preferences,
        financial: Option<&FinancialSummary>,
    ) -> Vec<String> {
        let mut reasons = Vec::new();

        if let Some(financial) = financial.filter(|f| !f.over_budget) {
            let remaining = financial.budget_remaining;
            if remaining > WELL_UNDER_BUDGET_MARGIN {
                reasons.push(format!("Well under budget (saves {} {})", remaining, self.currency));
            } else if remaining > Money::ZERO {
                reasons.push(format!("Within budget (saves {} {})", remaining, self.currency));
            } else {
                reasons.push("Exactly on budget".to_string());
            }
        }

        if let (Some(min), Some(green)) = (prefs.min_green_index, record.green_index) {
            if green >= min {
                reasons.push(format!("Meets green space requirement ({green:.2})"));
            }
        }
        if let (Some(min), Some(welfare)) = (prefs.min_welfare_index, record.welfare_index) {
            if welfare >= min {
                reasons.push(format!("Meets welfare requirement ({welfare:.2})"));
            }
        }

        let counts = [
            (prefs.min_schools, record.schools, "schools"),
            (prefs.min_parks, record.parks, "parks"),
            (prefs.min_restaurants, record.restaurants, "restaurants"),
            (prefs.min_cafes, record.cafes, "cafes"),
        ];
        for (min, actual, label) in counts {
            if let (Some(min), Some(actual)) = (min, actual) {
                if actual >= min {
                    reasons.push(format!("Has {actual} {label} (≥{min} requested)"));
                }
            }
        }

        if let (Some(min), Some(stations)) = (prefs.min_total_stations, record.total_stations) {
            if stations >= min {
                reasons.push(format!("Good public transport ({stations} stations)"));
            }
        }

        if let (Some(max), Some(population)) = (prefs.max_population, record.population) {
            if population <= max {
                reasons.push(format!(
                    "Quiet area (population {})",
                    format_thousands(population.min(i64::MAX as u64) as i64)
                ));
            }
        }

        if let (Some(max), Some(casualties)) = (prefs.max_casualties, record.casualties) {
            if casualties <= max {
                let band = match casualties {
                    0 => "Excellent",
                    1..=5 => "Good",
                    6..=10 => "Moderate",
                    _ => "Acceptable",
                };
                reasons.push(format!(
                    "{band} earthquake safety ({casualties} expected casualties)"
                ));
            }
        }
        if let (Some(max), Some(severe)) = (prefs.max_severely_damaged, record.severely_damaged_buildings) {
            if severe <= max {
                reasons.push(format!("Limited severe earthquake damage ({severe} buildings)"));
            }
        }
        if let (Some(max), Some(heavy)) = (prefs.max_heavily_damaged, record.heavily_damaged_buildings) {
            if heavy <= max {
                reasons.push(format!("Limited heavy earthquake damage ({heavy} buildings)"));
            }
        }

        reasons
    }
}

fn details(record: &NeighborhoodRecord) -> NeighborhoodDetails {
    NeighborhoodDetails {
        green_index: record.green_index.map(round2),
        welfare_index: record.welfare_index.map(round2),
        population: record.population,
        rent_per_sqm: record.rent_per_sqm,
        amenities: Amenities {
            restaurants: record.restaurants,
            schools: record.schools,
            parks: record.parks,
            cafes: record.cafes,
            total_stations: record.total_stations,
        },
        earthquake: EarthquakeScenario {
            casualties: record.casualties,
            severely_damaged_buildings: record.severely_damaged_buildings,
            heavily_damaged_buildings: record.heavily_damaged_buildings,
        },
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
