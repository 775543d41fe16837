use tracing::debug;

use super::money::Money;
use super::preferences::Preferences;
use crate::catalog::{CatalogStore, NeighborhoodRecord};
use crate::format_thousands;

/// One hard constraint derived from a populated preference field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Constraint {
    Budget { budget: Money, apartment_size_sqm: f64 },
    MinParks(u32),
    MinSchools(u32),
    MinRestaurants(u32),
    MinCafes(u32),
    MinGreenIndex(f64),
    MinWelfareIndex(f64),
    MaxPopulation(u64),
    MinTotalStations(u32),
    MaxCasualties(u32),
    MaxSeverelyDamaged(u32),
    MaxHeavilyDamaged(u32),
}

impl Constraint {
    /// Constraints for every populated field, in a fixed order. Absent
    /// fields contribute nothing.
    pub fn from_preferences(prefs: &Preferences, default_apartment_size_sqm: f64) -> Vec<Constraint> {
        let mut constraints = Vec::new();

        if let Some(budget) = prefs.monthly_budget.and_then(Money::from_major) {
            constraints.push(Constraint::Budget {
                budget,
                apartment_size_sqm: prefs.effective_apartment_size(default_apartment_size_sqm),
            });
        }
        constraints.extend(prefs.min_parks.map(Constraint::MinParks));
        constraints.extend(prefs.min_schools.map(Constraint::MinSchools));
        constraints.extend(prefs.min_restaurants.map(Constraint::MinRestaurants));
        constraints.extend(prefs.min_cafes.map(Constraint::MinCafes));
        constraints.extend(prefs.min_green_index.map(Constraint::MinGreenIndex));
        constraints.extend(prefs.min_welfare_index.map(Constraint::MinWelfareIndex));
        constraints.extend(prefs.max_population.map(Constraint::MaxPopulation));
        constraints.extend(prefs.min_total_stations.map(Constraint::MinTotalStations));
        constraints.extend(prefs.max_casualties.map(Constraint::MaxCasualties));
        constraints.extend(prefs.max_severely_damaged.map(Constraint::MaxSeverelyDamaged));
        constraints.extend(prefs.max_heavily_damaged.map(Constraint::MaxHeavilyDamaged));

        constraints
    }

    /// A record missing the attribute a constraint reads does not satisfy it.
    pub fn matches(&self, record: &NeighborhoodRecord) -> bool {
        fn at_least<T: PartialOrd>(value: Option<T>, min: T) -> bool {
            value.is_some_and(|v| v >= min)
        }
        fn at_most<T: PartialOrd>(value: Option<T>, max: T) -> bool {
            value.is_some_and(|v| v <= max)
        }

        match *self {
            Constraint::Budget {
                budget,
                apartment_size_sqm,
            } => record
                .rent_per_sqm
                .and_then(|rate| Money::rent_for(rate, apartment_size_sqm))
                .is_some_and(|rent| rent <= budget),
            Constraint::MinParks(min) => at_least(record.parks, min),
            Constraint::MinSchools(min) => at_least(record.schools, min),
            Constraint::MinRestaurants(min) => at_least(record.restaurants, min),
            Constraint::MinCafes(min) => at_least(record.cafes, min),
            Constraint::MinGreenIndex(min) => at_least(record.green_index, min),
            Constraint::MinWelfareIndex(min) => at_least(record.welfare_index, min),
            Constraint::MaxPopulation(max) => at_most(record.population, max),
            Constraint::MinTotalStations(min) => at_least(record.total_stations, min),
            Constraint::MaxCasualties(max) => at_most(record.casualties, max),
            Constraint::MaxSeverelyDamaged(max) => at_most(record.severely_damaged_buildings, max),
            Constraint::MaxHeavilyDamaged(max) => at_most(record.heavily_damaged_buildings, max),
        }
    }


    pub fn describe(&self, currency: &str) -> String {
        match *self {
            Constraint::Budget {
                budget,
                apartment_size_sqm,
            } => format!(
                "Budget: ≤{} {currency}/month ({} sqm)",
                budget,
                apartment_size_sqm
            ),
            Constraint::MinParks(min) => format!("Parks: ≥{min}"),
            Constraint::MinSchools(min) => format!("Schools: ≥{min}"),
            Constraint::MinRestaurants(min) => format!("Restaurants: ≥{min}"),
            Constraint::MinCafes(min) => format!("Cafes: ≥{min}"),
            Constraint::MinGreenIndex(min) => format!("Green Index: ≥{min}"),
            Constraint::MinWelfareIndex(min) => format!("Welfare Index: ≥{min}"),
            Constraint::MaxPopulation(max) => {
                format!("Population: ≤{}", format_thousands(max.min(i64::MAX as u64) as i64))
            }
            Constraint::MinTotalStations(min) => {
                format!("Total Stations (bus+train+transit): ≥{min}")
            }
            Constraint::MaxCasualties(max) => format!("Max Casualties (earthquake sim): ≤{max}"),
            Constraint::MaxSeverelyDamaged(max) => format!("Max Severely Damaged Buildings: ≤{max}"),
            Constraint::MaxHeavilyDamaged(max) => format!("Max Heavily Damaged Buildings: ≤{max}"),
        }
    }
}

/// Catalog records that survived filtering, in catalog order.
#[derive(Debug, Clone)]
pub struct CandidateSet<'a> {
    pub records: Vec<&'a NeighborhoodRecord>,
    pub total_considered: usize,
}

impl<'a> CandidateSet<'a> {
    /// Every record in the catalog; the degraded path ranks these.
    pub fn full(catalog: &'a CatalogStore) -> Self {
        Self {
            records: catalog.records().iter().collect(),
            total_considered: catalog.len(),
        }
    }

    pub fn total_surviving(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}


#[derive(Debug, Clone)]
pub struct FilterOutcome<'a> {
    pub candidates: CandidateSet<'a>,
    pub filters_applied: Vec<String>,
}


#[derive(Debug, Clone)]
pub struct ConstraintFilter {
    default_apartment_size_sqm: f64,
    currency: String,
}

impl ConstraintFilter {
    pub fn new(default_apartment_size_sqm: f64, currency: impl Into<String>) -> Self {
        Self {
            default_apartment_size_sqm,
            currency: currency.into(),
        }
    }

    /// Keeps the records satisfying every constraint (logical AND). Adding a
    /// constraint can only shrink the result.
    pub fn apply<'a>(&self, catalog: &'a CatalogStore, prefs: &Preferences) -> FilterOutcome<'a> {
        let constraints = Constraint::from_preferences(prefs, self.default_apartment_size_sqm);

        let records: Vec<&NeighborhoodRecord> = catalog
            .records()
            .iter()
            .filter(|record| constraints.iter().all(|c| c.matches(record)))
            .collect();

        debug!(
            "Filter: {} constraint(s), {} of {} neighborhoods survive",
            constraints.len(),
            records.len(),
            catalog.len()
        );

        FilterOutcome {
            candidates: CandidateSet {
                records,
                total_considered: catalog.len(),
            },
            filters_applied: constraints.iter().map(|c| c.describe(&self.currency)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixture_catalog;

    fn names(outcome: &FilterOutcome<'_>) -> Vec<String> {
        outcome.candidates.records.iter().map(|r| r.name.clone()).collect()
    }

    fn filter() -> ConstraintFilter {
        ConstraintFilter::new(80.0, "TRY")
    }

    #[test]
    fn test_no_constraints_keeps_everything() {
        let catalog = fixture_catalog();
        let outcome = filter().apply(&catalog, &Preferences::default());

        assert_eq!(outcome.candidates.total_surviving(), catalog.len());
        assert_eq!(outcome.candidates.total_considered, catalog.len());
        assert!(outcome.filters_applied.is_empty());
    }

    #[test]
    fn test_budget_uses_default_size() {
        let catalog = fixture_catalog();
        let prefs = Preferences {
            monthly_budget: Some(16_000.0),
            ..Default::default()
        };
        let outcome = filter().apply(&catalog, &prefs);

        // 200 * 80 = 16,000 is exactly on budget; Cumhuriyet has no rent.
        assert_eq!(names(&outcome), vec!["Emirgan", "Bahçeköy", "Fatih"]);
        assert_eq!(outcome.filters_applied, vec!["Budget: ≤16,000 TRY/month (80 sqm)"]);
    }

    #[test]
    fn test_budget_respects_stated_size() {
        let catalog = fixture_catalog();
        let prefs = Preferences {
            monthly_budget: Some(16_000.0),
            apartment_size_sqm: Some(120.0),
            ..Default::default()
        };
        let outcome = filter().apply(&catalog, &prefs);
        assert_eq!(names(&outcome), vec!["Fatih"]);
    }

    #[test]
    fn test_missing_attribute_fails_constraint() {
        let catalog = fixture_catalog();
        let prefs = Preferences {
            min_schools: Some(1),
            ..Default::default()
        };
        let outcome = filter().apply(&catalog, &prefs);
        assert!(!names(&outcome).contains(&"Cumhuriyet".to_string()));
        assert_eq!(outcome.candidates.total_surviving(), catalog.len() - 1);
    }

    #[test]
    fn test_adding_constraints_never_grows_result() {
        let catalog = fixture_catalog();
        let steps = [
            Preferences::default(),
            Preferences {
                min_green_index: Some(0.5),
                ..Default::default()
            },
            Preferences {
                min_green_index: Some(0.5),
                min_parks: Some(3),
                ..Default::default()
            },
            Preferences {
                min_green_index: Some(0.5),
                min_parks: Some(3),
                max_population: Some(10_000),
                ..Default::default()
            },
            Preferences {
                min_green_index: Some(0.5),
                min_parks: Some(3),
                max_population: Some(10_000),
                max_casualties: Some(0),
                ..Default::default()
            },
        ];

        let mut previous: Option<Vec<String>> = None;
        for prefs in &steps {
            let current = names(&filter().apply(&catalog, prefs));
            if let Some(prev) = &previous {
                assert!(current.iter().all(|n| prev.contains(n)), "{current:?} not within {prev:?}");
            }
            previous = Some(current);
        }
        assert_eq!(previous.unwrap(), vec!["Emirgan"]);
    }

    #[test]
    fn test_descriptions() {
        assert_eq!(Constraint::MaxPopulation(20_000).describe("TRY"), "Population: ≤20,000");
        assert_eq!(Constraint::MinGreenIndex(0.7).describe("TRY"), "Green Index: ≥0.7");
        assert_eq!(
            Constraint::MinTotalStations(8).describe("TRY"),
            "Total Stations (bus+train+transit): ≥8"
        );
    }

    #[test]
    fn test_contradictory_constraints_yield_empty_set() {
        let catalog = fixture_catalog();
        let prefs = Preferences {
            monthly_budget: Some(1_000.0),
            min_restaurants: Some(100),
            ..Default::default()
        };
        let outcome = filter().apply(&catalog, &prefs);
        assert!(outcome.candidates.is_empty());
        assert_eq!(outcome.filters_applied.len(), 2);
    }
}
