use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const MAX_APARTMENT_SIZE_SQM: f64 = 10_000.0;

lazy_static! {
    // "30.000" / "1.250.000": dots as thousands separators.
    static ref DOTTED_THOUSANDS: Regex = Regex::new(r"^\d{1,3}(\.\d{3})+$").expect("valid regex");
}

/// Structured housing preferences. Every field is independently optional;
/// `None` means "no constraint on this dimension", never zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_budget: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apartment_size_sqm: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_schools: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_parks: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_restaurants: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_cafes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_total_stations: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_green_index: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_welfare_index: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_population: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_casualties: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_severely_damaged: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_heavily_damaged: Option<u32>,

    /// Free-text semantic intent used for ranking.
    #[serde(default, alias = "preferences_text", skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
}

impl Preferences {
    /// Builds preferences from a loosely-typed model answer. Values that are
    /// missing, unparsable, negative or out of range are left absent.
    pub fn from_json(value: &Value) -> Self {
        let field = |name: &str| value.get(name).and_then(lenient_number);

        Self {
            monthly_budget: field("monthly_budget").filter(|v| *v > 0.0),
            apartment_size_sqm: field("apartment_size_sqm")
                .filter(|v| *v > 0.0 && *v <= MAX_APARTMENT_SIZE_SQM),

            min_schools: field("min_schools").and_then(positive_count),
            min_parks: field("min_parks").and_then(positive_count),
            min_restaurants: field("min_restaurants").and_then(positive_count),
            min_cafes: field("min_cafes").and_then(positive_count),
            min_total_stations: field("min_total_stations").and_then(positive_count),

            min_green_index: field("min_green_index").filter(|v| (0.0..=1.0).contains(v)),
            min_welfare_index: field("min_welfare_index").filter(|v| (0.0..=1.0).contains(v)),

            max_population: field("max_population")
                .filter(|v| *v >= 1.0)
                .map(|v| v.round().min(u64::MAX as f64) as u64),
            max_casualties: field("max_casualties").and_then(count),
            max_severely_damaged: field("max_severely_damaged").and_then(count),
            max_heavily_damaged: field("max_heavily_damaged").and_then(count),

            intent: value
                .get("intent")
                .or_else(|| value.get("preferences_text"))
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        }
    }

    /// True when at least one hard constraint is populated.
    pub fn has_constraints(&self) -> bool {
        self.constraint_count() > 0
    }


    pub fn constraint_count(&self) -> usize {
        [
            self.monthly_budget.is_some(),
            self.min_schools.is_some(),
            self.min_parks.is_some(),
            self.min_restaurants.is_some(),
            self.min_cafes.is_some(),
            self.min_total_stations.is_some(),
            self.min_green_index.is_some(),
            self.min_welfare_index.is_some(),
            self.max_population.is_some(),
            self.max_casualties.is_some(),
            self.max_severely_damaged.is_some(),
            self.max_heavily_damaged.is_some(),
        ]
        .into_iter()
        .filter(|set| *set)
        .count()
    }

    /// Nothing actionable: no constraint and no intent. A lone
    /// `apartment_size_sqm` constrains nothing.
    pub fn is_empty(&self) -> bool {
        !self.has_constraints() && self.intent.is_none()
    }

    pub fn effective_apartment_size(&self, default_sqm: f64) -> f64 {
        self.apartment_size_sqm.unwrap_or(default_sqm)
    }
}

fn lenient_number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned: String = s
                .trim()
                .chars()
                .filter(|c| !matches!(c, ',' | '_' | ' ' | '\u{a0}'))
                .collect();
            let cleaned = if DOTTED_THOUSANDS.is_match(&cleaned) {
                cleaned.replace('.', "")
            } else {
                cleaned
            };
            cleaned.parse::<f64>().ok()
        }
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn count(value: f64) -> Option<u32> {
    (value >= 0.0).then(|| value.round().min(u32::MAX as f64) as u32)
}

/// A minimum of zero constrains nothing.
fn positive_count(value: f64) -> Option<u32> {
    count(value).filter(|c| *c > 0)
}
