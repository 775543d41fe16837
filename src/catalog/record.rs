use serde::{Deserialize, Serialize};


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborhoodRecord {
    /// `<district>_<name>` with spaces replaced by underscores.
    pub id: String,
    pub name: String,
    pub district: String,

    /// Environmental quality in [0, 1].
    pub green_index: Option<f64>,
    /// Socioeconomic welfare in [0, 1].
    pub welfare_index: Option<f64>,
    pub population: Option<u64>,
    pub rent_per_sqm: Option<f64>,

    pub restaurants: Option<u32>,
    pub schools: Option<u32>,
    pub parks: Option<u32>,
    pub cafes: Option<u32>,
    /// Bus, train and transit stations combined.
    pub total_stations: Option<u32>,

    /// Earthquake scenario figures.
    pub casualties: Option<u32>,
    pub severely_damaged_buildings: Option<u32>,
    pub heavily_damaged_buildings: Option<u32>,

    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
}

impl NeighborhoodRecord {

    pub fn new(name: impl Into<String>, district: impl Into<String>) -> Self {
        let name = name.into();
        let district = district.into();
        Self {
            id: Self::make_id(&district, &name),
            name,
            district,
            green_index: None,
            welfare_index: None,
            population: None,
            rent_per_sqm: None,
            restaurants: None,
            schools: None,
            parks: None,
            cafes: None,
            total_stations: None,
            casualties: None,
            severely_damaged_buildings: None,
            heavily_damaged_buildings: None,
            description: None,
            embedding: Vec::new(),
        }
    }


    pub fn make_id(district: &str, name: &str) -> String {
        format!("{district}_{name}").replace(' ', "_")
    }

    /// The text a record is embedded from; the query side embeds free text
    /// into the same space.
    pub fn embedding_text(&self) -> String {
        let mut parts = Vec::new();

        if let Some(description) = self.description.as_deref().filter(|d| !d.trim().is_empty()) {
            parts.push(format!("Description: {description}"));
        }
        parts.push(format!("Neighborhood: {} in {} district", self.name, self.district));

        if let Some(rent) = self.rent_per_sqm {
            parts.push(format!("Average rent: {rent} TRY per square meter"));
        }
        if let Some(green) = self.green_index {
            parts.push(format!("Green space index: {green}"));
        }
        if let Some(welfare) = self.welfare_index {
            parts.push(format!("Society welfare index: {welfare}"));
        }

        let amenities: Vec<String> = [
            (self.restaurants, "restaurants"),
            (self.schools, "schools"),
            (self.parks, "parks"),
            (self.cafes, "cafes"),
            (self.total_stations, "stations"),
        ]
        .into_iter()
        .filter_map(|(count, label)| count.filter(|c| *c > 0).map(|c| format!("{c} {label}")))
        .collect();
        if !amenities.is_empty() {
            parts.push(format!("Nearby amenities: {}", amenities.join(", ")));
        }

        if let Some(population) = self.population {
            parts.push(format!("Population: {population} residents"));
        }
        if let (Some(casualties), Some(severe)) = (self.casualties, self.severely_damaged_buildings) {
            parts.push(format!(
                "Earthquake scenario: {casualties} estimated casualties, {severe} severely damaged buildings"
            ));
        }

        parts.join(" | ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_id_replaces_spaces() {
        assert_eq!(
            NeighborhoodRecord::make_id("Kadıköy", "Caferağa Mahallesi"),
            "Kadıköy_Caferağa_Mahallesi"
        );
    }

    #[test]
    fn test_embedding_text_skips_missing_fields() {
        let mut record = NeighborhoodRecord::new("Moda", "Kadıköy");
        record.parks = Some(3);
        record.cafes = Some(0);
        record.green_index = Some(0.8);

        let text = record.embedding_text();
        assert!(text.starts_with("Neighborhood: Moda in Kadıköy district"));
        assert!(text.contains("Green space index: 0.8"));
        assert!(text.contains("Nearby amenities: 3 parks"));
        assert!(!text.contains("cafes"));
        assert!(!text.contains("Population"));
    }
}
