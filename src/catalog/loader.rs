use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info, warn};

use super::record::NeighborhoodRecord;
use super::CatalogError;


#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "Mahalle", default)]
    name: Option<String>,
    #[serde(rename = "İlçe", default)]
    district: Option<String>,

    #[serde(rename = "Green_Index", default)]
    green_index: Option<f64>,
    #[serde(rename = "Society_Welfare_Index", default)]
    welfare_index: Option<f64>,
    #[serde(rename = "Avg_Rent_Per_SqM", default)]
    rent_per_sqm: Option<f64>,
    #[serde(rename = "Nüfus", default)]
    population: Option<f64>,

    #[serde(default)]
    restaurant: Option<f64>,
    #[serde(default)]
    school: Option<f64>,
    #[serde(default)]
    park: Option<f64>,
    #[serde(default)]
    cafe: Option<f64>,
    #[serde(default)]
    bus_station: Option<f64>,
    #[serde(default)]
    train_station: Option<f64>,
    #[serde(default)]
    transit_station: Option<f64>,

    #[serde(rename = "can_kaybi_sayisi", default)]
    casualties: Option<f64>,
    #[serde(rename = "cok_agir_hasarli_bina_sayisi", default)]
    severely_damaged: Option<f64>,
    #[serde(rename = "agir_hasarli_bina_sayisi", default)]
    heavily_damaged: Option<f64>,

    #[serde(rename = "Description", default)]
    description: Option<String>,
}


#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    /// 1-based data row number (header excluded).
    pub row: usize,
    pub reason: String,
}


#[derive(Debug, Default)]
pub struct LoadReport {
    pub records: Vec<NeighborhoodRecord>,
    pub skipped: Vec<SkippedRow>,
}

impl LoadReport {
    pub fn total_rows(&self) -> usize {
        self.records.len() + self.skipped.len()
    }
}


pub fn load_catalog(path: impl AsRef<Path>) -> Result<LoadReport, CatalogError> {
    let path = path.as_ref();
    info!("Loading neighborhood catalog from {}", path.display());
    let file = std::fs::File::open(path)?;
    load_catalog_from_reader(file)
}

/// Rows that fail shape validation are excluded and reported, never
/// returned as records. Blank numeric cells read as absent; unparsable
/// ones reject the row.
pub fn load_catalog_from_reader<R: Read>(reader: R) -> Result<LoadReport, CatalogError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut report = LoadReport::default();

    for (idx, row) in csv_reader.deserialize::<CsvRow>().enumerate() {
        let row_number = idx + 1;
        let outcome = row
            .map_err(|e| e.to_string())
            .and_then(validate_row);

        match outcome {
            Ok(record) => report.records.push(record),
            Err(reason) => {
                debug!("Skipping catalog row {}: {}", row_number, reason);
                report.skipped.push(SkippedRow {
                    row: row_number,
                    reason,
                });
            }
        }
    }

    if !report.skipped.is_empty() {
        warn!(
            "Excluded {} malformed catalog rows out of {}",
            report.skipped.len(),
            report.total_rows()
        );
    }
    info!("Loaded {} neighborhoods", report.records.len());

    Ok(report)
}

fn identity(value: Option<String>, field: &str) -> Result<String, String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() && !v.eq_ignore_ascii_case("unknown") => Ok(v),
        _ => Err(format!("missing identity field {field}")),
    }
}

fn unit_index(value: Option<f64>, field: &str) -> Result<Option<f64>, String> {
    match value {
        Some(v) if !(0.0..=1.0).contains(&v) => Err(format!("{field} out of [0,1]: {v}")),
        other => Ok(other),
    }
}

fn non_negative(value: Option<f64>, field: &str) -> Result<Option<f64>, String> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => Err(format!("{field} must be non-negative: {v}")),
        other => Ok(other),
    }
}

fn count(value: Option<f64>, field: &str) -> Result<Option<u32>, String> {
    Ok(non_negative(value, field)?.map(|v| v.round().min(u32::MAX as f64) as u32))
}

fn validate_row(row: CsvRow) -> Result<NeighborhoodRecord, String> {
    let name = identity(row.name, "Mahalle")?;
    let district = identity(row.district, "İlçe")?;

    let mut record = NeighborhoodRecord::new(name, district);
    record.green_index = unit_index(row.green_index, "Green_Index")?;
    record.welfare_index = unit_index(row.welfare_index, "Society_Welfare_Index")?;
    record.rent_per_sqm = non_negative(row.rent_per_sqm, "Avg_Rent_Per_SqM")?;
    record.population = non_negative(row.population, "Nüfus")?.map(|v| v.round() as u64);

    record.restaurants = count(row.restaurant, "restaurant")?;
    record.schools = count(row.school, "school")?;
    record.parks = count(row.park, "park")?;
    record.cafes = count(row.cafe, "cafe")?;

    let stations = [
        count(row.bus_station, "bus_station")?,
        count(row.train_station, "train_station")?,
        count(row.transit_station, "transit_station")?,
    ];
    record.total_stations = if stations.iter().all(Option::is_none) {
        None
    } else {
        Some(stations.iter().map(|s| s.unwrap_or(0)).sum())
    };

    record.casualties = count(row.casualties, "can_kaybi_sayisi")?;
    record.severely_damaged_buildings = count(row.severely_damaged, "cok_agir_hasarli_bina_sayisi")?;
    record.heavily_damaged_buildings = count(row.heavily_damaged, "agir_hasarli_bina_sayisi")?;

    record.description = row.description.filter(|d| !d.trim().is_empty());

    Ok(record)
}
