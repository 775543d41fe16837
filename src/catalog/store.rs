use std::collections::HashSet;

use serde::Serialize;
use tracing::{info, warn};

use super::index::{dominant_dimension, EmbeddingIndex};
use super::record::NeighborhoodRecord;
use super::CatalogError;

/// Immutable, read-only catalog shared across concurrent queries.
#[derive(Debug)]
pub struct CatalogStore {
    records: Vec<NeighborhoodRecord>,
    dimension: usize,
    excluded: usize,
}


#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RentRange {
    pub min: f64,
    pub max: f64,
}


#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogStats {
    pub total_neighborhoods: usize,
    pub districts: usize,
    pub avg_green_index: Option<f64>,
    pub avg_welfare_index: Option<f64>,
    pub avg_rent_per_sqm: Option<f64>,
    pub rent_range: Option<RentRange>,
    pub total_restaurants: u64,
    pub total_schools: u64,
    pub total_parks: u64,
    pub total_cafes: u64,
}

impl CatalogStore {
    /// Keeps records carrying an embedding of the most common dimension;
    /// everything else is excluded and counted.
    pub fn from_records(records: Vec<NeighborhoodRecord>) -> Result<Self, CatalogError> {
        let dimension = dominant_dimension(records.iter().map(|r| r.embedding.len()));

        let total = records.len();
        let mut seen = HashSet::new();
        let kept: Vec<NeighborhoodRecord> = records
            .into_iter()
            .filter(|r| {
                if r.embedding.is_empty() || r.embedding.len() != dimension {
                    warn!("Excluding {}: embedding missing or dimension mismatch", r.id);
                    return false;
                }
                if !seen.insert(r.id.clone()) {
                    warn!("Excluding duplicate record {}", r.id);
                    return false;
                }
                true
            })
            .collect();

        let excluded = total - kept.len();
        if kept.is_empty() {
            return Err(CatalogError::Empty { excluded });
        }

        info!(
            "Catalog store ready: {} records, dim={}, excluded={}",
            kept.len(),
            dimension,
            excluded
        );

        Ok(Self {
            records: kept,
            dimension,
            excluded,
        })
    }


    pub fn assemble(
        mut records: Vec<NeighborhoodRecord>,
        index: &EmbeddingIndex,
    ) -> Result<Self, CatalogError> {
        for record in &mut records {
            if let Some(vector) = index.get(&record.id) {
                record.embedding = vector.to_vec();
            }
        }
        Self::from_records(records)
    }


    pub fn records(&self) -> &[NeighborhoodRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Records dropped during assembly.
    pub fn excluded(&self) -> usize {
        self.excluded
    }

    pub fn get(&self, id: &str) -> Option<&NeighborhoodRecord> {
        self.records.iter().find(|r| r.id == id)
    }


    pub fn stats(&self) -> CatalogStats {
        let districts: HashSet<&str> = self.records.iter().map(|r| r.district.as_str()).collect();

        let rents: Vec<f64> = self.records.iter().filter_map(|r| r.rent_per_sqm).collect();
        let rent_range = if rents.is_empty() {
            None
        } else {
            Some(RentRange {
                min: rents.iter().copied().fold(f64::INFINITY, f64::min),
                max: rents.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            })
        };

        let total = |f: fn(&NeighborhoodRecord) -> Option<u32>| -> u64 {
            self.records.iter().filter_map(f).map(u64::from).sum()
        };

        CatalogStats {
            total_neighborhoods: self.records.len(),
            districts: districts.len(),
            avg_green_index: mean(self.records.iter().filter_map(|r| r.green_index)),
            avg_welfare_index: mean(self.records.iter().filter_map(|r| r.welfare_index)),
            avg_rent_per_sqm: mean(rents.iter().copied()),
            rent_range,
            total_restaurants: total(|r| r.restaurants),
            total_schools: total(|r| r.schools),
            total_parks: total(|r| r.parks),
            total_cafes: total(|r| r.cafes),
        }
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}
