

pub mod index;
pub mod loader;
pub mod record;
pub mod store;

pub use index::EmbeddingIndex;
pub use loader::{load_catalog, LoadReport, SkippedRow};
pub use record::NeighborhoodRecord;
pub use store::{CatalogStats, CatalogStore, RentRange};

use thiserror::Error;


#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Catalog is empty after validation ({excluded} records excluded)")]
    Empty { excluded: usize },

    #[error("Embedding index error: {0}")]
    Index(String),
}
