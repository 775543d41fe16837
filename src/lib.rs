pub mod catalog;
pub mod core;
pub mod llm;
pub mod recommend;
pub mod server;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

pub use utils::{format_thousands, safe_truncate, safe_truncate_ellipsis};


pub use catalog::{CatalogStore, EmbeddingIndex, NeighborhoodRecord};
pub use core::config::MahalleConfig;
pub use core::error::{MahalleError, Result};
pub use llm::embeddings::{Embedder, EmbeddingGenerator};
pub use llm::extractor::{LlmPreferenceExtractor, PreferenceExtractor};
pub use recommend::{Orchestrator, Preferences, RecommendationResponse};


pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";


pub const DEFAULT_EMBEDDING_MODEL: &str = "all-minilm";


pub const DEFAULT_LLM_MODEL: &str = "llama-3.1-8b-instant";


pub const DEFAULT_FALLBACK_LLM_MODEL: &str = "llama3.2";


pub const DEFAULT_SERVER_PORT: u16 = 5001;


pub const DEFAULT_APARTMENT_SIZE_SQM: f64 = 80.0;


pub const DEFAULT_TOP_N: usize = 3;


pub const DEFAULT_CURRENCY: &str = "TRY";


pub const DEFAULT_CACHE_SIZE: usize = 1000;


pub const DEFAULT_CACHE_TTL: u64 = 300;
