

pub mod embeddings;
pub mod extractor;
pub mod factory;
pub mod providers;

pub use embeddings::{Embedder, EmbeddingError, EmbeddingGenerator};
pub use extractor::{Extraction, ExtractionError, LlmPreferenceExtractor, PreferenceExtractor};
pub use factory::{EmbeddingProviderFactory, LlmProviderFactory};
