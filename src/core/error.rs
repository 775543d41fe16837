

use thiserror::Error;


#[derive(Error, Debug)]
pub enum MahalleError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Catalog error: {0}")]
    Catalog(#[from] crate::catalog::CatalogError),

    #[error("LLM provider error: {0}")]
    LlmProvider(#[from] crate::llm::providers::LlmProviderError),

    #[error("Embedding generation error: {0}")]
    Embedding(#[from] crate::llm::embeddings::EmbeddingError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] crate::recommend::PipelineError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for MahalleError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}


pub type Result<T> = std::result::Result<T, MahalleError>;
