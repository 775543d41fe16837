

pub mod base;
pub mod fallback;
pub mod groq;
pub mod ollama;

pub use base::{LlmMetadata, LlmProvider, LlmProviderError, JSON_MODE};
pub use fallback::LlmProviderWithFallback;
pub use groq::GroqProvider;
pub use ollama::OllamaProvider;
