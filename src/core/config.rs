

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::{MahalleError, Result};
use crate::{
    DEFAULT_APARTMENT_SIZE_SQM, DEFAULT_CACHE_SIZE, DEFAULT_CACHE_TTL, DEFAULT_CURRENCY,
    DEFAULT_EMBEDDING_MODEL, DEFAULT_FALLBACK_LLM_MODEL, DEFAULT_LLM_MODEL, DEFAULT_OLLAMA_URL,
    DEFAULT_SERVER_PORT, DEFAULT_TOP_N,
};


#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MahalleConfig {

    pub host: String,
    pub port: u16,


    pub data_path: PathBuf,
    pub index_path: PathBuf,


    pub currency: String,
    pub default_apartment_size_sqm: f64,
    pub top_n: usize,
    pub extraction_timeout_secs: u64,
    pub embedding_timeout_secs: u64,
    /// Per-attempt HTTP timeout for each LLM provider. Primary and fallback
    /// must both fit inside `extraction_timeout_secs`.
    pub llm_timeout_secs: u64,


    pub llm_provider: String,
    pub llm_model: String,
    pub llm_api_key: Option<String>,
    pub llm_base_url: Option<String>,
    pub llm_temperature: f64,


    pub llm_fallback_enabled: bool,
    pub llm_fallback_url: String,
    pub llm_fallback_model: String,


    pub embedding_provider: String,
    pub embedding_model: String,
    pub embedding_url: String,
    pub embedding_api_key: Option<String>,
    pub embedding_cache_size: usize,
    pub embedding_cache_ttl_secs: u64,
}

impl Default for MahalleConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_SERVER_PORT,

            data_path: PathBuf::from("neighborhoods_with_descriptions.csv"),
            index_path: PathBuf::from("neighborhood_embeddings.json"),

            currency: DEFAULT_CURRENCY.to_string(),
            default_apartment_size_sqm: DEFAULT_APARTMENT_SIZE_SQM,
            top_n: DEFAULT_TOP_N,
            extraction_timeout_secs: 20,
            embedding_timeout_secs: 10,
            llm_timeout_secs: 8,

            llm_provider: "groq".to_string(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            llm_api_key: None,
            llm_base_url: None,
            llm_temperature: 0.1,

            llm_fallback_enabled: true,
            llm_fallback_url: DEFAULT_OLLAMA_URL.to_string(),
            llm_fallback_model: DEFAULT_FALLBACK_LLM_MODEL.to_string(),

            embedding_provider: "ollama".to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_url: DEFAULT_OLLAMA_URL.to_string(),
            embedding_api_key: None,
            embedding_cache_size: DEFAULT_CACHE_SIZE,
            embedding_cache_ttl_secs: DEFAULT_CACHE_TTL,
        }
    }
}

impl MahalleConfig {
    /// Layers built-in defaults, an optional config file, then `MAHALLE_*`
    /// environment variables.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?);

        if let Some(path) = file {
            debug!("Reading configuration file {}", path.display());
            builder = builder.add_source(config::File::from(path).required(false));
        }

        let mut loaded: Self = builder
            .add_source(config::Environment::with_prefix("MAHALLE").try_parsing(true))
            .build()?
            .try_deserialize()?;

        if loaded.llm_api_key.is_none() {
            loaded.llm_api_key = std::env::var("GROQ_API_KEY").ok();
        }

        loaded.validate()?;
        Ok(loaded)
    }


    pub fn validate(&self) -> Result<()> {
        if self.top_n == 0 {
            return Err(MahalleError::Config("top_n must be at least 1".to_string()));
        }
        if !(self.default_apartment_size_sqm.is_finite() && self.default_apartment_size_sqm > 0.0) {
            return Err(MahalleError::Config(format!(
                "default_apartment_size_sqm must be positive, got {}",
                self.default_apartment_size_sqm
            )));
        }
        if self.extraction_timeout_secs == 0 || self.embedding_timeout_secs == 0 || self.llm_timeout_secs == 0 {
            return Err(MahalleError::Config("timeouts must be non-zero".to_string()));
        }
        if self.llm_fallback_enabled && self.llm_timeout_secs.saturating_mul(2) > self.extraction_timeout_secs {
            return Err(MahalleError::Config(format!(
                "llm_timeout_secs ({}) leaves no room for the fallback within extraction_timeout_secs ({})",
                self.llm_timeout_secs, self.extraction_timeout_secs
            )));
        }
        if self.llm_timeout_secs > self.extraction_timeout_secs {
            return Err(MahalleError::Config(format!(
                "llm_timeout_secs ({}) exceeds extraction_timeout_secs ({})",
                self.llm_timeout_secs, self.extraction_timeout_secs
            )));
        }

        let urls = [
            Some(self.llm_fallback_url.as_str()),
            Some(self.embedding_url.as_str()),
            self.llm_base_url.as_deref(),
        ];
        for raw in urls.into_iter().flatten() {
            url::Url::parse(raw)
                .map_err(|e| MahalleError::Config(format!("invalid URL {raw:?}: {e}")))?;
        }

        Ok(())
    }


    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn extraction_timeout(&self) -> Duration {
        Duration::from_secs(self.extraction_timeout_secs)
    }

    pub fn embedding_timeout(&self) -> Duration {
        Duration::from_secs(self.embedding_timeout_secs)
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = MahalleConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.top_n, 3);
        assert_eq!(config.default_apartment_size_sqm, 80.0);
        assert_eq!(config.bind_address(), "0.0.0.0:5001");
    }

    #[test]
    fn test_rejects_zero_top_n() {
        let config = MahalleConfig {
            top_n: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(MahalleError::Config(_))));
    }

    #[test]
    fn test_llm_timeout_must_leave_room_for_fallback() {
        let config = MahalleConfig {
            extraction_timeout_secs: 10,
            llm_timeout_secs: 6,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(MahalleError::Config(_))));

        let config = MahalleConfig {
            extraction_timeout_secs: 10,
            llm_timeout_secs: 5,
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        let config = MahalleConfig {
            extraction_timeout_secs: 10,
            llm_timeout_secs: 6,
            llm_fallback_enabled: false,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_url() {
        let config = MahalleConfig {
            embedding_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mahalle.toml");
        std::fs::write(&path, "top_n = 5\ncurrency = \"EUR\"\n").unwrap();

        let config = MahalleConfig::load(Some(&path)).unwrap();
        assert_eq!(config.top_n, 5);
        assert_eq!(config.currency, "EUR");
        assert_eq!(config.llm_provider, "groq");
    }
}
