use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use mahalle::catalog::{load_catalog, CatalogStore, EmbeddingIndex};
use mahalle::llm::providers::LlmProvider;
use mahalle::llm::{EmbeddingProviderFactory, LlmPreferenceExtractor, LlmProviderFactory};
use mahalle::server::{serve, AppState};
use mahalle::{Embedder, MahalleConfig, Orchestrator};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::from_default_env()
                .add_directive("mahalle=info".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let mut config_path: Option<PathBuf> = None;
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" => {
                println!("mahalle-server [--config <file>]");
                println!("Settings may also be given as MAHALLE_* environment variables.");
                return Ok(());
            }
            other => warn!("Ignoring unknown argument {}", other),
        }
        i += 1;
    }

    let config = MahalleConfig::load(config_path.as_deref()).context("loading configuration")?;

    let report = load_catalog(&config.data_path)
        .with_context(|| format!("loading catalog {}", config.data_path.display()))?;
    if !report.skipped.is_empty() {
        warn!("{} of {} catalog rows skipped", report.skipped.len(), report.total_rows());
    }

    let embedder = Arc::new(EmbeddingProviderFactory::from_config(&config)?);
    let index = EmbeddingIndex::load_or_build(&config.index_path, &report.records, embedder.as_ref())
        .await
        .context("preparing embedding index")?;
    let catalog = Arc::new(CatalogStore::assemble(report.records, &index)?);
    info!(
        "Catalog ready: {} neighborhoods ({} excluded), dim={}",
        catalog.len(),
        catalog.excluded(),
        catalog.dimension()
    );

    let provider = LlmProviderFactory::from_config(&config)?;
    let llm_provider = format!("{}/{}", provider.provider_name(), provider.model_name());
    let extractor = Arc::new(LlmPreferenceExtractor::new(provider));
    let embedding_model = embedder.model_name().to_string();

    let orchestrator = Orchestrator::new(catalog, extractor, embedder, &config);
    let state = AppState {
        orchestrator: Arc::new(orchestrator),
        llm_provider,
        embedding_model,
    };

    serve(state, &config.bind_address()).await?;
    Ok(())
}
