use std::env;
use std::path::PathBuf;

use anyhow::Context;
use mahalle::catalog::{load_catalog, EmbeddingIndex};
use mahalle::llm::EmbeddingProviderFactory;
use mahalle::MahalleConfig;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("mahalle=info".parse()?))
        .init();

    let args: Vec<String> = env::args().collect();
    let mut config_path: Option<PathBuf> = None;
    let mut data_path: Option<PathBuf> = None;
    let mut out_path: Option<PathBuf> = None;
    let mut force = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--data" | "-d" => {
                if i + 1 < args.len() {
                    data_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--out" | "-o" => {
                if i + 1 < args.len() {
                    out_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--force" => force = true,
            "--help" => {
                print_help();
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let config = MahalleConfig::load(config_path.as_deref()).context("loading configuration")?;
    let data_path = data_path.unwrap_or_else(|| config.data_path.clone());
    let out_path = out_path.unwrap_or_else(|| config.index_path.clone());

    println!("Mahalle embedding index");
    println!("   Catalog: {}", data_path.display());
    println!("   Index:   {}", out_path.display());
    println!("   Model:   {} ({})", config.embedding_model, config.embedding_provider);

    let report = load_catalog(&data_path)
        .with_context(|| format!("loading catalog {}", data_path.display()))?;
    println!(
        "   Rows:    {} loaded, {} skipped",
        report.records.len(),
        report.skipped.len()
    );
    for skipped in &report.skipped {
        eprintln!("   row {}: {}", skipped.row, skipped.reason);
    }

    let embedder = EmbeddingProviderFactory::from_config(&config)?;
    let index = if force {
        let index = EmbeddingIndex::build(&report.records, &embedder).await?;
        index.save(&out_path)?;
        index
    } else {
        EmbeddingIndex::load_or_build(&out_path, &report.records, &embedder).await?
    };

    println!();
    println!(
        "Index ready: {} vectors, dim={}, fingerprint={}",
        index.len(),
        index.dimension,
        &index.fingerprint[..12.min(index.fingerprint.len())]
    );
    Ok(())
}

fn print_help() {
    println!("mahalle-index: build or refresh the neighborhood embedding index");
    println!();
    println!("USAGE:");
    println!("    mahalle-index [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    -c, --config <file>   Configuration file (MAHALLE_* env vars also apply)");
    println!("    -d, --data <csv>      Neighborhood CSV (default: data_path)");
    println!("    -o, --out <json>      Index file (default: index_path)");
    println!("        --force           Rebuild even when the index is current");
    println!("        --help            Show this help");
}
