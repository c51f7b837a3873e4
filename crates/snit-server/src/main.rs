//! SniT: customer-support assistant server for bus ticketing.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use snit_core::SnitConfig;
use snit_infer::Embedder;
use snit_resolve::{MemoryIndex, MilvusIndex, VectorIndex};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod history;
mod routes;
mod state;

use state::AppState;

fn resolve_data_dir() -> PathBuf {
    std::env::var("SNIT_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"))
}

fn http_client(config: &SnitConfig) -> anyhow::Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()?)
}

/// The hosted index when configured, otherwise an in-memory index seeded
/// from the local corpus file.
async fn open_index(
    config: &SnitConfig,
    client: &reqwest::Client,
    embedder: &dyn Embedder,
) -> Arc<dyn VectorIndex> {
    if config.vector_index.endpoint.is_some() {
        return Arc::new(MilvusIndex::connect(client.clone(), &config.vector_index).await);
    }

    warn!("MILVUS_CLOUD_ENDPOINT not set. Using an in-memory FAQ index.");
    let index = MemoryIndex::new(config.embedding_dim);
    let corpus = &config.data_paths.faq_corpus;
    if corpus.exists() && embedder.is_available() {
        match snit_resolve::load_corpus(corpus) {
            Ok(entries) => {
                if let Err(e) = snit_resolve::index_corpus(&entries, embedder, &index).await {
                    warn!("Could not index {}: {}", corpus.display(), e);
                }
            }
            Err(e) => warn!("Could not read {}: {}", corpus.display(), e),
        }
    }
    Arc::new(index)
}

/// `snit index <faq.json>`: embed the corpus into the hosted collection.
async fn run_index(config: SnitConfig, corpus: &Path) -> anyhow::Result<()> {
    if config.vector_index.endpoint.is_none() {
        anyhow::bail!("MILVUS_CLOUD_ENDPOINT must be set to build the FAQ index");
    }
    let client = http_client(&config)?;
    let embedder = snit_infer::create_embedder(
        client.clone(),
        config.openai_api_key.as_deref(),
        config.embedding_dim,
    );
    if !embedder.is_available() {
        anyhow::bail!("OPENAI_API_KEY must be set to build the FAQ index");
    }

    let index = MilvusIndex::new(client, &config.vector_index);
    index.ensure_collection(config.embedding_dim).await?;

    let entries = snit_resolve::load_corpus(corpus)?;
    let stored = snit_resolve::index_corpus(&entries, embedder.as_ref(), &index).await?;
    info!(
        "Indexed {} of {} FAQ entries into {}",
        stored,
        entries.len(),
        config.vector_index.collection
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let data_dir = resolve_data_dir();

    if args.len() > 1 {
        match args[1].as_str() {
            "index" => {
                let config = SnitConfig::from_env(&data_dir)?;
                let corpus = args
                    .get(2)
                    .map(PathBuf::from)
                    .unwrap_or_else(|| config.data_paths.faq_corpus.clone());
                return run_index(config, &corpus).await;
            }
            "--help" | "-h" | "help" => {
                println!("SniT — bus ticketing support assistant");
                println!();
                println!("Usage: snit [command]");
                println!();
                println!("Commands:");
                println!("  (none)                   Start the server");
                println!("  index [faq.json]         Embed the FAQ corpus into the vector index");
                println!("  help                     Show this help message");
                return Ok(());
            }
            _ => {
                eprintln!("Unknown command: {}. Use 'snit help' for usage.", args[1]);
                std::process::exit(1);
            }
        }
    }

    info!("Data directory: {}", data_dir.display());
    let config = SnitConfig::from_env(&data_dir)?;
    let port = config.port;

    let client = http_client(&config)?;
    let embedder = snit_infer::create_embedder(
        client.clone(),
        config.openai_api_key.as_deref(),
        config.embedding_dim,
    );
    let index = open_index(&config, &client, embedder.as_ref()).await;

    let state = Arc::new(AppState::from_config(config, client, embedder, index)?);
    let app = routes::build_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("SniT server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
