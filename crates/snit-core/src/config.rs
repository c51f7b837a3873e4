//! Configuration and data directory management.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_FAST_PATH_THRESHOLD: f64 = 0.85;
pub const DEFAULT_FAQ_TOP_K: usize = 1;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_COLLECTION: &str = "faq_vexere";
pub const DEFAULT_DB_NAME: &str = "default";
/// Dimension of `text-embedding-ada-002`.
pub const DEFAULT_EMBEDDING_DIM: usize = 1536;

/// Paths to the SniT data files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    /// Root data directory (e.g., `data/`).
    pub root: PathBuf,
    /// Crawled FAQ corpus (`data/faq.json`).
    pub faq_corpus: PathBuf,
    /// LLM provider configuration (`data/llm-config.json`).
    pub llm_config_file: PathBuf,
}

impl DataPaths {
    /// Create data paths from a root directory. Creates the root if needed.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            faq_corpus: root.join("faq.json"),
            llm_config_file: root.join("llm-config.json"),
            root,
        })
    }
}

/// Connection settings for the hosted vector index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorIndexConfig {
    /// Cluster endpoint; `None` means no hosted index is configured.
    pub endpoint: Option<String>,
    #[serde(skip_serializing)]
    pub token: Option<String>,
    pub db_name: String,
    pub collection: String,
}

/// Top-level SniT configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnitConfig {
    /// HTTP server port.
    pub port: u16,
    /// Data directory paths.
    pub data_paths: DataPaths,
    /// Base URL of the ticket / chat-history backend.
    pub backend_url: Option<String>,
    pub vector_index: VectorIndexConfig,
    /// API key for the embeddings endpoint.
    #[serde(skip_serializing)]
    pub openai_api_key: Option<String>,
    pub embedding_dim: usize,
    /// Minimum similarity for the router to skip the LLM and answer as FAQ.
    pub fast_path_threshold: f64,
    /// Documents retrieved per FAQ answer.
    pub faq_top_k: usize,
    /// Per-request deadline applied to outbound HTTP calls.
    pub request_timeout_secs: u64,
}

impl SnitConfig {
    /// Create configuration from environment and defaults.
    pub fn from_env(data_dir: impl AsRef<Path>) -> std::io::Result<Self> {
        Self::from_lookup(data_dir, |key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup<F>(data_dir: impl AsRef<Path>, lookup: F) -> std::io::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = parse_or(var("PORT"), "PORT", DEFAULT_PORT);
        let fast_path_threshold = parse_or(
            var("FAST_PATH_THRESHOLD"),
            "FAST_PATH_THRESHOLD",
            DEFAULT_FAST_PATH_THRESHOLD,
        );
        let faq_top_k = parse_or(var("FAQ_TOP_K"), "FAQ_TOP_K", DEFAULT_FAQ_TOP_K).max(1);
        let request_timeout_secs = parse_or(
            var("REQUEST_TIMEOUT_SECS"),
            "REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        );

        let data_paths = DataPaths::new(data_dir)?;

        Ok(Self {
            port,
            data_paths,
            backend_url: var("BACKEND_URL").map(|u| u.trim_end_matches('/').to_string()),
            vector_index: VectorIndexConfig {
                endpoint: var("MILVUS_CLOUD_ENDPOINT").map(|u| u.trim_end_matches('/').to_string()),
                token: var("MILVUS_CLOUD_TOKEN"),
                db_name: var("MILVUS_CLOUD_DB_NAME").unwrap_or_else(|| DEFAULT_DB_NAME.into()),
                collection: var("MILVUS_CLOUD_COLLECTION_NAME")
                    .unwrap_or_else(|| DEFAULT_COLLECTION.into()),
            },
            openai_api_key: var("OPENAI_API_KEY"),
            embedding_dim: DEFAULT_EMBEDDING_DIM,
            fast_path_threshold,
            faq_top_k,
            request_timeout_secs,
        })
    }
}

fn parse_or<T: std::str::FromStr + Copy>(raw: Option<String>, key: &str, default: T) -> T {
    match raw {
        Some(value) => value.parse().unwrap_or_else(|_| {
            warn!("Ignoring invalid {}={:?}, using default", key, value);
            default
        }),
        None => default,
    }
}
