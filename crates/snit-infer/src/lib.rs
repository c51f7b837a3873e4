//! SniT Infer: embedding backends and query cache.
//!
//! Provides the `Embedder` trait for turning text into vectors.
//! With an OpenAI API key, `OpenAIEmbedder` calls the embeddings endpoint
//! (`text-embedding-ada-002`, 1536 dims). Without one, `NoopEmbedder` is used
//! and every retrieval reports the knowledge base as unavailable.

pub mod cache;
pub mod embedder;
pub mod openai_embedder;

pub use cache::{CachedEmbedder, QueryCache};
pub use embedder::{Embedder, EmbeddingResult, NoopEmbedder};
pub use openai_embedder::OpenAIEmbedder;

use std::sync::Arc;

/// Create the best available embedder for the given API key, wrapped in the
/// default query cache.
pub fn create_embedder(
    client: reqwest::Client,
    api_key: Option<&str>,
    dimension: usize,
) -> Arc<dyn Embedder> {
    match api_key {
        Some(key) => {
            tracing::info!("Using OpenAI embedder (dim={})", dimension);
            let inner: Arc<dyn Embedder> = Arc::new(OpenAIEmbedder::new(client, key, dimension));
            Arc::new(CachedEmbedder::new(inner, QueryCache::default_cache()))
        }
        None => {
            tracing::warn!("OPENAI_API_KEY not set. Knowledge retrieval is disabled.");
            Arc::new(NoopEmbedder::new(dimension))
        }
    }
}
