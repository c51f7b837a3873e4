//! Embedding trait and the unavailable fallback.

use async_trait::async_trait;
use ndarray::Array1;
use snit_core::{Error, Result};

/// Result of an embedding operation.
#[derive(Debug, Clone)]
pub struct EmbeddingResult {
    /// Float32 embedding vector.
    pub embedding: Array1<f32>,
    /// Whether this was served from cache.
    pub cached: bool,
}

/// Trait for embedding backends. Shared read-only across requests.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a text string.
    async fn embed(&self, text: &str) -> Result<EmbeddingResult>;

    /// Generate embeddings for a batch of texts, in input order.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<EmbeddingResult>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    /// Get the embedding dimension.
    fn dimension(&self) -> usize;

    /// Check if the embedder can serve requests at all.
    fn is_available(&self) -> bool;
}

/// Placeholder embedder used when no embedding backend is configured.
pub struct NoopEmbedder {
    dim: usize,
}

impl NoopEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

#[async_trait]
impl Embedder for NoopEmbedder {
    async fn embed(&self, _text: &str) -> Result<EmbeddingResult> {
        Err(Error::Unavailable("embeddings not configured".into()))
    }

    fn dimension(&self) -> usize {
        self.dim
    }

    fn is_available(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_is_unavailable() {
        let embedder = NoopEmbedder::new(8);
        assert!(!embedder.is_available());
        assert_eq!(embedder.dimension(), 8);
        let err = embedder.embed("xin chào").await.unwrap_err();
        assert!(err.is_unavailable());
    }

    #[tokio::test]
    async fn test_default_batch_propagates_failure() {
        let embedder = NoopEmbedder::new(8);
        assert!(embedder.embed_batch(&["a", "b"]).await.is_err());
        assert!(embedder.embed_batch(&[]).await.unwrap().is_empty());
    }
}
