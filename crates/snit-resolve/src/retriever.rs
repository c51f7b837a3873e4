//! Knowledge retriever: embed, search, map to documents.

use std::sync::Arc;

use snit_core::{Error, Result};
use snit_infer::Embedder;
use tracing::{debug, warn};

use crate::index::VectorIndex;
use crate::types::RetrievedDocument;

/// Similarity search over the FAQ collection.
///
/// Holds shared handles to the embedder and index; cheap to clone.
#[derive(Clone)]
pub struct KnowledgeRetriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
}

impl KnowledgeRetriever {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embedder, index }
    }

    /// Whether both the embedder and the index can serve requests.
    pub fn is_available(&self) -> bool {
        self.embedder.is_available() && self.index.is_connected()
    }

    /// Retrieve up to `top_k` documents, best first.
    ///
    /// Fails with `Error::Unavailable` when the index is not connected or no
    /// embedder is configured. An empty result is a valid answer.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedDocument>> {
        debug!("Searching for query {:?} with top_k={}", query, top_k);

        if !self.index.is_connected() {
            return Err(Error::Unavailable("vector index is not connected".into()));
        }
        if !self.embedder.is_available() {
            return Err(Error::Unavailable("embeddings not available".into()));
        }
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let embedding = self.embedder.embed(query).await?.embedding;
        let hits = self.index.search(&embedding, top_k).await?;

        let documents: Vec<RetrievedDocument> = hits
            .into_iter()
            .filter_map(|hit| {
                if !hit.score.is_finite() {
                    warn!("Skipping hit with non-finite score: {:?}", hit.question);
                    return None;
                }
                Some(RetrievedDocument {
                    question: hit.question,
                    category: hit.category,
                    answer: hit.answer,
                    score: hit.score.clamp(0.0, 1.0),
                })
            })
            .take(top_k)
            .collect();

        debug!("Retrieved {} documents", documents.len());
        Ok(documents)
    }

    /// The single best match, if any.
    pub async fn best_match(&self, query: &str) -> Result<Option<RetrievedDocument>> {
        Ok(self.retrieve(query, 1).await?.into_iter().next())
    }
}
