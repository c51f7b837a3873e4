//! OpenAI embeddings API backend.

use async_trait::async_trait;
use ndarray::Array1;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use snit_core::{Error, Result};
use tracing::debug;

use crate::embedder::{Embedder, EmbeddingResult};

pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";
const EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";

/// Embedder backed by `POST /v1/embeddings`.
pub struct OpenAIEmbedder {
    client: Client,
    api_key: String,
    model: String,
    url: String,
    dim: usize,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAIEmbedder {
    pub fn new(client: Client, api_key: &str, dim: usize) -> Self {
        Self {
            client,
            api_key: api_key.to_string(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            url: EMBEDDINGS_URL.to_string(),
            dim,
        }
    }

    /// Point at an OpenAI-compatible embeddings endpoint with another model.
    pub fn with_endpoint(mut self, url: &str, model: &str) -> Self {
        self.url = url.to_string();
        self.model = model.to_string();
        self
    }

    async fn request(&self, input: serde_json::Value) -> Result<Vec<Vec<f32>>> {
        debug!("Embedding request to {} with model {}", self.url, self.model);

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&json!({ "model": self.model, "input": input }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Inference(format!("Embeddings API error {}: {}", status, body)));
        }

        let body: EmbeddingsResponse = response.json().await?;
        parse_embeddings(body, self.dim)
    }
}

fn parse_embeddings(mut body: EmbeddingsResponse, dim: usize) -> Result<Vec<Vec<f32>>> {
    body.data.sort_by_key(|item| item.index);
    body.data
        .into_iter()
        .map(|item| {
            if item.embedding.len() != dim {
                return Err(Error::Inference(format!(
                    "Expected {}-dim embedding, got {}",
                    dim,
                    item.embedding.len()
                )));
            }
            Ok(item.embedding)
        })
        .collect()
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    async fn embed(&self, text: &str) -> Result<EmbeddingResult> {
        let mut vectors = self.request(json!(text)).await?;
        let embedding = vectors
            .pop()
            .ok_or_else(|| Error::Inference("Embeddings API returned no data".into()))?;
        Ok(EmbeddingResult {
            embedding: Array1::from(embedding),
            cached: false,
        })
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<EmbeddingResult>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let vectors = self.request(json!(texts)).await?;
        if vectors.len() != texts.len() {
            return Err(Error::Inference(format!(
                "Requested {} embeddings, received {}",
                texts.len(),
                vectors.len()
            )));
        }
        Ok(vectors
            .into_iter()
            .map(|v| EmbeddingResult {
                embedding: Array1::from(v),
                cached: false,
            })
            .collect())
    }

    fn dimension(&self) -> usize {
        self.dim
    }

    fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }
}
