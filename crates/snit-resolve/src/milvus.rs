//! Milvus / Zilliz Cloud index over the RESTful v2 API.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use ndarray::Array1;
use reqwest::Client;
use serde_json::{json, Value};
use snit_core::{Error, Result, VectorIndexConfig};
use tracing::{debug, error, info, warn};

use crate::index::VectorIndex;
use crate::types::{FaqEntry, IndexHit};

const VECTOR_FIELD: &str = "embedding";
const OUTPUT_FIELDS: [&str; 3] = ["question", "category", "answer"];

// VARCHAR limits of the collection schema, in bytes.
const MAX_QUESTION: usize = 512;
const MAX_CATEGORY: usize = 128;
const MAX_ANSWER: usize = 2048;

/// Hosted FAQ collection.
pub struct MilvusIndex {
    client: Client,
    endpoint: Option<String>,
    token: Option<String>,
    db_name: String,
    collection: String,
    connected: AtomicBool,
}

impl MilvusIndex {
    /// Create the adapter without touching the network; call
    /// `check_connection` before serving.
    pub fn new(client: Client, config: &VectorIndexConfig) -> Self {
        Self {
            client,
            endpoint: config.endpoint.clone(),
            token: config.token.clone(),
            db_name: config.db_name.clone(),
            collection: config.collection.clone(),
            connected: AtomicBool::new(false),
        }
    }

    /// Create the adapter and probe the collection.
    pub async fn connect(client: Client, config: &VectorIndexConfig) -> Self {
        let index = Self::new(client, config);
        index.check_connection().await;
        index
    }

    /// Probe the cluster and record whether the collection is reachable.
    pub async fn check_connection(&self) -> bool {
        let ok = match self.call("collections/has", self.scoped(json!({}))).await {
            Ok(data) => {
                let has = data["has"].as_bool().unwrap_or(false);
                if !has {
                    warn!("Milvus collection {} does not exist", self.collection);
                }
                has
            }
            Err(e) => {
                error!("Milvus connection check failed: {}", e);
                false
            }
        };
        self.connected.store(ok, Ordering::SeqCst);
        if ok {
            info!(
                "Connected to Milvus collection {} (db {})",
                self.collection, self.db_name
            );
        }
        ok
    }

    /// Create the FAQ collection and its cosine index if missing.
    pub async fn ensure_collection(&self, dim: usize) -> Result<()> {
        let has = self.call("collections/has", self.scoped(json!({}))).await?;
        if has["has"].as_bool().unwrap_or(false) {
            info!("Collection already exists: {}", self.collection);
            self.connected.store(true, Ordering::SeqCst);
            return Ok(());
        }

        let body = self.scoped(json!({
            "schema": {
                "autoId": true,
                "enabledDynamicField": false,
                "fields": [
                    {"fieldName": "id", "dataType": "Int64", "isPrimary": true},
                    {"fieldName": VECTOR_FIELD, "dataType": "FloatVector",
                     "elementTypeParams": {"dim": dim.to_string()}},
                    {"fieldName": "question", "dataType": "VarChar",
                     "elementTypeParams": {"max_length": MAX_QUESTION.to_string()}},
                    {"fieldName": "category", "dataType": "VarChar",
                     "elementTypeParams": {"max_length": MAX_CATEGORY.to_string()}},
                    {"fieldName": "answer", "dataType": "VarChar",
                     "elementTypeParams": {"max_length": MAX_ANSWER.to_string()}}
                ]
            },
            "indexParams": [{
                "fieldName": VECTOR_FIELD,
                "indexName": VECTOR_FIELD,
                "metricType": "COSINE",
                "params": {"index_type": "IVF_FLAT", "nlist": "128"}
            }]
        }));
        self.call("collections/create", body).await?;
        info!("Created collection: {}", self.collection);
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn scoped(&self, mut body: Value) -> Value {
        body["dbName"] = json!(self.db_name);
        body["collectionName"] = json!(self.collection);
        body
    }

    /// POST to a v2 endpoint and unwrap the `{code, data, message}` envelope.
    async fn call(&self, path: &str, body: Value) -> Result<Value> {
        let endpoint = self
            .endpoint
            .as_deref()
            .ok_or_else(|| Error::Unavailable("vector index endpoint not configured".into()))?;
        let url = format!("{}/v2/vectordb/{}", endpoint, path);
        debug!("Milvus request {}", url);

        let mut request = self.client.post(&url).json(&body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Search(format!("Milvus error {}: {}", status, text)));
        }

        let envelope: Value = response.json().await?;
        unwrap_envelope(envelope)
    }
}

fn unwrap_envelope(envelope: Value) -> Result<Value> {
    match envelope["code"].as_i64() {
        Some(0) | Some(200) => Ok(envelope.get("data").cloned().unwrap_or(Value::Null)),
        code => Err(Error::Search(format!(
            "Milvus returned code {:?}: {}",
            code,
            envelope["message"].as_str().unwrap_or("unknown error")
        ))),
    }
}

/// Normalize a search payload, skipping hits that cannot be used.
fn parse_hits(data: &Value) -> Vec<IndexHit> {
    let Some(raw_hits) = data.as_array() else {
        warn!("Milvus search returned non-array data");
        return Vec::new();
    };
    raw_hits
        .iter()
        .filter_map(|raw| match IndexHit::from_value(raw) {
            Ok(hit) => Some(hit),
            Err(reason) => {
                warn!("Skipping search hit: {}", reason);
                None
            }
        })
        .collect()
}

fn truncate_bytes(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[async_trait]
impl VectorIndex for MilvusIndex {
    fn is_connected(&self) -> bool {
        self.endpoint.is_some() && self.connected.load(Ordering::SeqCst)
    }

    async fn search(&self, vector: &Array1<f32>, top_k: usize) -> Result<Vec<IndexHit>> {
        let body = self.scoped(json!({
            "data": [vector.to_vec()],
            "annsField": VECTOR_FIELD,
            "limit": top_k,
            "outputFields": OUTPUT_FIELDS,
            "searchParams": {"metricType": "COSINE"}
        }));
        let data = self.call("entities/search", body).await?;
        let hits = parse_hits(&data);
        debug!("Vector search returned {} results", hits.len());
        Ok(hits)
    }

    async fn insert(&self, entries: &[FaqEntry], vectors: &[Array1<f32>]) -> Result<usize> {
        if entries.len() != vectors.len() {
            return Err(Error::Internal(format!(
                "{} entries but {} vectors",
                entries.len(),
                vectors.len()
            )));
        }
        if entries.is_empty() {
            return Ok(0);
        }
        let rows: Vec<Value> = entries
            .iter()
            .zip(vectors)
            .map(|(entry, v)| {
                json!({
                    VECTOR_FIELD: v.to_vec(),
                    "question": truncate_bytes(&entry.question, MAX_QUESTION),
                    "category": truncate_bytes(&entry.category, MAX_CATEGORY),
                    "answer": truncate_bytes(&entry.answer, MAX_ANSWER),
                })
            })
            .collect();

        let data = self
            .call("entities/insert", self.scoped(json!({ "data": rows })))
            .await?;
        Ok(data["insertCount"].as_u64().unwrap_or(0) as usize)
    }
}
