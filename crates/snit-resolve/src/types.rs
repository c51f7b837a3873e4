//! Retrieval types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One question/answer pair of the crawled FAQ corpus (`faq.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaqEntry {
    pub question: String,
    #[serde(default)]
    pub category: String,
    pub answer: String,
}

/// A similarity hit as every `VectorIndex` must report it.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexHit {
    pub question: String,
    pub category: String,
    pub answer: String,
    /// Cosine similarity, higher is closer.
    pub score: f64,
}

impl IndexHit {
    /// Normalize a raw store hit into an `IndexHit`.
    ///
    /// Accepts fields either flat on the hit or nested under `entity`, and a
    /// similarity under either `score` or `distance`. Returns a description of
    /// what is missing when the hit cannot be used.
    pub fn from_value(raw: &Value) -> Result<Self, String> {
        let field = |name: &str| -> Option<&Value> {
            raw.get(name)
                .or_else(|| raw.get("entity").and_then(|e| e.get(name)))
        };
        let text = |name: &str| -> String {
            field(name)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        let answer = text("answer");
        if answer.trim().is_empty() {
            return Err("hit has no answer text".into());
        }

        let score = raw
            .get("score")
            .or_else(|| raw.get("distance"))
            .and_then(Value::as_f64)
            .ok_or_else(|| "hit has no numeric score".to_string())?;

        Ok(Self {
            question: text("question"),
            category: text("category"),
            answer,
            score,
        })
    }
}

/// A retrieved FAQ document, as handed to the pipelines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDocument {
    pub question: String,
    pub category: String,
    pub answer: String,
    /// Cosine similarity clamped into `[0, 1]`.
    pub score: f64,
}
