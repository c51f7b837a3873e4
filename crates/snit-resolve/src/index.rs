//! Vector index abstraction and the in-process implementation.

use async_trait::async_trait;
use ndarray::Array1;
use parking_lot::RwLock;
use snit_core::{Error, Result};

use crate::types::{FaqEntry, IndexHit};

/// A similarity-search index over the FAQ collection.
///
/// Implementations own result normalization: whatever shape the backing
/// store returns, `search` yields `IndexHit`s ordered by descending score.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Whether the index can currently serve searches.
    fn is_connected(&self) -> bool;

    /// Top-k cosine search.
    async fn search(&self, vector: &Array1<f32>, top_k: usize) -> Result<Vec<IndexHit>>;

    /// Store entries with their precomputed vectors. Returns the number stored.
    async fn insert(&self, entries: &[FaqEntry], vectors: &[Array1<f32>]) -> Result<usize>;
}

/// Brute-force cosine index held in memory.
pub struct MemoryIndex {
    rows: RwLock<Vec<(FaqEntry, Array1<f32>)>>,
    dim: usize,
}

impl MemoryIndex {
    pub fn new(dim: usize) -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            dim,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn normalize(v: &Array1<f32>) -> Array1<f32> {
    let norm = v.dot(v).sqrt();
    if norm > 0.0 {
        v / norm
    } else {
        v.clone()
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    fn is_connected(&self) -> bool {
        true
    }

    async fn search(&self, vector: &Array1<f32>, top_k: usize) -> Result<Vec<IndexHit>> {
        if vector.len() != self.dim {
            return Err(Error::Search(format!(
                "Query vector has {} dims, index expects {}",
                vector.len(),
                self.dim
            )));
        }
        let query = normalize(vector);
        let rows = self.rows.read();

        let mut scored: Vec<(f64, &FaqEntry)> = rows
            .iter()
            .map(|(entry, v)| (query.dot(v) as f64, entry))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(score, entry)| IndexHit {
                question: entry.question.clone(),
                category: entry.category.clone(),
                answer: entry.answer.clone(),
                score,
            })
            .collect())
    }

    async fn insert(&self, entries: &[FaqEntry], vectors: &[Array1<f32>]) -> Result<usize> {
        if entries.len() != vectors.len() {
            return Err(Error::Internal(format!(
                "{} entries but {} vectors",
                entries.len(),
                vectors.len()
            )));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dim) {
            return Err(Error::Search(format!(
                "Vector has {} dims, index expects {}",
                bad.len(),
                self.dim
            )));
        }
        let mut rows = self.rows.write();
        for (entry, v) in entries.iter().zip(vectors) {
            rows.push((entry.clone(), normalize(v)));
        }
        Ok(entries.len())
    }
}
