//! LRU query cache for embedding results.
//!
//! The router's fast path and the FAQ pipeline usually embed the same
//! message within one request; the cache turns the second call into a hit.
//! Default: 1000 entries, 1-hour TTL.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use ndarray::Array1;
use parking_lot::Mutex;
use snit_core::Result;
use tracing::trace;

use crate::embedder::{Embedder, EmbeddingResult};

struct CacheEntry {
    embedding: Array1<f32>,
    inserted_at: Instant,
}

/// Thread-safe LRU cache keyed by the exact query text.
pub struct QueryCache {
    inner: Mutex<CacheInner>,
}

struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    /// Least recently used at the front.
    recency: VecDeque<String>,
    capacity: usize,
    ttl: Duration,
}

impl CacheInner {
    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.recency.iter().position(|k| k == key) {
            if let Some(k) = self.recency.remove(pos) {
                self.recency.push_back(k);
            }
        }
    }

    fn forget(&mut self, key: &str) {
        self.entries.remove(key);
        self.recency.retain(|k| k != key);
    }
}

impl QueryCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: HashMap::with_capacity(capacity),
                recency: VecDeque::with_capacity(capacity),
                capacity: capacity.max(1),
                ttl,
            }),
        }
    }

    pub fn default_cache() -> Self {
        Self::new(1000, Duration::from_secs(3600))
    }

    /// Get a cached embedding. Expired entries are dropped and reported as a miss.
    pub fn get(&self, query: &str) -> Option<Array1<f32>> {
        let mut inner = self.inner.lock();
        let ttl = inner.ttl;
        let (embedding, expired) = match inner.entries.get(query) {
            Some(entry) => (entry.embedding.clone(), entry.inserted_at.elapsed() >= ttl),
            None => return None,
        };
        if expired {
            inner.forget(query);
            return None;
        }
        inner.touch(query);
        Some(embedding)
    }

    pub fn put(&self, query: String, embedding: Array1<f32>) {
        let mut inner = self.inner.lock();
        let entry = CacheEntry {
            embedding,
            inserted_at: Instant::now(),
        };

        if inner.entries.insert(query.clone(), entry).is_some() {
            inner.touch(&query);
            return;
        }

        inner.recency.push_back(query);
        while inner.entries.len() > inner.capacity {
            match inner.recency.pop_front() {
                Some(oldest) => {
                    inner.entries.remove(&oldest);
                }
                None => break,
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.recency.clear();
    }
}

/// Embedder decorator that consults a `QueryCache` before the backend.
pub struct CachedEmbedder {
    inner: Arc<dyn Embedder>,
    cache: QueryCache,
}

impl CachedEmbedder {
    pub fn new(inner: Arc<dyn Embedder>, cache: QueryCache) -> Self {
        Self { inner, cache }
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }
}

#[async_trait]
impl Embedder for CachedEmbedder {
    async fn embed(&self, text: &str) -> Result<EmbeddingResult> {
        if let Some(embedding) = self.cache.get(text) {
            trace!("Embedding cache hit");
            return Ok(EmbeddingResult {
                embedding,
                cached: true,
            });
        }
        let result = self.inner.embed(text).await?;
        self.cache.put(text.to_string(), result.embedding.clone());
        Ok(result)
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn is_available(&self) -> bool {
        self.inner.is_available()
    }
}
