//! Loading the crawled FAQ corpus into a vector index.

use std::path::Path;

use snit_core::Result;
use snit_infer::Embedder;
use tracing::{info, warn};

use crate::index::VectorIndex;
use crate::types::FaqEntry;

const BATCH_SIZE: usize = 64;

/// Read `faq.json`: a JSON array of `{question, category, answer}`.
pub fn load_corpus(path: &Path) -> Result<Vec<FaqEntry>> {
    let raw = std::fs::read_to_string(path)?;
    let entries: Vec<FaqEntry> = serde_json::from_str(&raw)?;
    info!("Loaded {} FAQ entries from {}", entries.len(), path.display());
    Ok(entries)
}

/// Embed each entry's answer text and insert it into the index.
///
/// Entries without answer text are skipped. Returns the number inserted.
pub async fn index_corpus(
    entries: &[FaqEntry],
    embedder: &dyn Embedder,
    index: &dyn VectorIndex,
) -> Result<usize> {
    let usable: Vec<&FaqEntry> = entries
        .iter()
        .filter(|e| {
            let keep = !e.answer.trim().is_empty();
            if !keep {
                warn!("Skipping FAQ entry without answer: {:?}", e.question);
            }
            keep
        })
        .collect();

    let mut stored = 0;
    for batch in usable.chunks(BATCH_SIZE) {
        let texts: Vec<&str> = batch.iter().map(|e| e.answer.as_str()).collect();
        let vectors: Vec<_> = embedder
            .embed_batch(&texts)
            .await?
            .into_iter()
            .map(|r| r.embedding)
            .collect();
        let owned: Vec<FaqEntry> = batch.iter().map(|e| (*e).clone()).collect();
        stored += index.insert(&owned, &vectors).await?;
    }

    info!("Stored {} documents in the FAQ index", stored);
    Ok(stored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::MemoryIndex;
    use async_trait::async_trait;
    use ndarray::array;
    use snit_infer::EmbeddingResult;

    /// Maps text to a 2-dim vector by whether it mentions luggage.
    struct KeywordEmbedder;

    #[async_trait]
    impl Embedder for KeywordEmbedder {
        async fn embed(&self, text: &str) -> Result<EmbeddingResult> {
            let embedding = if text.contains("hành lý") {
                array![0.0, 1.0]
            } else {
                array![1.0, 0.0]
            };
            Ok(EmbeddingResult {
                embedding,
                cached: false,
            })
        }

        fn dimension(&self) -> usize {
            2
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    #[test]
    fn test_load_corpus() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("faq.json");
        std::fs::write(
            &path,
            r#"[
                {"question": "Hủy vé thế nào?", "category": "Hủy vé", "answer": "Vào mục Vé của tôi."},
                {"question": "Mang bao nhiêu hành lý?", "category": "Hành lý", "answer": "Tối đa 20kg hành lý."}
            ]"#,
        )
        .unwrap();

        let entries = load_corpus(&path).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].category, "Hành lý");
    }

    #[test]
    fn test_load_corpus_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_corpus(&dir.path().join("absent.json")).is_err());
    }

    #[tokio::test]
    async fn test_index_corpus_skips_empty_answers() {
        let index = MemoryIndex::new(2);
        let entries = vec![
            FaqEntry {
                question: "Hủy vé?".into(),
                category: "Hủy vé".into(),
                answer: "Vào mục Vé của tôi.".into(),
            },
            FaqEntry {
                question: "Trống".into(),
                category: String::new(),
                answer: "  ".into(),
            },
            FaqEntry {
                question: "Hành lý?".into(),
                category: "Hành lý".into(),
                answer: "Tối đa 20kg hành lý.".into(),
            },
        ];

        let stored = index_corpus(&entries, &KeywordEmbedder, &index).await.unwrap();
        assert_eq!(stored, 2);

        let hits = index.search(&array![0.0, 1.0], 1).await.unwrap();
        assert_eq!(hits[0].question, "Hành lý?");
    }
}
