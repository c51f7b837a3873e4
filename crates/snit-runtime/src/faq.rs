//! Grounded FAQ answering: retrieve, build context, generate.

use std::sync::Arc;

use snit_chat::{ChatMessage, CompletionOptions, LanguageModel};
use snit_core::{Error, Result};
use snit_resolve::{KnowledgeRetriever, RetrievedDocument};
use tracing::{error, info, warn};

use crate::types::FaqAnswer;

const ANSWER_PROMPT: &str = "System: Bạn là trợ lý ảo của Vexere tên là SniT. Bạn sẽ trả lời câu hỏi của người dùng dựa trên dữ liệu FAQ đặt trong thẻ <context>...</context>.
Sử dụng những thông tin được cung cấp để trả lời câu hỏi người dùng đặt bên trong thẻ <question>...</question>.
Nếu không có thông tin nào phù hợp, chỉ cần trả lời \"Xin lỗi, tôi không có thông tin về câu hỏi này.\"
<context>
{context}
</context>
<question>
{question}
</question>
Trả lời bằng tiếng Việt, không sử dụng tiếng Anh hay bất kỳ ngôn ngữ nào khác.";

pub const MODEL_UNAVAILABLE: &str = "Xin lỗi, hệ thống AI hiện không khả dụng.";
pub const GENERATION_FAILED: &str = "Xin lỗi, đã có lỗi xảy ra khi tạo câu trả lời.";
pub const EMPTY_QUESTION: &str = "Vui lòng nhập câu hỏi của bạn.";
pub const SEARCH_OUTAGE: &str =
    "Xin lỗi, hệ thống tìm kiếm đang gặp sự cố. Vui lòng thử lại sau.";
pub const NO_MATCH: &str = "Xin lỗi, tôi không tìm thấy thông tin phù hợp với câu hỏi của bạn. Vui lòng liên hệ tổng đài 1900 6484 để được hỗ trợ tốt hơn.";

/// Numbered context block, one paragraph per document in retrieval order.
pub fn format_context(docs: &[RetrievedDocument]) -> String {
    docs.iter()
        .enumerate()
        .map(|(i, doc)| format!("Câu trả lời thứ {} được tìm thấy trong DB: {}", i + 1, doc.answer))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[derive(Clone)]
pub struct AnswerGenerator {
    llm: Arc<dyn LanguageModel>,
}

impl AnswerGenerator {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    /// Empty output is reported as `Error::Inference`.
    pub async fn try_generate(&self, context: &str, question: &str) -> Result<String> {
        let prompt = ANSWER_PROMPT
            .replace("{context}", context)
            .replace("{question}", question);
        let text = self
            .llm
            .complete(&[ChatMessage::user(prompt)], CompletionOptions::precise())
            .await?;

        let text = text.trim();
        if text.is_empty() {
            return Err(Error::Inference("model returned an empty answer".into()));
        }
        Ok(text.to_string())
    }

    /// Like `try_generate`, with failures replaced by a user-facing apology.
    pub async fn generate(&self, context: &str, question: &str) -> String {
        match self.try_generate(context, question).await {
            Ok(text) => text,
            Err(e) if e.is_unavailable() => {
                warn!("No language model configured: {}", e);
                MODEL_UNAVAILABLE.to_string()
            }
            Err(e) => {
                error!("Answer generation failed: {}", e);
                GENERATION_FAILED.to_string()
            }
        }
    }
}

#[derive(Clone)]
pub struct FaqPipeline {
    retriever: KnowledgeRetriever,
    generator: AnswerGenerator,
    top_k: usize,
}

impl FaqPipeline {
    pub fn new(retriever: KnowledgeRetriever, generator: AnswerGenerator, top_k: usize) -> Self {
        Self {
            retriever,
            generator,
            top_k,
        }
    }

    pub fn retriever(&self) -> &KnowledgeRetriever {
        &self.retriever
    }

    pub async fn answer(&self, message: &str) -> FaqAnswer {
        let question = message.trim();
        if question.is_empty() {
            return FaqAnswer {
                success: false,
                message: EMPTY_QUESTION.into(),
                user_question: message.to_string(),
                relevant_docs_count: None,
                error: None,
            };
        }

        let docs = match self.retriever.retrieve(question, self.top_k).await {
            Ok(docs) => docs,
            Err(e) => {
                error!("FAQ retrieval failed: {}", e);
                return FaqAnswer {
                    success: false,
                    message: SEARCH_OUTAGE.into(),
                    user_question: message.to_string(),
                    relevant_docs_count: None,
                    error: Some(format!("Lỗi kết nối cơ sở dữ liệu vector: {}", e)),
                };
            }
        };

        let Some(best) = docs.first() else {
            info!("No FAQ documents for {:?}", question);
            return FaqAnswer {
                success: true,
                message: NO_MATCH.into(),
                user_question: message.to_string(),
                relevant_docs_count: Some(0),
                error: None,
            };
        };

        let context = format_context(&docs);
        let answer = match self.generator.try_generate(&context, question).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Falling back to stored answer: {}", e);
                format!("Dựa trên thông tin FAQ: {}", best.answer)
            }
        };

        FaqAnswer {
            success: true,
            message: answer,
            user_question: message.to_string(),
            relevant_docs_count: Some(docs.len()),
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ndarray::{array, Array1};
    use parking_lot::Mutex;
    use snit_infer::{Embedder, EmbeddingResult, NoopEmbedder};
    use snit_resolve::{FaqEntry, MemoryIndex, VectorIndex};

    struct UnitEmbedder;

    #[async_trait]
    impl Embedder for UnitEmbedder {
        async fn embed(&self, _text: &str) -> Result<EmbeddingResult> {
            Ok(EmbeddingResult {
                embedding: array![1.0, 0.0],
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

    /// Returns `reply`, or fails when it is `None`; records prompts.
    struct RecordingModel {
        reply: Option<String>,
        prompts: Mutex<Vec<String>>,
    }

    impl RecordingModel {
        fn new(reply: Option<&str>) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.map(str::to_string),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LanguageModel for RecordingModel {
        async fn complete(&self, messages: &[ChatMessage], _: CompletionOptions) -> Result<String> {
            self.prompts.lock().push(messages[0].content.clone());
            self.reply
                .clone()
                .ok_or_else(|| Error::Http("API error 500".into()))
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    fn doc(answer: &str) -> RetrievedDocument {
        RetrievedDocument {
            question: String::new(),
            category: String::new(),
            answer: answer.into(),
            score: 0.9,
        }
    }

    async fn index_with(answers: &[&str]) -> Arc<MemoryIndex> {
        let index = Arc::new(MemoryIndex::new(2));
        let entries: Vec<FaqEntry> = answers
            .iter()
            .map(|a| FaqEntry {
                question: format!("q {}", a),
                category: "Chung".into(),
                answer: a.to_string(),
            })
            .collect();
        let vectors: Vec<Array1<f32>> = answers.iter().map(|_| array![1.0, 0.0]).collect();
        index.insert(&entries, &vectors).await.unwrap();
        index
    }

    fn pipeline(index: Arc<MemoryIndex>, model: Arc<RecordingModel>, top_k: usize) -> FaqPipeline {
        FaqPipeline::new(
            KnowledgeRetriever::new(Arc::new(UnitEmbedder), index),
            AnswerGenerator::new(model),
            top_k,
        )
    }

    #[test]
    fn test_format_context() {
        let context = format_context(&[doc("Hoàn tiền trong 7 ngày."), doc("Liên hệ 1900 6484.")]);
        assert_eq!(
            context,
            "Câu trả lời thứ 1 được tìm thấy trong DB: Hoàn tiền trong 7 ngày.\n\nCâu trả lời thứ 2 được tìm thấy trong DB: Liên hệ 1900 6484."
        );
        assert_eq!(format_context(&[]), "");
    }

    #[tokio::test]
    async fn test_generate_fallbacks() {
        struct Unconfigured;

        #[async_trait]
        impl LanguageModel for Unconfigured {
            async fn complete(&self, _: &[ChatMessage], _: CompletionOptions) -> Result<String> {
                Err(Error::Unavailable("no LLM provider configured".into()))
            }

            fn is_available(&self) -> bool {
                false
            }
        }

        let generator = AnswerGenerator::new(Arc::new(Unconfigured));
        assert_eq!(generator.generate("ctx", "q").await, MODEL_UNAVAILABLE);

        let generator = AnswerGenerator::new(RecordingModel::new(None));
        assert_eq!(generator.generate("ctx", "q").await, GENERATION_FAILED);

        let generator = AnswerGenerator::new(RecordingModel::new(Some("   ")));
        assert!(generator.try_generate("ctx", "q").await.is_err());
    }

    #[tokio::test]
    async fn test_prompt_embeds_context_and_question() {
        let model = RecordingModel::new(Some(" Được mang 20kg. "));
        let generator = AnswerGenerator::new(model.clone());
        let text = generator.generate("Câu trả lời thứ 1 được tìm thấy trong DB: 20kg", "hành lý?").await;
        assert_eq!(text, "Được mang 20kg.");

        let prompt = model.prompts.lock()[0].clone();
        assert!(prompt.contains("<context>\nCâu trả lời thứ 1 được tìm thấy trong DB: 20kg\n</context>"));
        assert!(prompt.contains("<question>\nhành lý?\n</question>"));
    }

    #[tokio::test]
    async fn test_empty_question() {
        let model = RecordingModel::new(Some("x"));
        let answer = pipeline(index_with(&["a"]).await, model.clone(), 1).answer("   ").await;
        assert!(!answer.success);
        assert_eq!(answer.message, EMPTY_QUESTION);
        assert!(model.prompts.lock().is_empty());
    }

    #[tokio::test]
    async fn test_search_outage() {
        let pipeline = FaqPipeline::new(
            KnowledgeRetriever::new(Arc::new(NoopEmbedder::new(2)), Arc::new(MemoryIndex::new(2))),
            AnswerGenerator::new(RecordingModel::new(Some("x"))),
            1,
        );
        let answer = pipeline.answer("giờ chạy xe?").await;
        assert!(!answer.success);
        assert_eq!(answer.message, SEARCH_OUTAGE);
        assert!(answer
            .error
            .unwrap()
            .starts_with("Lỗi kết nối cơ sở dữ liệu vector:"));
    }

    #[tokio::test]
    async fn test_no_documents_points_to_hotline() {
        let model = RecordingModel::new(Some("x"));
        let answer = pipeline(index_with(&[]).await, model.clone(), 1).answer("xe có wifi?").await;
        assert!(answer.success);
        assert_eq!(answer.relevant_docs_count, Some(0));
        assert!(answer.message.contains("1900 6484"));
        assert!(model.prompts.lock().is_empty());
    }

    #[tokio::test]
    async fn test_context_uses_all_documents() {
        let model = RecordingModel::new(Some("Bạn có thể hủy trước 24 giờ."));
        let answer = pipeline(index_with(&["Hủy trước 24h.", "Phí hủy 10%."]).await, model.clone(), 2)
            .answer("hủy vé thế nào?")
            .await;
        assert!(answer.success);
        assert_eq!(answer.relevant_docs_count, Some(2));
        assert_eq!(answer.message, "Bạn có thể hủy trước 24 giờ.");

        let prompt = model.prompts.lock()[0].clone();
        assert!(prompt.contains("Câu trả lời thứ 1"));
        assert!(prompt.contains("Câu trả lời thứ 2"));
    }

    #[tokio::test]
    async fn test_generator_failure_uses_stored_answer() {
        let answer = pipeline(index_with(&["Hành lý tối đa 20kg."]).await, RecordingModel::new(None), 1)
            .answer("hành lý?")
            .await;
        assert!(answer.success);
        assert_eq!(answer.message, "Dựa trên thông tin FAQ: Hành lý tối đa 20kg.");
        assert_eq!(answer.relevant_docs_count, Some(1));
    }
}
