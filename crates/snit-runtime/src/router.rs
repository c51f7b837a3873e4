//! Two-stage message router.
//!
//! A near-duplicate FAQ question (cosine score at or above the fast-path
//! threshold) is answered as FAQ without asking the model. Everything else
//! goes through a binary model classification.

use std::sync::Arc;

use snit_chat::{ChatMessage, CompletionOptions, LanguageModel};
use snit_core::{config, Result, SnitConfig};
use snit_resolve::KnowledgeRetriever;
use tracing::{debug, info, warn};

use crate::after_service::AfterServiceHandler;
use crate::extractor::IntentExtractor;
use crate::faq::{AnswerGenerator, FaqPipeline, EMPTY_QUESTION};
use crate::tickets::TicketService;
use crate::types::{Route, RouteDecision, RouteRequest, ServiceResponse};

const ROUTE_PROMPT: &str = "Bạn là AI phân loại câu hỏi của người dùng thành một trong hai loại: `faq` hoặc `after_service`.\n\n\
- `faq`: là những câu hỏi tra cứu thông tin như chính sách, hoàn tiền, hành lý, giờ chạy...\n\
- `after_service`: là những yêu cầu xử lý sau bán như: đổi vé, huỷ vé, bị trừ tiền nhiều lần, xuất hoá đơn, khiếu nại...\n\n\
Chỉ trả về một trong hai loại trên, không giải thích gì thêm.\n\n";

/// Tunables taken from `SnitConfig`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineSettings {
    pub fast_path_threshold: f64,
    pub faq_top_k: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            fast_path_threshold: config::DEFAULT_FAST_PATH_THRESHOLD,
            faq_top_k: config::DEFAULT_FAQ_TOP_K,
        }
    }
}

impl From<&SnitConfig> for PipelineSettings {
    fn from(config: &SnitConfig) -> Self {
        Self {
            fast_path_threshold: config.fast_path_threshold,
            faq_top_k: config.faq_top_k,
        }
    }
}

#[derive(Clone)]
pub struct Router {
    retriever: KnowledgeRetriever,
    llm: Arc<dyn LanguageModel>,
    faq: FaqPipeline,
    after_service: AfterServiceHandler,
    settings: PipelineSettings,
}

impl Router {
    pub fn new(
        retriever: KnowledgeRetriever,
        llm: Arc<dyn LanguageModel>,
        tickets: Arc<dyn TicketService>,
        settings: PipelineSettings,
    ) -> Self {
        let faq = FaqPipeline::new(
            retriever.clone(),
            AnswerGenerator::new(llm.clone()),
            settings.faq_top_k,
        );
        let after_service = AfterServiceHandler::new(IntentExtractor::new(llm.clone()), tickets);
        Self {
            retriever,
            llm,
            faq,
            after_service,
            settings,
        }
    }

    pub fn faq(&self) -> &FaqPipeline {
        &self.faq
    }

    pub fn after_service(&self) -> &AfterServiceHandler {
        &self.after_service
    }

    pub fn settings(&self) -> PipelineSettings {
        self.settings
    }

    /// Decide how a message should be handled.
    ///
    /// Fast-path failures fall through to the model; a model failure is
    /// returned as `Err`.
    pub async fn decide(&self, message: &str) -> Result<RouteDecision> {
        match self.retriever.best_match(message).await {
            Ok(Some(doc)) if doc.score >= self.settings.fast_path_threshold => {
                info!("Fast path matched FAQ (score={:.2})", doc.score);
                return Ok(RouteDecision::FastPath { score: doc.score });
            }
            Ok(Some(doc)) => debug!("Best FAQ score {:.2} below threshold", doc.score),
            Ok(None) => debug!("No FAQ candidate for fast path"),
            Err(e) => warn!("Fast path unavailable, asking the model: {}", e),
        }

        let messages = [ChatMessage::system(ROUTE_PROMPT), ChatMessage::user(message)];
        let raw = self
            .llm
            .complete(&messages, CompletionOptions::precise())
            .await?;
        let label = raw.trim().to_lowercase();
        info!("Model route label: {}", label);

        Ok(match Route::from_label(&label) {
            Some(route) => RouteDecision::Model(route),
            None => {
                warn!("Unrecognized route label {:?}, treating as general inquiry", label);
                RouteDecision::Unrecognized { raw: label }
            }
        })
    }

    pub async fn classify(&self, message: &str) -> Result<Route> {
        Ok(self.decide(message).await?.route())
    }

    /// Route and answer one message. Failures come back as error-shaped responses.
    pub async fn handle(&self, request: RouteRequest) -> ServiceResponse {
        let RouteRequest {
            message,
            chat_id,
            history,
        } = request;
        debug!("Routing message with {} prior turns", history.len());

        // One normalized text for every stage, so its embedding is computed once.
        let message = message.trim();
        if message.is_empty() {
            let mut response = ServiceResponse::new(message, "error", EMPTY_QUESTION);
            response.error = Some("empty message".into());
            return response.with_chat_id(chat_id);
        }

        let response = match self.decide(message).await {
            Ok(RouteDecision::FastPath { .. }) | Ok(RouteDecision::Model(Route::Faq)) => {
                ServiceResponse::from_faq(self.faq.answer(message).await)
            }
            Ok(RouteDecision::Model(Route::AfterService)) => self.after_service.handle(message).await,
            Ok(RouteDecision::Unrecognized { .. }) => self.after_service.general_inquiry(message),
            Err(e) => {
                warn!("Route classification failed: {}", e);
                ServiceResponse::failure(message, e)
            }
        };
        response.with_chat_id(chat_id)
    }
}
