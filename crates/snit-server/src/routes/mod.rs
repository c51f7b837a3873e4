//! HTTP route handlers.

pub mod chat;
pub mod pipelines;
pub mod status;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the main Axum router with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(chat::routes())
        .merge(pipelines::routes())
        .merge(status::routes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use snit_chat::{HttpLanguageModel, LLMConfig};
    use snit_core::SnitConfig;
    use snit_infer::NoopEmbedder;
    use snit_resolve::MemoryIndex;
    use snit_runtime::HttpTicketService;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    use crate::history::HistoryClient;

    /// No embedder key, no LLM provider, no backend.
    fn offline_app(dir: &tempfile::TempDir) -> Router {
        app_with_history(dir, None)
    }

    fn app_with_history(dir: &tempfile::TempDir, history: Option<HistoryClient>) -> Router {
        let config = SnitConfig::from_lookup(dir.path(), |_| None).unwrap();
        let client = reqwest::Client::new();
        let state = AppState::new(
            config,
            Arc::new(NoopEmbedder::new(4)),
            Arc::new(MemoryIndex::new(4)),
            Arc::new(HttpLanguageModel::new(client.clone(), &LLMConfig::default())),
            Arc::new(HttpTicketService::new(client, None).unwrap()),
            history,
        );
        build_router(Arc::new(state))
    }

    /// A chat-history backend on a local port that counts the requests it gets.
    async fn counting_backend() -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let backend = Router::new().fallback(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                axum::Json(json!({"data": {"id": "chat-1", "messages": []}}))
            }
        });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, backend).await.unwrap();
        });
        (format!("http://{}", addr), hits)
    }

    fn post(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_chat_empty_message() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = send(offline_app(&dir), post("/api/chat", json!({"message": ""}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["intent"], "error");
        assert_eq!(body["response"], "Vui lòng nhập câu hỏi của bạn.");
    }

    #[tokio::test]
    async fn test_blank_message_skips_history() {
        let dir = tempfile::tempdir().unwrap();
        let (url, hits) = counting_backend().await;
        let history = || Some(HistoryClient::new(reqwest::Client::new(), &url).unwrap());

        let (status, body) = send(
            app_with_history(&dir, history()),
            post("/api/chat", json!({"message": "  \n", "chat_id": "abc"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["intent"], "error");
        assert_eq!(body["chat_id"], "abc");
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        let (_, body) = send(
            app_with_history(&dir, history()),
            post("/api/chat", json!({"message": "Tôi muốn hủy vé"})),
        )
        .await;
        assert_eq!(body["chat_id"], "chat-1");
        // create, user turn, assistant turn
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_chat_degrades_without_model() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = send(
            offline_app(&dir),
            post("/api/chat", json!({"message": "Tôi muốn hủy vé VX1", "chat_id": "abc"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["intent"], "error");
        assert_eq!(body["chat_id"], "abc");
        assert!(body["error"].as_str().unwrap().contains("no LLM provider"));
        assert_eq!(body["classification"]["intent"], "error");
    }

    #[tokio::test]
    async fn test_chat_placeholder_id_not_echoed() {
        let dir = tempfile::tempdir().unwrap();
        let (_, body) = send(
            offline_app(&dir),
            post("/api/chat", json!({"message": "", "chat_id": "undefined"})),
        )
        .await;
        assert!(body.get("chat_id").is_none());
    }

    #[tokio::test]
    async fn test_faq_reports_search_outage() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) =
            send(offline_app(&dir), post("/api/faq", json!({"message": "Giờ xe chạy?"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], false);
        assert_eq!(body["user_question"], "Giờ xe chạy?");
        assert!(body["error"]
            .as_str()
            .unwrap()
            .starts_with("Lỗi kết nối cơ sở dữ liệu vector"));
    }

    #[tokio::test]
    async fn test_after_service_falls_back_to_menu() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = send(
            offline_app(&dir),
            post("/api/after-service", json!({"message": "Đổi vé VX1 sang 10:00 AM"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["intent"], "general_inquiry");
        assert!(body["response"].as_str().unwrap().starts_with("Chúng tôi có thể hỗ trợ bạn"));
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_status() {
        let dir = tempfile::tempdir().unwrap();
        let request = Request::builder().uri("/api/status").body(Body::empty()).unwrap();
        let (status, body) = send(offline_app(&dir), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["embedderAvailable"], false);
        assert_eq!(body["vectorIndexConnected"], true);
        assert_eq!(body["llmAvailable"], false);
        assert_eq!(body["collection"], "faq_vexere");
        assert_eq!(body["faqTopK"], 1);
    }

    #[tokio::test]
    async fn test_tickets_without_backend() {
        let dir = tempfile::tempdir().unwrap();
        let request = Request::builder().uri("/api/tickets").body(Body::empty()).unwrap();
        let (status, body) = send(offline_app(&dir), request).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_malformed_body_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let request = Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, _) = send(offline_app(&dir), request).await;
        assert!(status.is_client_error());
    }
}
