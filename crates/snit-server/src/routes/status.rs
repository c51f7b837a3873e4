//! Service status and ticket passthrough.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tracing::error;

use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/status", get(get_status))
        .route("/tickets", get(list_tickets))
}

/// GET /api/status: which collaborators can serve requests.
async fn get_status(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let settings = state.router.settings();
    Json(json!({
        "embedderAvailable": state.embedder.is_available(),
        "embeddingDimension": state.embedder.dimension(),
        "vectorIndexConnected": state.index.is_connected(),
        "collection": state.config.vector_index.collection,
        "llmAvailable": state.llm.is_available(),
        "llmProvider": state.llm_provider,
        "ticketBackendConfigured": state.config.backend_url.is_some(),
        "chatHistoryEnabled": state.history.is_some(),
        "fastPathThreshold": settings.fast_path_threshold,
        "faqTopK": settings.faq_top_k,
    }))
}

/// GET /api/tickets: passthrough of the backend ticket list.
async fn list_tickets(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.tickets.list().await {
        Ok(tickets) => (StatusCode::OK, Json(json!(tickets))),
        Err(e) => {
            error!("Ticket list failed: {}", e);
            let status = if e.is_unavailable() {
                StatusCode::SERVICE_UNAVAILABLE
            } else {
                StatusCode::BAD_GATEWAY
            };
            (status, Json(json!({ "error": e.to_string() })))
        }
    }
}
