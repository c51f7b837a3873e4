//! Main chat route: history bookkeeping around the message router.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use snit_runtime::RouteRequest;
use tracing::warn;

use crate::history::normalize_chat_id;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub chat_id: Option<String>,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/chat", post(chat))
}

/// POST /api/chat
async fn chat(State(state): State<Arc<AppState>>, Json(req): Json<ChatRequest>) -> Response {
    let mut chat_id = normalize_chat_id(req.chat_id);
    let mut history = Vec::new();

    // Blank messages are answered without touching the chat history.
    let history_client = state
        .history
        .as_ref()
        .filter(|_| !req.message.trim().is_empty());

    if let Some(client) = history_client {
        match &chat_id {
            None => match client.create_chat().await {
                Ok(id) => chat_id = Some(id),
                Err(e) => warn!("Could not create chat: {}", e),
            },
            Some(id) => match client.messages(id).await {
                Ok(messages) => history = messages,
                Err(e) if e.is_not_found() => {
                    return (
                        StatusCode::NOT_FOUND,
                        Json(serde_json::json!({ "error": "Chat not found" })),
                    )
                        .into_response();
                }
                Err(e) => warn!("Could not load chat {}: {}", id, e),
            },
        }
        if let Some(id) = &chat_id {
            if let Err(e) = client.append(id, "user", &req.message).await {
                warn!("Could not store user message: {}", e);
            }
        }
    }

    let response = state
        .router
        .handle(RouteRequest {
            message: req.message,
            chat_id: chat_id.clone(),
            history,
        })
        .await;

    if let (Some(client), Some(id)) = (history_client, &chat_id) {
        if let Err(e) = client.append(id, "assistant", &response.response).await {
            warn!("Could not store assistant reply: {}", e);
        }
    }

    Json(response).into_response()
}
