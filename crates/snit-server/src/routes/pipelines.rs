//! Direct access to the FAQ and after-service pipelines, bypassing the router.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use snit_runtime::{FaqAnswer, ServiceResponse};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    #[serde(default)]
    pub message: String,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/faq", post(faq))
        .route("/after-service", post(after_service))
}

/// POST /api/faq
async fn faq(State(state): State<Arc<AppState>>, Json(req): Json<MessageRequest>) -> Json<FaqAnswer> {
    Json(state.router.faq().answer(&req.message).await)
}

/// POST /api/after-service
async fn after_service(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MessageRequest>,
) -> Json<ServiceResponse> {
    Json(state.router.after_service().handle(&req.message).await)
}
