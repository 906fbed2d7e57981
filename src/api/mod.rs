mod chat;
mod health;
mod messages;
mod models;
mod respond;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Assemble the gateway's route table.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/v1/models", get(models::list_models_handler))
        .route("/v1/chat/completions", post(chat::chat_completions_handler))
        .route("/v1/responses", post(chat::chat_completions_handler))
        .route("/v1/messages", post(messages::messages_handler))
        .with_state(state)
}
