use std::sync::Arc;

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::error::into_axum_response;
use crate::protocol::Dialect;
use crate::state::AppState;

/// Reshape the backend's `/api/tags` listing as an OpenAI-style model list.
pub async fn list_models_handler(State(state): State<Arc<AppState>>) -> Response {
    let tags = match state.upstream.list_tags().await {
        Ok(tags) => tags,
        Err(err) => return into_axum_response(&err, Dialect::OpenAi),
    };

    let data: Vec<_> = tags
        .models
        .iter()
        .map(|model| {
            json!({
                "id": model.name,
                "object": "model",
                "created": 0,
                "owned_by": "ollama",
            })
        })
        .collect();

    axum::Json(json!({"object": "list", "data": data})).into_response()
}
