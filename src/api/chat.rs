use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::response::{IntoResponse, Response};

use crate::api::respond::{sse_fixed_frames, sse_response, verbatim_upstream_response};
use crate::error::{into_axum_response, ProxyError};
use crate::protocol::openai::decoder::decode_openai_request;
use crate::protocol::openai::response_encoder::encode_openai_response;
use crate::protocol::openai::stream::{OpenAiStreamFramer, DONE_FRAME};
use crate::protocol::openai::OpenAiChatRequest;
use crate::protocol::Dialect;
use crate::state::AppState;
use crate::stream::FramedChatStream;
use crate::upstream::{ChatOutcome, StreamOutcome};

/// `POST /v1/chat/completions` — OpenAI-dialect chat, streaming or not.
pub async fn chat_completions_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Response {
    let request: OpenAiChatRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(err) => {
            return into_axum_response(
                &ProxyError::InvalidRequest(format!("invalid request body: {err}")),
                Dialect::OpenAi,
            );
        }
    };

    let native = decode_openai_request(&request, &state.config);
    tracing::info!(
        model = %native.model,
        stream = native.stream,
        think = native.think.is_some(),
        "openai chat request"
    );

    if native.stream {
        return match state.upstream.chat_stream(&native).await {
            Ok(StreamOutcome::Open(response)) => {
                let framer = OpenAiStreamFramer::new(&native.model);
                let open = framer.open();
                let driver = FramedChatStream::new(
                    response,
                    framer,
                    vec![open],
                    state.upstream.read_timeout(),
                );
                sse_response(driver.into_body())
            }
            Ok(StreamOutcome::Rejected { status, body }) => {
                tracing::warn!(status, "backend rejected stream open");
                let err = ProxyError::Upstream {
                    status,
                    message: body,
                };
                sse_fixed_frames(vec![
                    OpenAiStreamFramer::error_frame(&err),
                    DONE_FRAME.to_string(),
                ])
            }
            Err(err) => into_axum_response(&err, Dialect::OpenAi),
        };
    }

    match state.upstream.chat(&native).await {
        Ok(ChatOutcome::Success(chunk)) => {
            axum::Json(encode_openai_response(&chunk, &native.model)).into_response()
        }
        Ok(ChatOutcome::Rejected { status, body }) => {
            tracing::warn!(status, "backend rejected chat request");
            verbatim_upstream_response(status, body)
        }
        Err(err) => into_axum_response(&err, Dialect::OpenAi),
    }
}
