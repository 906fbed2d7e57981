use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::response::{IntoResponse, Response};

use crate::api::respond::{sse_fixed_frames, sse_response, verbatim_upstream_response};
use crate::error::{into_axum_response, ProxyError};
use crate::protocol::anthropic::decoder::decode_anthropic_request;
use crate::protocol::anthropic::response_encoder::encode_anthropic_response;
use crate::protocol::anthropic::stream::AnthropicStreamFramer;
use crate::protocol::anthropic::AnthropicRequest;
use crate::protocol::Dialect;
use crate::state::AppState;
use crate::stream::FramedChatStream;
use crate::upstream::{ChatOutcome, StreamOutcome};

/// `POST /v1/messages` — Anthropic-dialect chat, streaming or not.
pub async fn messages_handler(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let request: AnthropicRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(err) => {
            return into_axum_response(
                &ProxyError::InvalidRequest(format!("invalid request body: {err}")),
                Dialect::Anthropic,
            );
        }
    };

    let native = decode_anthropic_request(&request, &state.config);
    tracing::info!(
        model = %native.model,
        stream = native.stream,
        think = native.think.is_some(),
        "anthropic messages request"
    );

    if native.stream {
        return match state.upstream.chat_stream(&native).await {
            Ok(StreamOutcome::Open(response)) => {
                let framer = AnthropicStreamFramer::new(&native.model);
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
                sse_fixed_frames(vec![AnthropicStreamFramer::error_frame(&err)])
            }
            Err(err) => into_axum_response(&err, Dialect::Anthropic),
        };
    }

    match state.upstream.chat(&native).await {
        Ok(ChatOutcome::Success(chunk)) => {
            axum::Json(encode_anthropic_response(&chunk, &native.model)).into_response()
        }
        Ok(ChatOutcome::Rejected { status, body }) => {
            tracing::warn!(status, "backend rejected chat request");
            verbatim_upstream_response(status, body)
        }
        Err(err) => into_axum_response(&err, Dialect::Anthropic),
    }
}
