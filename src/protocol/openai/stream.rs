use crate::error::{openai_error_payload, ProxyError};
use crate::protocol::ollama::{ChatChunk, ToolCall};
use crate::protocol::openai::{
    OpenAiDelta, OpenAiStreamChoice, OpenAiStreamChunk, OpenAiStreamToolCall, OpenAiUsage,
};
use crate::protocol::openai::response_encoder::{encode_tool_call, encode_usage};
use crate::util::{next_chat_id, unix_now_secs};

/// Stream-termination marker required by the `OpenAI` SSE contract.
pub const DONE_FRAME: &str = "data: [DONE]\n\n";

/// Re-frames the backend's NDJSON chunk stream as `OpenAI` chat-completion
/// SSE chunks.
///
/// One instance per active stream. The native side resends the whole
/// accumulated tool-call list on each chunk that carries any, so only the
/// latest list is remembered; seeing one at all flips the terminal
/// finish_reason to `tool_calls`.
pub struct OpenAiStreamFramer {
    id: String,
    model: String,
    created: u64,
    saw_tool_calls: bool,
}

impl OpenAiStreamFramer {
    #[must_use]
    pub fn new(model: &str) -> Self {
        Self {
            id: next_chat_id(),
            model: model.to_string(),
            created: unix_now_secs(),
            saw_tool_calls: false,
        }
    }

    /// The role-announcing first chunk, emitted before any content.
    #[must_use]
    pub fn open(&self) -> String {
        self.frame(
            OpenAiDelta {
                role: Some("assistant".to_string()),
                ..Default::default()
            },
            None,
            None,
        )
    }

    /// Translate one native chunk into zero or more SSE frames. The terminal
    /// chunk yields the finish/usage frame followed by the `[DONE]` marker.
    pub fn on_chunk(&mut self, chunk: &ChatChunk) -> Vec<String> {
        let mut frames = Vec::new();

        if let Some(message) = &chunk.message {
            if let Some(thinking) = message.thinking.as_deref().filter(|t| !t.is_empty()) {
                frames.push(self.frame(
                    OpenAiDelta {
                        reasoning_content: Some(thinking.to_string()),
                        ..Default::default()
                    },
                    None,
                    None,
                ));
            }
            if !message.content.is_empty() {
                frames.push(self.frame(
                    OpenAiDelta {
                        content: Some(message.content.clone()),
                        ..Default::default()
                    },
                    None,
                    None,
                ));
            }
            if let Some(calls) = message.tool_calls.as_ref().filter(|c| !c.is_empty()) {
                self.saw_tool_calls = true;
                frames.push(self.frame(
                    OpenAiDelta {
                        tool_calls: Some(encode_stream_tool_calls(calls)),
                        ..Default::default()
                    },
                    None,
                    None,
                ));
            }
        }

        if chunk.done {
            let finish_reason = if self.saw_tool_calls
                || chunk.done_reason.as_deref() == Some("tool_calls")
            {
                "tool_calls"
            } else if chunk.truncated() {
                "length"
            } else {
                "stop"
            };
            frames.push(self.frame(
                OpenAiDelta::default(),
                Some(finish_reason.to_string()),
                Some(encode_usage(chunk)),
            ));
            frames.push(DONE_FRAME.to_string());
        }

        frames
    }

    /// A single error frame for a stream that failed at open, shaped like the
    /// non-streaming error body. The caller follows it with [`DONE_FRAME`].
    #[must_use]
    pub fn error_frame(err: &ProxyError) -> String {
        sse_data_frame(&openai_error_payload(err))
    }

    fn frame(
        &self,
        delta: OpenAiDelta,
        finish_reason: Option<String>,
        usage: Option<OpenAiUsage>,
    ) -> String {
        sse_data_frame(&OpenAiStreamChunk {
            id: self.id.clone(),
            object: "chat.completion.chunk".to_string(),
            created: self.created,
            model: self.model.clone(),
            choices: vec![OpenAiStreamChoice {
                index: 0,
                delta,
                finish_reason,
            }],
            usage,
        })
    }
}

impl crate::stream::ChunkFramer for OpenAiStreamFramer {
    fn on_chunk(&mut self, chunk: &ChatChunk) -> Vec<String> {
        OpenAiStreamFramer::on_chunk(self, chunk)
    }

    // A failed backend read still ends with the completion marker so the
    // client's SSE parser is never left in a partial state.
    fn abort_frames(&mut self, _err: &ProxyError) -> Vec<String> {
        vec![DONE_FRAME.to_string()]
    }
}

fn encode_stream_tool_calls(calls: &[ToolCall]) -> Vec<OpenAiStreamToolCall> {
    calls
        .iter()
        .enumerate()
        .map(|(index, call)| {
            let encoded = encode_tool_call(call);
            OpenAiStreamToolCall {
                index: u32::try_from(index).unwrap_or(u32::MAX),
                id: encoded.id,
                type_: encoded.type_,
                function: encoded.function,
            }
        })
        .collect()
}

fn sse_data_frame<T: serde::Serialize>(payload: &T) -> String {
    let json = serde_json::to_string(payload).unwrap_or_else(|_| "{}".to_string());
    let mut frame = String::with_capacity(8 + json.len());
    frame.push_str("data: ");
    frame.push_str(&json);
    frame.push_str("\n\n");
    frame
}
