use crate::error::{anthropic_error_payload, ProxyError};
use crate::protocol::anthropic::response_encoder::{encode_tool_use_block, encode_usage};
use crate::protocol::anthropic::{
    AnthropicDelta, AnthropicMessageDeltaBody, AnthropicMessageStart, AnthropicStreamEvent,
    AnthropicUsage,
};
use crate::protocol::ollama::{ChatChunk, ToolCall};
use crate::util::next_message_id;

/// Index of the thinking block when one is opened.
const THINKING_BLOCK_INDEX: usize = 0;
/// Tool blocks live at a disjoint index range so they can never collide with
/// the thinking/text blocks at 0–1.
const TOOL_BLOCK_INDEX_BASE: usize = 10;

/// Re-frames the backend's NDJSON chunk stream as the Anthropic block
/// lifecycle event protocol.
///
/// The Anthropic wire contract requires explicit `content_block_start` /
/// `content_block_stop` events, so this framer tracks which block is open
/// across chunks and never starts the same index twice. Thinking increments
/// arriving after the text block has opened are dropped rather than given a
/// second block. One instance per active stream; discarded after
/// `message_stop`.
pub struct AnthropicStreamFramer {
    id: String,
    model: String,
    thinking_open: bool,
    thinking_opened_ever: bool,
    text_open: bool,
    text_index: usize,
    /// Latest full tool-call list; the native side resends the accumulated
    /// list on every chunk that carries any.
    tool_calls: Vec<ToolCall>,
}

impl AnthropicStreamFramer {
    #[must_use]
    pub fn new(model: &str) -> Self {
        Self {
            id: next_message_id(),
            model: model.to_string(),
            thinking_open: false,
            thinking_opened_ever: false,
            text_open: false,
            text_index: 0,
            tool_calls: Vec::new(),
        }
    }

    /// `message_start` with an empty content array and zero usage.
    #[must_use]
    pub fn open(&self) -> String {
        AnthropicStreamEvent::MessageStart {
            message: AnthropicMessageStart {
                id: self.id.clone(),
                type_: "message".to_string(),
                role: "assistant".to_string(),
                model: self.model.clone(),
                content: Vec::new(),
                usage: AnthropicUsage {
                    input_tokens: 0,
                    output_tokens: 0,
                },
            },
        }
        .to_frame()
    }

    /// Translate one native chunk into zero or more SSE frames, maintaining
    /// block-lifecycle state. The terminal chunk closes any open block, emits
    /// tool blocks, `message_delta`, and `message_stop`.
    pub fn on_chunk(&mut self, chunk: &ChatChunk) -> Vec<String> {
        let mut frames = Vec::new();

        if let Some(message) = &chunk.message {
            if let Some(thinking) = message.thinking.as_deref().filter(|t| !t.is_empty()) {
                self.emit_thinking(thinking, &mut frames);
            }
            if !message.content.is_empty() {
                self.emit_text(&message.content, &mut frames);
            }
            if let Some(calls) = message.tool_calls.as_ref().filter(|c| !c.is_empty()) {
                self.tool_calls = calls.clone();
            }
        }

        if chunk.done {
            self.emit_terminal(chunk, &mut frames);
        }

        frames
    }

    /// A single `error` event for open-failure or mid-stream transport
    /// failure; the stream terminates cleanly after it.
    #[must_use]
    pub fn error_frame(err: &ProxyError) -> String {
        let payload = anthropic_error_payload(err);
        let mut frame = String::with_capacity(32 + payload.to_string().len());
        frame.push_str("event: error\ndata: ");
        frame.push_str(&payload.to_string());
        frame.push_str("\n\n");
        frame
    }

    fn emit_thinking(&mut self, thinking: &str, frames: &mut Vec<String>) {
        // The backend emits all thinking before any text. A late increment
        // has no block left to land in (index 0 may already belong to the
        // text block) and is dropped.
        if !self.thinking_open && (self.thinking_opened_ever || self.text_open) {
            return;
        }
        if !self.thinking_open {
            frames.push(
                AnthropicStreamEvent::ContentBlockStart {
                    index: THINKING_BLOCK_INDEX,
                    content_block: crate::protocol::anthropic::AnthropicContentBlock::Thinking {
                        thinking: String::new(),
                    },
                }
                .to_frame(),
            );
            self.thinking_open = true;
            self.thinking_opened_ever = true;
        }
        frames.push(
            AnthropicStreamEvent::ContentBlockDelta {
                index: THINKING_BLOCK_INDEX,
                delta: AnthropicDelta::ThinkingDelta {
                    thinking: thinking.to_string(),
                },
            }
            .to_frame(),
        );
    }

    fn emit_text(&mut self, text: &str, frames: &mut Vec<String>) {
        if !self.text_open {
            if self.thinking_open {
                frames.push(
                    AnthropicStreamEvent::ContentBlockStop {
                        index: THINKING_BLOCK_INDEX,
                    }
                    .to_frame(),
                );
                self.thinking_open = false;
            }
            self.text_index = usize::from(self.thinking_opened_ever);
            frames.push(
                AnthropicStreamEvent::ContentBlockStart {
                    index: self.text_index,
                    content_block: crate::protocol::anthropic::AnthropicContentBlock::Text {
                        text: String::new(),
                    },
                }
                .to_frame(),
            );
            self.text_open = true;
        }
        frames.push(
            AnthropicStreamEvent::ContentBlockDelta {
                index: self.text_index,
                delta: AnthropicDelta::TextDelta {
                    text: text.to_string(),
                },
            }
            .to_frame(),
        );
    }

    fn emit_terminal(&mut self, chunk: &ChatChunk, frames: &mut Vec<String>) {
        if self.thinking_open {
            frames.push(
                AnthropicStreamEvent::ContentBlockStop {
                    index: THINKING_BLOCK_INDEX,
                }
                .to_frame(),
            );
            self.thinking_open = false;
        }
        if self.text_open {
            frames.push(
                AnthropicStreamEvent::ContentBlockStop {
                    index: self.text_index,
                }
                .to_frame(),
            );
            self.text_open = false;
        }

        for (position, call) in self.tool_calls.iter().enumerate() {
            let index = TOOL_BLOCK_INDEX_BASE + position;
            frames.push(
                AnthropicStreamEvent::ContentBlockStart {
                    index,
                    content_block: encode_tool_use_block(call),
                }
                .to_frame(),
            );
            frames.push(AnthropicStreamEvent::ContentBlockStop { index }.to_frame());
        }

        let stop_reason = if !self.tool_calls.is_empty()
            || chunk.done_reason.as_deref() == Some("tool_calls")
        {
            "tool_use"
        } else if chunk.truncated() {
            "max_tokens"
        } else {
            "end_turn"
        };

        frames.push(
            AnthropicStreamEvent::MessageDelta {
                delta: AnthropicMessageDeltaBody {
                    stop_reason: stop_reason.to_string(),
                    stop_sequence: None,
                },
                usage: encode_usage(chunk),
            }
            .to_frame(),
        );
        frames.push(AnthropicStreamEvent::MessageStop {}.to_frame());
    }
}

impl crate::stream::ChunkFramer for AnthropicStreamFramer {
    fn on_chunk(&mut self, chunk: &ChatChunk) -> Vec<String> {
        AnthropicStreamFramer::on_chunk(self, chunk)
    }

    fn abort_frames(&mut self, err: &ProxyError) -> Vec<String> {
        vec![Self::error_frame(err)]
    }
}
