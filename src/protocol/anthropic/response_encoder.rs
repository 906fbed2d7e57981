use crate::protocol::anthropic::{
    AnthropicContentBlock, AnthropicResponse, AnthropicUsage,
};
use crate::protocol::ollama::{ChatChunk, ToolCall};
use crate::util::{next_message_id, next_tool_call_id};

/// Map a complete native `/api/chat` response into an Anthropic messages
/// response: thinking block first, then text, then `tool_use` blocks.
#[must_use]
pub fn encode_anthropic_response(native: &ChatChunk, model: &str) -> AnthropicResponse {
    let message = native.message.as_ref();
    let mut content = Vec::new();

    if let Some(thinking) = message
        .and_then(|m| m.thinking.as_deref())
        .filter(|t| !t.is_empty())
    {
        content.push(AnthropicContentBlock::Thinking {
            thinking: thinking.to_string(),
        });
    }

    let text = message.map(|m| m.content.clone()).unwrap_or_default();
    content.push(AnthropicContentBlock::Text { text });

    let tool_calls = message
        .and_then(|m| m.tool_calls.as_deref())
        .unwrap_or_default();
    for call in tool_calls {
        content.push(encode_tool_use_block(call));
    }

    let stop_reason = if !tool_calls.is_empty() {
        "tool_use"
    } else if native.truncated() {
        "max_tokens"
    } else {
        "end_turn"
    };

    AnthropicResponse {
        id: next_message_id(),
        type_: "message".to_string(),
        role: "assistant".to_string(),
        model: model.to_string(),
        content,
        stop_reason: stop_reason.to_string(),
        stop_sequence: None,
        usage: encode_usage(native),
    }
}

/// Token accounting renamed to the Anthropic field vocabulary.
#[must_use]
pub fn encode_usage(native: &ChatChunk) -> AnthropicUsage {
    AnthropicUsage {
        input_tokens: native.prompt_eval_count.unwrap_or(0),
        output_tokens: native.eval_count.unwrap_or(0),
    }
}

/// Re-wrap a native tool call as a `tool_use` block: id defaulted with a
/// `toolu_` prefix, arguments coerced to an object.
#[must_use]
pub fn encode_tool_use_block(call: &ToolCall) -> AnthropicContentBlock {
    AnthropicContentBlock::ToolUse {
        id: call
            .id
            .clone()
            .unwrap_or_else(|| next_tool_call_id("toolu_")),
        name: call.function.name.clone(),
        input: serde_json::Value::Object(call.function.arguments.as_object()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ollama::{ChatMessage, ToolCallArguments, ToolCallFunction};
    use serde_json::json;

    fn native_response(message: ChatMessage) -> ChatChunk {
        ChatChunk {
            message: Some(message),
            done: true,
            done_reason: Some("stop".into()),
            prompt_eval_count: Some(10),
            eval_count: Some(20),
        }
    }

    #[test]
    fn test_plain_response_is_single_text_block() {
        let response = encode_anthropic_response(
            &native_response(ChatMessage {
                role: "assistant".into(),
                content: "hello".into(),
                ..Default::default()
            }),
            "llama3:8b",
        );
        assert!(response.id.starts_with("msg_"));
        assert_eq!(response.stop_reason, "end_turn");
        assert_eq!(response.content.len(), 1);
        assert!(matches!(
            &response.content[0],
            AnthropicContentBlock::Text { text } if text == "hello"
        ));
        assert_eq!(response.usage.input_tokens, 10);
        assert_eq!(response.usage.output_tokens, 20);
    }

    #[test]
    fn test_thinking_block_precedes_text() {
        let response = encode_anthropic_response(
            &native_response(ChatMessage {
                role: "assistant".into(),
                content: "answer".into(),
                thinking: Some("reasoning".into()),
                ..Default::default()
            }),
            "glm-5:cloud",
        );
        assert!(matches!(
            &response.content[0],
            AnthropicContentBlock::Thinking { thinking } if thinking == "reasoning"
        ));
        assert!(matches!(&response.content[1], AnthropicContentBlock::Text { .. }));
    }

    #[test]
    fn test_tool_calls_become_tool_use_blocks_with_object_input() {
        let response = encode_anthropic_response(
            &native_response(ChatMessage {
                role: "assistant".into(),
                content: String::new(),
                tool_calls: Some(vec![ToolCall {
                    id: None,
                    function: ToolCallFunction {
                        name: "get_weather".into(),
                        arguments: ToolCallArguments::Text("{\"city\":\"SF\"}".into()),
                    },
                }]),
                ..Default::default()
            }),
            "llama3:8b",
        );
        assert_eq!(response.stop_reason, "tool_use");
        let Some(AnthropicContentBlock::ToolUse { id, name, input }) = response.content.get(1)
        else {
            panic!("expected tool_use block after text block");
        };
        assert!(id.starts_with("toolu_"));
        assert_eq!(name, "get_weather");
        assert_eq!(input, &json!({"city": "SF"}));
    }

    #[test]
    fn test_truncation_maps_to_max_tokens() {
        let mut native = native_response(ChatMessage {
            role: "assistant".into(),
            content: "partial".into(),
            ..Default::default()
        });
        native.done_reason = Some("length".into());
        let response = encode_anthropic_response(&native, "llama3:8b");
        assert_eq!(response.stop_reason, "max_tokens");
    }
}
