use crate::protocol::ollama::{ChatChunk, ToolCall};
use crate::protocol::openai::{
    OpenAiChatResponse, OpenAiChoice, OpenAiResponseMessage, OpenAiToolCall,
    OpenAiToolCallFunction, OpenAiUsage,
};
use crate::util::{next_chat_id, next_tool_call_id, unix_now_secs};

/// Map a complete native `/api/chat` response into an `OpenAI`
/// chat-completions response.
#[must_use]
pub fn encode_openai_response(native: &ChatChunk, model: &str) -> OpenAiChatResponse {
    let message = native.message.as_ref();
    let content = message.map(|m| m.content.clone()).unwrap_or_default();
    let thinking = message
        .and_then(|m| m.thinking.as_ref())
        .filter(|t| !t.is_empty())
        .cloned();
    let tool_calls = message
        .and_then(|m| m.tool_calls.as_ref())
        .filter(|calls| !calls.is_empty())
        .map(|calls| calls.iter().map(encode_tool_call).collect::<Vec<_>>());

    let finish_reason = if tool_calls.is_some() {
        "tool_calls"
    } else if native.truncated() {
        "length"
    } else {
        "stop"
    };

    OpenAiChatResponse {
        id: next_chat_id(),
        object: "chat.completion".to_string(),
        created: unix_now_secs(),
        model: model.to_string(),
        choices: vec![OpenAiChoice {
            index: 0,
            message: OpenAiResponseMessage {
                role: "assistant".to_string(),
                content,
                reasoning_content: thinking,
                tool_calls,
            },
            finish_reason: finish_reason.to_string(),
        }],
        usage: encode_usage(native),
    }
}

/// Token accounting: prompt/completion/total from the backend's eval counts,
/// zero-defaulted when absent.
#[must_use]
pub fn encode_usage(native: &ChatChunk) -> OpenAiUsage {
    let prompt_tokens = native.prompt_eval_count.unwrap_or(0);
    let completion_tokens = native.eval_count.unwrap_or(0);
    OpenAiUsage {
        prompt_tokens,
        completion_tokens,
        total_tokens: prompt_tokens + completion_tokens,
    }
}

/// Re-wrap a native tool call for the `OpenAI` wire: id defaulted with a
/// `call_` prefix, arguments coerced to a JSON string.
#[must_use]
pub fn encode_tool_call(call: &ToolCall) -> OpenAiToolCall {
    OpenAiToolCall {
        id: call.id.clone().unwrap_or_else(|| next_tool_call_id("call_")),
        type_: "function".to_string(),
        function: OpenAiToolCallFunction {
            name: call.function.name.clone(),
            arguments: call.function.arguments.to_argument_string(),
        },
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
    fn test_plain_response_maps_content_and_usage() {
        let response = encode_openai_response(
            &native_response(ChatMessage {
                role: "assistant".into(),
                content: "hello".into(),
                ..Default::default()
            }),
            "llama3:8b",
        );
        assert!(response.id.starts_with("chatcmpl-"));
        assert_eq!(response.choices[0].message.content, "hello");
        assert_eq!(response.choices[0].finish_reason, "stop");
        assert_eq!(response.usage.prompt_tokens, 10);
        assert_eq!(response.usage.completion_tokens, 20);
        assert_eq!(response.usage.total_tokens, 30);
    }

    #[test]
    fn test_thinking_becomes_reasoning_content() {
        let response = encode_openai_response(
            &native_response(ChatMessage {
                role: "assistant".into(),
                content: "answer".into(),
                thinking: Some("chain of thought".into()),
                ..Default::default()
            }),
            "glm-5:cloud",
        );
        assert_eq!(
            response.choices[0].message.reasoning_content.as_deref(),
            Some("chain of thought")
        );
    }

    #[test]
    fn test_empty_thinking_omitted() {
        let response = encode_openai_response(
            &native_response(ChatMessage {
                role: "assistant".into(),
                content: "answer".into(),
                thinking: Some(String::new()),
                ..Default::default()
            }),
            "glm-5:cloud",
        );
        assert!(response.choices[0].message.reasoning_content.is_none());
    }

    #[test]
    fn test_tool_calls_set_finish_reason_and_string_arguments() {
        let response = encode_openai_response(
            &native_response(ChatMessage {
                role: "assistant".into(),
                content: String::new(),
                tool_calls: Some(vec![ToolCall {
                    id: None,
                    function: ToolCallFunction {
                        name: "get_weather".into(),
                        arguments: ToolCallArguments::Object(
                            json!({"city": "SF"}).as_object().unwrap().clone(),
                        ),
                    },
                }]),
                ..Default::default()
            }),
            "llama3:8b",
        );
        assert_eq!(response.choices[0].finish_reason, "tool_calls");
        let calls = response.choices[0].message.tool_calls.as_ref().unwrap();
        assert!(calls[0].id.starts_with("call_"));
        assert_eq!(calls[0].function.arguments, "{\"city\":\"SF\"}");
    }

    #[test]
    fn test_string_and_object_arguments_encode_identically() {
        let object_call = ToolCall {
            id: Some("call_1".into()),
            function: ToolCallFunction {
                name: "f".into(),
                arguments: ToolCallArguments::Object(
                    json!({"city": "SF"}).as_object().unwrap().clone(),
                ),
            },
        };
        let string_call = ToolCall {
            id: Some("call_1".into()),
            function: ToolCallFunction {
                name: "f".into(),
                arguments: ToolCallArguments::Text("{\"city\":\"SF\"}".into()),
            },
        };
        assert_eq!(
            encode_tool_call(&object_call).function.arguments,
            encode_tool_call(&string_call).function.arguments
        );
    }

    #[test]
    fn test_length_done_reason_maps_to_length() {
        let mut native = native_response(ChatMessage {
            role: "assistant".into(),
            content: "trunca".into(),
            ..Default::default()
        });
        native.done_reason = Some("length".into());
        let response = encode_openai_response(&native, "llama3:8b");
        assert_eq!(response.choices[0].finish_reason, "length");
    }

    #[test]
    fn test_absent_counts_default_to_zero() {
        let native = ChatChunk {
            message: Some(ChatMessage {
                role: "assistant".into(),
                content: "hi".into(),
                ..Default::default()
            }),
            done: true,
            ..Default::default()
        };
        let usage = encode_usage(&native);
        assert_eq!(usage.prompt_tokens, 0);
        assert_eq!(usage.completion_tokens, 0);
        assert_eq!(usage.total_tokens, 0);
    }
}
