use crate::config::AppConfig;
use crate::protocol::normalize::flatten_content;
use crate::protocol::ollama::{
    ChatMessage, ChatRequest, ToolCall, ToolCallArguments, ToolCallFunction,
};
use crate::protocol::openai::{OpenAiChatRequest, OpenAiMessage, OpenAiToolCall};

/// Translate an `OpenAI` chat-completions request into the native
/// `/api/chat` form.
///
/// Model, messages, and stream flag are copied; the think flag follows the
/// explicit override or the configured think-model set; tool definitions are
/// structurally identical and pass through verbatim; sampling options are
/// collected into the options map with `max_tokens` mapping to `num_predict`
/// only when `num_predict` itself is absent.
#[must_use]
pub fn decode_openai_request(request: &OpenAiChatRequest, config: &AppConfig) -> ChatRequest {
    let think = config
        .should_think(&request.model, request.think)
        .then_some(true);

    let messages = request.messages.iter().map(decode_message).collect();

    ChatRequest {
        model: request.model.clone(),
        messages,
        stream: request.stream,
        think,
        tools: request.tools.clone(),
        options: build_options(request),
    }
}

fn decode_message(message: &OpenAiMessage) -> ChatMessage {
    let content = message
        .content
        .as_ref()
        .map(|c| flatten_content(c))
        .unwrap_or_default();
    ChatMessage {
        role: message.role.clone(),
        content,
        thinking: None,
        tool_calls: message
            .tool_calls
            .as_ref()
            .map(|calls| calls.iter().map(decode_tool_call).collect()),
        tool_call_id: message.tool_call_id.clone(),
    }
}

/// Carry an assistant-history tool call onto the native wire, parsing the
/// string-form arguments back into an object where possible.
fn decode_tool_call(call: &OpenAiToolCall) -> ToolCall {
    ToolCall {
        id: Some(call.id.clone()),
        function: ToolCallFunction {
            name: call.function.name.clone(),
            arguments: ToolCallArguments::Text(call.function.arguments.clone()),
        },
    }
}

fn build_options(
    request: &OpenAiChatRequest,
) -> Option<serde_json::Map<String, serde_json::Value>> {
    let mut options = serde_json::Map::new();
    if let Some(temperature) = request.temperature {
        options.insert("temperature".into(), temperature.into());
    }
    if let Some(top_p) = request.top_p {
        options.insert("top_p".into(), top_p.into());
    }
    if let Some(top_k) = request.top_k {
        options.insert("top_k".into(), top_k.into());
    }
    if let Some(num_predict) = request.num_predict {
        options.insert("num_predict".into(), num_predict.into());
    }
    if let Some(seed) = request.seed {
        options.insert("seed".into(), seed.into());
    }
    if let Some(stop) = &request.stop {
        options.insert("stop".into(), stop.clone());
    }
    // OpenAI's max_tokens maps to num_predict; an explicit num_predict wins.
    if let Some(max_tokens) = request.max_tokens {
        options
            .entry("num_predict".to_string())
            .or_insert_with(|| max_tokens.into());
    }
    if options.is_empty() {
        None
    } else {
        Some(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request_from_json(body: serde_json::Value) -> OpenAiChatRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_think_set_for_member_model_without_override() {
        let config = AppConfig::default();
        let request = request_from_json(json!({
            "model": "glm-5:cloud",
            "messages": [{"role": "user", "content": "hi"}],
        }));
        let native = decode_openai_request(&request, &config);
        assert_eq!(native.think, Some(true));
        assert!(!native.stream);
    }

    #[test]
    fn test_explicit_think_false_never_sets_think() {
        let config = AppConfig::default();
        let request = request_from_json(json!({
            "model": "glm-5:cloud",
            "messages": [{"role": "user", "content": "hi"}],
            "think": false,
        }));
        let native = decode_openai_request(&request, &config);
        assert_eq!(native.think, None);
        let wire = serde_json::to_value(&native).unwrap();
        assert!(wire.get("think").is_none());
    }

    #[test]
    fn test_explicit_think_true_for_non_member_model() {
        let config = AppConfig::default();
        let request = request_from_json(json!({
            "model": "llama3:8b",
            "messages": [{"role": "user", "content": "hi"}],
            "think": true,
        }));
        let native = decode_openai_request(&request, &config);
        assert_eq!(native.think, Some(true));
    }

    #[test]
    fn test_num_predict_wins_over_max_tokens() {
        let config = AppConfig::default();
        let request = request_from_json(json!({
            "model": "llama3:8b",
            "messages": [{"role": "user", "content": "hi"}],
            "num_predict": 64,
            "max_tokens": 512,
        }));
        let native = decode_openai_request(&request, &config);
        let options = native.options.unwrap();
        assert_eq!(options["num_predict"], json!(64));
    }

    #[test]
    fn test_max_tokens_maps_to_num_predict_when_absent() {
        let config = AppConfig::default();
        let request = request_from_json(json!({
            "model": "llama3:8b",
            "messages": [{"role": "user", "content": "hi"}],
            "max_tokens": 512,
        }));
        let native = decode_openai_request(&request, &config);
        assert_eq!(native.options.unwrap()["num_predict"], json!(512));
    }

    #[test]
    fn test_options_omitted_when_empty() {
        let config = AppConfig::default();
        let request = request_from_json(json!({
            "model": "llama3:8b",
            "messages": [{"role": "user", "content": "hi"}],
        }));
        let native = decode_openai_request(&request, &config);
        assert!(native.options.is_none());
    }

    #[test]
    fn test_sampling_options_collected() {
        let config = AppConfig::default();
        let request = request_from_json(json!({
            "model": "llama3:8b",
            "messages": [{"role": "user", "content": "hi"}],
            "temperature": 0.2,
            "top_p": 0.9,
            "top_k": 40,
            "seed": 7,
            "stop": ["END"],
        }));
        let options = decode_openai_request(&request, &config).options.unwrap();
        assert_eq!(options["temperature"], json!(0.2));
        assert_eq!(options["top_p"], json!(0.9));
        assert_eq!(options["top_k"], json!(40));
        assert_eq!(options["seed"], json!(7));
        assert_eq!(options["stop"], json!(["END"]));
    }

    #[test]
    fn test_part_list_content_flattened() {
        let config = AppConfig::default();
        let request = request_from_json(json!({
            "model": "llama3:8b",
            "messages": [{
                "role": "user",
                "content": [
                    {"type": "text", "text": "look at"},
                    {"type": "image_url", "image_url": {"url": "http://x/y.png"}},
                    {"type": "text", "text": "this"},
                ],
            }],
        }));
        let native = decode_openai_request(&request, &config);
        assert_eq!(native.messages[0].content, "look at this");
    }

    #[test]
    fn test_assistant_tool_calls_pass_through() {
        let config = AppConfig::default();
        let request = request_from_json(json!({
            "model": "llama3:8b",
            "messages": [
                {"role": "user", "content": "weather?"},
                {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "get_weather", "arguments": "{\"city\":\"SF\"}"},
                    }],
                },
                {"role": "tool", "content": "{\"temp\":18}", "tool_call_id": "call_1"},
            ],
        }));
        let native = decode_openai_request(&request, &config);
        let calls = native.messages[1].tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].id.as_deref(), Some("call_1"));
        assert_eq!(calls[0].function.arguments.as_object()["city"], json!("SF"));
        assert_eq!(native.messages[2].tool_call_id.as_deref(), Some("call_1"));
    }
}
