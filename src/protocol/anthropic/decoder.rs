use crate::config::AppConfig;
use crate::protocol::anthropic::{AnthropicRequest, AnthropicTool};
use crate::protocol::normalize::{flatten_content, normalize_block_message};
use crate::protocol::ollama::{ChatMessage, ChatRequest, ToolDef, ToolFunction};

/// Translate an Anthropic messages request into the native `/api/chat` form.
///
/// The `system` field becomes a synthetic leading `system`-role message; each
/// input message is normalized, splitting `tool_result` blocks into their own
/// `tool`-role messages; tool specs are re-wrapped into the native
/// function-wrapper form; `max_tokens` always maps to `num_predict`.
#[must_use]
pub fn decode_anthropic_request(request: &AnthropicRequest, config: &AppConfig) -> ChatRequest {
    let explicit_think = request.thinking.as_ref().map(|t| t.enabled());
    let think = config
        .should_think(&request.model, explicit_think)
        .then_some(true);

    let mut messages = Vec::with_capacity(request.messages.len() + 1);
    if let Some(system) = &request.system {
        let prompt = flatten_content(system);
        if !prompt.is_empty() {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: prompt,
                ..Default::default()
            });
        }
    }
    for message in &request.messages {
        messages.extend(normalize_block_message(&message.role, &message.content));
    }

    ChatRequest {
        model: request.model.clone(),
        messages,
        stream: request.stream,
        think,
        tools: decode_tools(request.tools.as_deref()),
        options: build_options(request),
    }
}

/// Re-wrap `{name, description, input_schema}` into the native
/// `{type: "function", function: {name, description, parameters}}` form.
fn decode_tools(tools: Option<&[AnthropicTool]>) -> Option<Vec<ToolDef>> {
    let tools = tools?;
    if tools.is_empty() {
        return None;
    }
    Some(
        tools
            .iter()
            .map(|tool| ToolDef {
                type_: "function".to_string(),
                function: ToolFunction {
                    name: tool.name.clone(),
                    description: tool.description.clone(),
                    parameters: Some(tool.input_schema.clone()),
                },
            })
            .collect(),
    )
}

fn build_options(
    request: &AnthropicRequest,
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
    if let Some(stop) = &request.stop_sequences {
        options.insert("stop".into(), stop.clone().into());
    }
    // Anthropic has no separate num_predict, so max_tokens maps unconditionally.
    if let Some(max_tokens) = request.max_tokens {
        options.insert("num_predict".into(), max_tokens.into());
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

    fn request_from_json(body: serde_json::Value) -> AnthropicRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_system_becomes_leading_message() {
        let config = AppConfig::default();
        let request = request_from_json(json!({
            "model": "llama3:8b",
            "max_tokens": 256,
            "system": "You are helpful",
            "messages": [{"role": "user", "content": "hi"}],
        }));
        let native = decode_anthropic_request(&request, &config);
        assert_eq!(native.messages[0].role, "system");
        assert_eq!(native.messages[0].content, "You are helpful");
        assert_eq!(native.messages[1].role, "user");
    }

    #[test]
    fn test_system_block_list_flattened() {
        let config = AppConfig::default();
        let request = request_from_json(json!({
            "model": "llama3:8b",
            "max_tokens": 256,
            "system": [
                {"type": "text", "text": "Be"},
                {"type": "text", "text": "brief"},
            ],
            "messages": [{"role": "user", "content": "hi"}],
        }));
        let native = decode_anthropic_request(&request, &config);
        assert_eq!(native.messages[0].content, "Be brief");
    }

    #[test]
    fn test_tool_result_block_splits_into_tool_message() {
        let config = AppConfig::default();
        let request = request_from_json(json!({
            "model": "llama3:8b",
            "max_tokens": 256,
            "messages": [{
                "role": "user",
                "content": [
                    {"type": "text", "text": "results:"},
                    {"type": "tool_result", "tool_use_id": "toolu_9", "content": "42"},
                ],
            }],
        }));
        let native = decode_anthropic_request(&request, &config);
        assert_eq!(native.messages.len(), 2);
        assert_eq!(native.messages[0].role, "user");
        assert_eq!(native.messages[1].role, "tool");
        assert_eq!(native.messages[1].tool_call_id.as_deref(), Some("toolu_9"));
    }

    #[test]
    fn test_tools_rewrapped_into_function_form() {
        let config = AppConfig::default();
        let schema = json!({"type": "object", "properties": {"city": {"type": "string"}}});
        let request = request_from_json(json!({
            "model": "llama3:8b",
            "max_tokens": 256,
            "messages": [{"role": "user", "content": "weather?"}],
            "tools": [{
                "name": "get_weather",
                "description": "Get weather by city",
                "input_schema": schema,
            }],
        }));
        let native = decode_anthropic_request(&request, &config);
        let tools = native.tools.unwrap();
        assert_eq!(tools[0].type_, "function");
        assert_eq!(tools[0].function.name, "get_weather");
        assert_eq!(tools[0].function.parameters.as_ref().unwrap(), &schema);
    }

    #[test]
    fn test_max_tokens_always_maps_to_num_predict() {
        let config = AppConfig::default();
        let request = request_from_json(json!({
            "model": "llama3:8b",
            "max_tokens": 1024,
            "messages": [{"role": "user", "content": "hi"}],
        }));
        let native = decode_anthropic_request(&request, &config);
        assert_eq!(native.options.unwrap()["num_predict"], json!(1024));
    }

    #[test]
    fn test_thinking_toggle_is_explicit_override() {
        let config = AppConfig::default();
        let enabled = request_from_json(json!({
            "model": "llama3:8b",
            "max_tokens": 64,
            "messages": [{"role": "user", "content": "hi"}],
            "thinking": {"type": "enabled", "budget_tokens": 2048},
        }));
        assert_eq!(decode_anthropic_request(&enabled, &config).think, Some(true));

        let disabled = request_from_json(json!({
            "model": "glm-5:cloud",
            "max_tokens": 64,
            "messages": [{"role": "user", "content": "hi"}],
            "thinking": {"type": "disabled"},
        }));
        assert_eq!(decode_anthropic_request(&disabled, &config).think, None);
    }

    #[test]
    fn test_stop_sequences_map_to_stop_option() {
        let config = AppConfig::default();
        let request = request_from_json(json!({
            "model": "llama3:8b",
            "max_tokens": 64,
            "messages": [{"role": "user", "content": "hi"}],
            "stop_sequences": ["END", "FIN"],
        }));
        let options = decode_anthropic_request(&request, &config).options.unwrap();
        assert_eq!(options["stop"], json!(["END", "FIN"]));
    }
}
