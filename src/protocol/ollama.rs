use serde::{Deserialize, Serialize};

/// Ollama `/api/chat` request wire type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    /// Omitted (never an explicit `false`) when thinking is off, so backends
    /// that distinguish omission from explicit-false see a think-unaware
    /// request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub think: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDef>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Ollama chat message wire type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

/// Tool definition in the native function-wrapper form, structurally
/// identical to OpenAI's.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDef {
    #[serde(rename = "type")]
    pub type_: String,
    pub function: ToolFunction,
}

/// Function declaration within a tool definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolFunction {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
}

/// A tool call emitted by the backend. The id is optional on the native side
/// and synthesized with a dialect-appropriate prefix when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub function: ToolCallFunction,
}

/// The function part of a native tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallFunction {
    pub name: String,
    pub arguments: ToolCallArguments,
}

/// Native tool-call arguments: either a JSON object or a pre-serialized JSON
/// string. Both normalize to the same object before re-serialization, so the
/// coercion is idempotent in either direction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolCallArguments {
    Object(serde_json::Map<String, serde_json::Value>),
    Text(String),
}

impl ToolCallArguments {
    /// Coerce to a plain JSON object (the Anthropic dialect's demand).
    /// A string that does not parse as a JSON object yields an empty object.
    #[must_use]
    pub fn as_object(&self) -> serde_json::Map<String, serde_json::Value> {
        match self {
            ToolCallArguments::Object(map) => map.clone(),
            ToolCallArguments::Text(raw) => match serde_json::from_str(raw) {
                Ok(serde_json::Value::Object(map)) => map,
                _ => serde_json::Map::new(),
            },
        }
    }

    /// Coerce to a serialized JSON string (the OpenAI dialect's demand).
    #[must_use]
    pub fn to_argument_string(&self) -> String {
        serde_json::Value::Object(self.as_object()).to_string()
    }
}

impl Default for ToolCallArguments {
    fn default() -> Self {
        ToolCallArguments::Object(serde_json::Map::new())
    }
}

/// One decoded line of the backend's newline-delimited chat stream. The same
/// shape is the whole body of a non-streaming `/api/chat` response.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ChatChunk {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<ChatMessage>,
    #[serde(default)]
    pub done: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub done_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_eval_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eval_count: Option<u64>,
}

impl ChatChunk {
    /// True when the backend reports truncation at the output-token limit.
    #[must_use]
    pub fn truncated(&self) -> bool {
        self.done_reason.as_deref() == Some("length")
    }
}

/// `GET /api/tags` response wire type.
#[derive(Debug, Clone, Deserialize)]
pub struct TagsResponse {
    #[serde(default)]
    pub models: Vec<TagModel>,
}

/// One installed model from `/api/tags`.
#[derive(Debug, Clone, Deserialize)]
pub struct TagModel {
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_omits_absent_optionals() {
        let req = ChatRequest {
            model: "llama3:8b".into(),
            messages: vec![ChatMessage {
                role: "user".into(),
                content: "hi".into(),
                ..Default::default()
            }],
            stream: false,
            think: None,
            tools: None,
            options: None,
        };
        let wire = serde_json::to_value(&req).unwrap();
        assert!(wire.get("think").is_none());
        assert!(wire.get("tools").is_none());
        assert!(wire.get("options").is_none());
    }

    #[test]
    fn test_arguments_object_or_string_normalize_identically() {
        let object = ToolCallArguments::Object(
            json!({"city": "SF"}).as_object().unwrap().clone(),
        );
        let text = ToolCallArguments::Text("{\"city\":\"SF\"}".into());
        assert_eq!(object.as_object(), text.as_object());
        assert_eq!(object.to_argument_string(), text.to_argument_string());
    }

    #[test]
    fn test_arguments_unparseable_string_becomes_empty_object() {
        let text = ToolCallArguments::Text("not json".into());
        assert!(text.as_object().is_empty());
        assert_eq!(text.to_argument_string(), "{}");
    }

    #[test]
    fn test_chunk_decodes_terminal_line() {
        let chunk: ChatChunk = serde_json::from_str(
            r#"{"message":{"role":"assistant","content":""},"done":true,"done_reason":"stop","prompt_eval_count":10,"eval_count":20}"#,
        )
        .unwrap();
        assert!(chunk.done);
        assert!(!chunk.truncated());
        assert_eq!(chunk.prompt_eval_count, Some(10));
        assert_eq!(chunk.eval_count, Some(20));
    }

    #[test]
    fn test_chunk_decodes_tool_call_with_object_arguments() {
        let chunk: ChatChunk = serde_json::from_str(
            r#"{"message":{"role":"assistant","content":"","tool_calls":[{"function":{"name":"get_weather","arguments":{"city":"SF"}}}]},"done":false}"#,
        )
        .unwrap();
        let calls = chunk.message.unwrap().tool_calls.unwrap();
        assert_eq!(calls[0].function.name, "get_weather");
        assert_eq!(calls[0].function.arguments.to_argument_string(), "{\"city\":\"SF\"}");
    }
}
