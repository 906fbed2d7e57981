use crate::protocol::ollama::ChatMessage;

/// Flatten a client content value (plain string or ordered block list) into
/// the native flat-string content model.
///
/// Block lists reduce to the space-joined text of their `text`-typed blocks,
/// in original order. Non-text blocks (images etc.) are dropped. Anything
/// else collapses to an empty string.
#[must_use]
pub fn flatten_content(content: &serde_json::Value) -> String {
    match content {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(blocks) => {
            let texts: Vec<&str> = blocks
                .iter()
                .filter(|block| {
                    block.get("type").and_then(|t| t.as_str()).unwrap_or("text") == "text"
                })
                .filter_map(|block| block.get("text").and_then(|t| t.as_str()))
                .collect();
            texts.join(" ")
        }
        _ => String::new(),
    }
}

/// Coerce a `tool_result` block's content payload to its string form.
///
/// A block-list payload reduces to the newline-joined text of its text
/// blocks; any other non-string JSON is serialized as-is.
#[must_use]
pub fn tool_result_content_string(content: &serde_json::Value) -> String {
    match content {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(items) => items
            .iter()
            .filter(|item| item.get("type").and_then(|t| t.as_str()) == Some("text"))
            .filter_map(|item| item.get("text").and_then(|t| t.as_str()))
            .collect::<Vec<_>>()
            .join("\n"),
        other => other.to_string(),
    }
}

/// Normalize one Anthropic-dialect message into native messages.
///
/// Text blocks accumulate into a single message with the original role.
/// `tool_result` blocks are never merged into that text: each becomes its own
/// synthetic `tool`-role message carrying the block's `tool_use_id`, emitted
/// after the text message and in original block order.
#[must_use]
pub fn normalize_block_message(role: &str, content: &serde_json::Value) -> Vec<ChatMessage> {
    let serde_json::Value::Array(blocks) = content else {
        return vec![ChatMessage {
            role: role.to_string(),
            content: flatten_content(content),
            ..Default::default()
        }];
    };

    let mut texts: Vec<&str> = Vec::new();
    let mut tool_messages: Vec<ChatMessage> = Vec::new();
    for block in blocks {
        match block.get("type").and_then(|t| t.as_str()).unwrap_or("text") {
            "text" => {
                if let Some(text) = block.get("text").and_then(|t| t.as_str()) {
                    texts.push(text);
                }
            }
            "tool_result" => {
                let tool_use_id = block
                    .get("tool_use_id")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string();
                let payload = block
                    .get("content")
                    .map(tool_result_content_string)
                    .unwrap_or_default();
                tool_messages.push(ChatMessage {
                    role: "tool".to_string(),
                    content: payload,
                    tool_call_id: Some(tool_use_id),
                    ..Default::default()
                });
            }
            // Other block kinds (images etc.) are not round-tripped.
            _ => {}
        }
    }

    let mut out = Vec::with_capacity(1 + tool_messages.len());
    if !texts.is_empty() || tool_messages.is_empty() {
        out.push(ChatMessage {
            role: role.to_string(),
            content: texts.join(" "),
            ..Default::default()
        });
    }
    out.extend(tool_messages);
    out
}
