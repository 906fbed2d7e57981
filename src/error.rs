use crate::protocol::Dialect;

/// Canonical error type used across all modules.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Upstream error: status={status}, message={message}")]
    Upstream { status: u16, message: String },
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ProxyError {
    /// HTTP status to surface to the client.
    ///
    /// Upstream rejections keep the backend's own status verbatim; transport
    /// failures (backend unreachable, timed out) surface as 502.
    #[must_use]
    pub fn status(&self) -> http::StatusCode {
        match self {
            ProxyError::InvalidRequest(_) => http::StatusCode::BAD_REQUEST,
            ProxyError::Upstream { status, .. } => http::StatusCode::from_u16(*status)
                .unwrap_or(http::StatusCode::BAD_GATEWAY),
            ProxyError::Transport(_) => http::StatusCode::BAD_GATEWAY,
            ProxyError::Internal(_) => http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn openai_error_type(err: &ProxyError) -> &'static str {
    match err {
        ProxyError::InvalidRequest(_) => "invalid_request_error",
        ProxyError::Upstream { .. } | ProxyError::Transport(_) => "upstream_error",
        ProxyError::Internal(_) => "server_error",
    }
}

fn anthropic_error_type(err: &ProxyError) -> &'static str {
    match err {
        ProxyError::InvalidRequest(_) => "invalid_request_error",
        ProxyError::Upstream { .. } | ProxyError::Transport(_) | ProxyError::Internal(_) => {
            "api_error"
        }
    }
}

/// OpenAI-shaped error body: `{"error": {"message", "type", "code"}}`.
#[must_use]
pub fn openai_error_payload(err: &ProxyError) -> serde_json::Value {
    serde_json::json!({
        "error": {
            "message": err.to_string(),
            "type": openai_error_type(err),
            "code": err.status().as_u16(),
        }
    })
}

/// Anthropic-shaped error body: `{"type": "error", "error": {"type", "message"}}`.
#[must_use]
pub fn anthropic_error_payload(err: &ProxyError) -> serde_json::Value {
    serde_json::json!({
        "type": "error",
        "error": {
            "type": anthropic_error_type(err),
            "message": err.to_string(),
        }
    })
}

/// Format an error for a given client dialect, returning (status, JSON body).
#[must_use]
pub fn format_error(err: &ProxyError, dialect: Dialect) -> (http::StatusCode, serde_json::Value) {
    let body = match dialect {
        Dialect::OpenAi => openai_error_payload(err),
        Dialect::Anthropic => anthropic_error_payload(err),
    };
    (err.status(), body)
}

/// Convert a `ProxyError` into an axum response for a specific dialect.
#[must_use]
pub fn into_axum_response(err: &ProxyError, dialect: Dialect) -> axum::response::Response {
    use axum::response::IntoResponse;
    let (status, body) = format_error(err, dialect);
    (status, axum::Json(body)).into_response()
}
