pub mod negotiate;

use std::time::Duration;

use crate::config::AppConfig;
use crate::error::ProxyError;
use crate::protocol::ollama::{ChatChunk, ChatRequest, TagsResponse};
use crate::upstream::negotiate::is_think_rejection;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const TAGS_TIMEOUT: Duration = Duration::from_secs(30);

/// Outcome of a non-streaming chat call: either a decoded native response, or
/// the backend's rejection to be propagated to the client verbatim.
#[derive(Debug)]
pub enum ChatOutcome {
    Success(ChatChunk),
    Rejected { status: u16, body: String },
}

/// Outcome of opening a chat stream: the live response body, or the backend's
/// rejection captured at open.
pub enum StreamOutcome {
    Open(reqwest::Response),
    Rejected { status: u16, body: String },
}

/// HTTP client for the single configured Ollama backend.
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl OllamaClient {
    /// Build the shared pooled client.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::Internal`] when the TLS/connection stack cannot
    /// be initialized.
    pub fn new(config: &AppConfig) -> Result<Self, ProxyError> {
        let client = reqwest::Client::builder()
            .tcp_nodelay(true)
            .connect_timeout(CONNECT_TIMEOUT)
            .redirect(reqwest::redirect::Policy::none())
            .no_proxy()
            .build()
            .map_err(|err| ProxyError::Internal(format!("Failed to build HTTP client: {err}")))?;
        Ok(Self {
            client,
            base_url: config.ollama_base_url.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    /// Per-read timeout the streaming path should apply between chunks.
    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        self.timeout
    }

    /// Non-streaming `/api/chat` call with think-mode capability negotiation.
    ///
    /// When the request speculatively carries `think: true` and the backend
    /// rejects it for capability reasons, the call is retried exactly once
    /// with the think field removed; that retry's outcome is returned
    /// verbatim, success or failure. No other failure triggers a retry.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::Transport`] when the backend is unreachable or
    /// the response body cannot be read.
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatOutcome, ProxyError> {
        let first = self.chat_once(request).await?;
        let ChatOutcome::Rejected { status, body } = &first else {
            return Ok(first);
        };
        if request.think != Some(true) || !is_think_rejection(*status, body) {
            return Ok(first);
        }

        tracing::warn!(
            model = %request.model,
            status = *status,
            "backend rejected think mode, retrying without it"
        );
        let mut retry = request.clone();
        retry.think = None;
        self.chat_once(&retry).await
    }

    async fn chat_once(&self, request: &ChatRequest) -> Result<ChatOutcome, ProxyError> {
        let response = self
            .client
            .post(self.chat_url())
            .timeout(self.timeout)
            .json_body(request)?
            .send()
            .await
            .map_err(|err| ProxyError::Transport(format!("chat request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = read_body_text(response).await?;
            return Ok(ChatOutcome::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|err| ProxyError::Transport(format!("failed to read chat response: {err}")))?;
        let chunk: ChatChunk = serde_json::from_slice(&bytes)
            .map_err(|err| ProxyError::Transport(format!("invalid chat response: {err}")))?;
        Ok(ChatOutcome::Success(chunk))
    }

    /// Open a streaming `/api/chat` call. No total-duration timeout is set;
    /// the caller enforces a per-read timeout between chunks.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::Transport`] when the backend is unreachable.
    pub async fn chat_stream(&self, request: &ChatRequest) -> Result<StreamOutcome, ProxyError> {
        let response = self
            .client
            .post(self.chat_url())
            .json_body(request)?
            .send()
            .await
            .map_err(|err| ProxyError::Transport(format!("chat stream failed to open: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = read_body_text(response).await?;
            return Ok(StreamOutcome::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(StreamOutcome::Open(response))
    }

    /// `GET /api/tags` — the backend's installed-model listing.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::Transport`] for any backend failure, error
    /// status included, so the model listing always surfaces a 502 rather
    /// than echoing whatever status the backend happened to use.
    pub async fn list_tags(&self) -> Result<TagsResponse, ProxyError> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .timeout(TAGS_TIMEOUT)
            .send()
            .await
            .map_err(|err| ProxyError::Transport(format!("tags request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = read_body_text(response).await?;
            return Err(ProxyError::Transport(format!(
                "tags request returned status {status}: {body}"
            )));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|err| ProxyError::Transport(format!("failed to read tags response: {err}")))?;
        serde_json::from_slice(&bytes)
            .map_err(|err| ProxyError::Transport(format!("invalid tags response: {err}")))
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }
}

async fn read_body_text(response: reqwest::Response) -> Result<String, ProxyError> {
    response
        .text()
        .await
        .map_err(|err| ProxyError::Transport(format!("failed to read response body: {err}")))
}

/// Serialize a JSON body without reqwest's `json` feature, matching the
/// byte-body style used for all upstream calls.
trait JsonBody {
    fn json_body<T: serde::Serialize>(self, body: &T) -> Result<reqwest::RequestBuilder, ProxyError>;
}

impl JsonBody for reqwest::RequestBuilder {
    fn json_body<T: serde::Serialize>(
        self,
        body: &T,
    ) -> Result<reqwest::RequestBuilder, ProxyError> {
        let bytes = serde_json::to_vec(body)
            .map_err(|err| ProxyError::Internal(format!("failed to serialize request: {err}")))?;
        Ok(self
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(bytes))
    }
}
