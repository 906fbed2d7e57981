use crate::config::AppConfig;
use crate::error::ProxyError;
use crate::upstream::OllamaClient;

/// Shared application state accessible to all handlers. Read-only after
/// startup; per-request work never mutates it.
pub struct AppState {
    pub config: AppConfig,
    pub upstream: OllamaClient,
}

impl AppState {
    /// # Errors
    ///
    /// Returns [`ProxyError::Internal`] when the upstream HTTP client cannot
    /// be built.
    pub fn new(config: AppConfig) -> Result<Self, ProxyError> {
        let upstream = OllamaClient::new(&config)?;
        Ok(Self { config, upstream })
    }
}
