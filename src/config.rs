use std::collections::BTreeSet;

/// Models that get `think: true` injected automatically unless the client
/// says otherwise. Extended at startup via the `THINK_MODELS` env var.
const DEFAULT_THINK_MODELS: [&str; 2] = ["glm-5:cloud", "glm4:thinking"];

fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    4000
}
fn default_timeout_secs() -> u64 {
    120
}
fn default_log_level() -> String {
    "INFO".to_string()
}

/// Immutable process-wide configuration, built once at startup and shared by
/// reference through [`crate::state::AppState`].
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base URL of the Ollama backend, without a trailing slash.
    pub ollama_base_url: String,
    /// Model names for which think mode defaults to on.
    pub think_models: BTreeSet<String>,
    pub host: String,
    pub port: u16,
    /// Bounded wait for a full non-streaming backend response, and the
    /// per-read timeout between chunks on the streaming path.
    pub timeout_secs: u64,
    pub log_level: String,
}

impl AppConfig {
    /// Build configuration from environment variables, falling back to the
    /// documented defaults for anything unset.
    #[must_use]
    pub fn from_env() -> Self {
        let extra = std::env::var("THINK_MODELS").unwrap_or_default();
        Self {
            ollama_base_url: std::env::var("OLLAMA_BASE_URL")
                .ok()
                .map_or_else(default_base_url, |url| {
                    url.trim_end_matches('/').to_string()
                }),
            think_models: merge_think_models(&extra),
            host: std::env::var("HOST").unwrap_or_else(|_| default_host()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or_else(default_port),
            timeout_secs: std::env::var("OLLAMA_TIMEOUT_SECS")
                .ok()
                .and_then(|t| t.parse().ok())
                .unwrap_or_else(default_timeout_secs),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| default_log_level()),
        }
    }

    /// Decide whether a native request should carry `think: true`.
    ///
    /// An explicit client override wins verbatim; otherwise membership in the
    /// configured think-model set decides. The set check is a heuristic only,
    /// which is why the upstream call path falls back on capability rejection
    /// (see [`crate::upstream::negotiate`]).
    #[must_use]
    pub fn should_think(&self, model: &str, explicit: Option<bool>) -> bool {
        match explicit {
            Some(value) => value,
            None => self.think_models.contains(model),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ollama_base_url: default_base_url(),
            think_models: merge_think_models(""),
            host: default_host(),
            port: default_port(),
            timeout_secs: default_timeout_secs(),
            log_level: default_log_level(),
        }
    }
}

/// Merge the built-in think models with a comma-separated operator list.
/// Blank entries and surrounding whitespace are ignored.
fn merge_think_models(extra: &str) -> BTreeSet<String> {
    let mut set: BTreeSet<String> = DEFAULT_THINK_MODELS
        .iter()
        .map(|m| (*m).to_string())
        .collect();
    for entry in extra.split(',') {
        let trimmed = entry.trim();
        if !trimmed.is_empty() {
            set.insert(trimmed.to_string());
        }
    }
    set
}
