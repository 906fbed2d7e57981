//! Think-mode capability negotiation.
//!
//! The think-model set is a heuristic, so a speculative `think: true` can hit
//! a backend that rejects it. The fallback is a single transparent retry with
//! the think field removed; everything else about the request is untouched.

/// Classify an upstream rejection as a thinking-capability rejection.
///
/// Only client errors qualify; the body must name thinking/reasoning support
/// as the complaint (Ollama reports e.g. `"model does not support thinking"`).
#[must_use]
pub fn is_think_rejection(status: u16, body: &str) -> bool {
    if !(400..500).contains(&status) {
        return false;
    }
    let body = body.to_ascii_lowercase();
    body.contains("think") || body.contains("reasoning")
}
