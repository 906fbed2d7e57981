pub mod anthropic;
pub mod normalize;
pub mod ollama;
pub mod openai;

/// Client dialect served by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    OpenAi,
    Anthropic,
}
