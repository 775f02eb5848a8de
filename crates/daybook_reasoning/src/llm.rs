use async_trait::async_trait;
use thiserror::Error;

/// Failure of a single text generation call.
///
/// Callers decide how to degrade; nothing in this crate retries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// Timeouts, rate limits, upstream 5xx. Worth trying again later.
    #[error("transient generation failure: {0}")]
    Transient(String),
    /// Misconfiguration, rejected request, malformed payload.
    #[error("text generation unavailable: {0}")]
    Unavailable(String),
}

impl GenerationError {
    pub fn is_transient(&self) -> bool {
        matches!(self, GenerationError::Transient(_))
    }
}

/// Prompt in, text out. One call, no conversation state.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}
