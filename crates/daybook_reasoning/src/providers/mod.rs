//! HTTP text generation backends.
//!
//! Every provider maps failures onto [`GenerationError`] the same way:
//! 408, 429, 5xx and network timeouts are transient; everything else
//! (other statuses, missing key, unexpected payload) is unavailable.

pub mod gemini;
pub mod mock;
pub mod openai;

use crate::llm::{GenerationError, TextGenerator};
use anyhow::Result;
use daybook_core::LlmConfig;
use reqwest::{Response, StatusCode};
use std::sync::Arc;

pub use gemini::GeminiClient;
pub use mock::MockGenerator;
pub use openai::OpenAiClient;

/// Build the configured provider.
pub fn create_generator(config: &LlmConfig) -> Result<Arc<dyn TextGenerator>> {
    let generator: Arc<dyn TextGenerator> = match config.provider.as_str() {
        "openai" => Arc::new(OpenAiClient::new(config)?),
        "gemini" => Arc::new(GeminiClient::new(config)?),
        "mock" => Arc::new(MockGenerator::new()),
        other => anyhow::bail!("Unknown LLM provider `{}` (expected openai, gemini or mock)", other),
    };
    tracing::info!(provider = %config.provider, model = %config.model, "Text generator ready");
    Ok(generator)
}

fn is_transient_status(status: StatusCode) -> bool {
    status == StatusCode::REQUEST_TIMEOUT // 408
        || status == StatusCode::TOO_MANY_REQUESTS // 429
        || status.is_server_error()
}

/// Map a transport-level failure.
pub(crate) fn classify_send_error(provider: &str, err: reqwest::Error) -> GenerationError {
    if err.is_timeout() || err.is_connect() {
        GenerationError::Transient(format!("{provider}: {err}"))
    } else {
        GenerationError::Unavailable(format!("{provider}: {err}"))
    }
}

/// Pass successful responses through; turn anything else into an error
/// carrying a bounded slice of the body.
pub(crate) async fn check_status(
    provider: &str,
    response: Response,
) -> Result<Response, GenerationError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail: String = body.chars().take(200).collect();
    tracing::warn!("{} returned {}: {}", provider, status, detail);

    let message = format!("{provider} ({status}): {detail}");
    if is_transient_status(status) {
        Err(GenerationError::Transient(message))
    } else {
        Err(GenerationError::Unavailable(message))
    }
}
