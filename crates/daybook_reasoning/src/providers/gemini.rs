use crate::llm::{GenerationError, TextGenerator};
use crate::providers::{check_status, classify_send_error};
use anyhow::Result;
use daybook_core::LlmConfig;
use reqwest::Client;
use serde_json::{json, Value};
use std::env;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Gemini `generateContent`.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    temperature: f32,
}

impl GeminiClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty());
        if api_key.is_none() {
            tracing::warn!("GEMINI_API_KEY is not set; generation calls will fail");
        }
        let base_url = config
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()?,
            api_key,
            base_url,
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }
}

#[async_trait::async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| GenerationError::Unavailable("GEMINI_API_KEY is not set".into()))?;

        let payload = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": { "temperature": self.temperature },
        });

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| classify_send_error("Gemini", e))?;
        let response = check_status("Gemini", response).await?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| classify_send_error("Gemini", e))?;
        parse_candidates(&body)
    }
}

/// Concatenate the text parts of the first candidate.
fn parse_candidates(body: &Value) -> Result<String, GenerationError> {
    let parts = body["candidates"][0]["content"]["parts"]
        .as_array()
        .ok_or_else(|| GenerationError::Unavailable("Gemini: response has no candidates".into()))?;

    Ok(parts
        .iter()
        .filter_map(|p| p["text"].as_str())
        .collect::<Vec<_>>()
        .join(""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_candidates_joins_parts() {
        let body = json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "A Walk " }, { "text": "That Helped" }] }
            }]
        });
        assert_eq!(parse_candidates(&body).unwrap(), "A Walk That Helped");
    }

    #[test]
    fn test_parse_candidates_blocked_prompt() {
        // Safety-blocked prompts come back without candidates
        let body = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        assert!(matches!(
            parse_candidates(&body),
            Err(GenerationError::Unavailable(_))
        ));
    }
}
