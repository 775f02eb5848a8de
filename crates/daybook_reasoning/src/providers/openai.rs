use crate::llm::{GenerationError, TextGenerator};
use crate::providers::{check_status, classify_send_error};
use anyhow::Result;
use daybook_core::LlmConfig;
use reqwest::Client;
use serde_json::{json, Value};
use std::env;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI-compatible chat completions endpoint. Also covers local servers
/// exposing the same API (Ollama, vLLM) through `base_url`.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    temperature: f32,
}

impl OpenAiClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty());
        if api_key.is_none() {
            tracing::warn!("OPENAI_API_KEY is not set; generation calls will fail");
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
impl TextGenerator for OpenAiClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| GenerationError::Unavailable("OPENAI_API_KEY is not set".into()))?;

        let payload = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": self.temperature,
        });

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| classify_send_error("OpenAI", e))?;
        let response = check_status("OpenAI", response).await?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| classify_send_error("OpenAI", e))?;
        parse_completion(&body)
    }
}

fn parse_completion(body: &Value) -> Result<String, GenerationError> {
    body["choices"][0]["message"]["content"]
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| GenerationError::Unavailable("OpenAI: response has no message content".into()))
}
