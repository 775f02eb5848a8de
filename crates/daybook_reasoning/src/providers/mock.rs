//! Mock provider: deterministic responses for testing without API keys.

use crate::llm::{GenerationError, TextGenerator};
use std::collections::VecDeque;
use std::sync::Mutex;

type Responder = Box<dyn Fn(&str) -> Result<String, GenerationError> + Send + Sync>;

/// Answers from a scripted queue first, then from an optional responder
/// closure, then with a fixed echo line. Every prompt is recorded.
pub struct MockGenerator {
    queue: Mutex<VecDeque<Result<String, GenerationError>>>,
    responder: Option<Responder>,
    prompts: Mutex<Vec<String>>,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            responder: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Replies in order, one per call.
    pub fn with_responses<I>(responses: I) -> Self
    where
        I: IntoIterator<Item = Result<String, GenerationError>>,
    {
        let mock = Self::new();
        mock.queue
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .extend(responses);
        mock
    }

    /// Replies computed from the prompt, for call orders that are not fixed.
    pub fn with_responder<F>(responder: F) -> Self
    where
        F: Fn(&str) -> Result<String, GenerationError> + Send + Sync + 'static,
    {
        Self {
            responder: Some(Box::new(responder)),
            ..Self::new()
        }
    }

    pub fn push(&self, response: Result<String, GenerationError>) {
        self.queue
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push_back(response);
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap_or_else(|p| p.into_inner()).len()
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl TextGenerator for MockGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        self.prompts
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(prompt.to_string());

        let scripted = self
            .queue
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .pop_front();
        if let Some(response) = scripted {
            return response;
        }
        if let Some(responder) = &self.responder {
            return responder(prompt);
        }
        Ok("(Mock response) I received your prompt.".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_queue_then_default() {
        let mock = MockGenerator::with_responses(vec![
            Ok("first".to_string()),
            Err(GenerationError::Transient("busy".into())),
        ]);
        assert_eq!(mock.generate("a").await.unwrap(), "first");
        assert!(mock.generate("b").await.unwrap_err().is_transient());
        assert!(mock.generate("c").await.unwrap().contains("Mock"));
        assert_eq!(mock.prompts(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_responder_sees_prompt() {
        let mock = MockGenerator::with_responder(|p| Ok(p.to_uppercase()));
        assert_eq!(mock.generate("hi").await.unwrap(), "HI");
        assert_eq!(mock.call_count(), 1);
    }
}
