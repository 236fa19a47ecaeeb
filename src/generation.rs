//! # Generation Module
//!
//! The generation port: a prompt goes in, an answer string comes out.
//! Retry and backoff policy belongs to implementations, never to the
//! retrieval core.

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Provider request failed: {0}")]
    Provider(String),
    #[error("Provider returned no completion choices")]
    EmptyResponse,
}

pub type Result<T> = std::result::Result<T, GenerationError>;

/// Capability interface for an external language model.
pub trait GenerationModel: Send + Sync {
    /// Turn a fully assembled prompt into an answer.
    fn generate(&self, prompt: &str) -> Result<String>;
}

/// Generation provider speaking the OpenAI-compatible `/chat/completions`
/// wire shape. Works against any endpoint exposing that API surface by
/// pointing `base_url` at it.
pub struct OpenAiChat {
    agent: ureq::Agent,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

impl OpenAiChat {
    pub fn new(base_url: &str, api_key: &str, model: &str, temperature: f32) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build();
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            temperature,
        }
    }
}

impl GenerationModel for OpenAiChat {
    fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .agent
            .post(&url)
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .send_json(serde_json::json!({
                "model": self.model,
                "temperature": self.temperature,
                "messages": [
                    {"role": "user", "content": prompt},
                ],
            }))
            .map_err(|e| GenerationError::Provider(e.to_string()))?;

        let body: ChatResponse = response
            .into_json()
            .map_err(|e| GenerationError::Provider(format!("Invalid response body: {}", e)))?;

        let choice = body.choices.into_iter().next().ok_or(GenerationError::EmptyResponse)?;
        Ok(choice.message.content.trim().to_string())
    }
}
