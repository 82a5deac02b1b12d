//! Chat-completion provider adapter.
//!
//! One adapter covers every OpenAI-compatible chat endpoint; the config
//! selects Groq (the default) or OpenAI and fixes the generation parameters
//! (model, max tokens, temperature). A single blocking round trip per call,
//! no retries, no streaming.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::CompletionConfig;
use crate::error::{Error, Result};

/// Produces an answer string for a rendered prompt.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    fn model_name(&self) -> &str;

    async fn complete(&self, prompt: &str) -> Result<String>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: usize,
    messages: Vec<ChatRequestMessage<'a>>,
}

#[derive(Serialize)]
struct ChatRequestMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Deserialize)]
struct AssistantMessage {
    content: String,
}

fn provider_err(reason: impl ToString) -> Error {
    Error::ProviderUnavailable {
        provider: "completion",
        reason: reason.to_string(),
    }
}

/// OpenAI-compatible chat-completion adapter (Groq, OpenAI).
pub struct ChatCompletion {
    client: reqwest::Client,
    api_key: String,
    model: String,
    url: String,
    max_tokens: usize,
    temperature: f32,
}

impl ChatCompletion {
    pub fn new(config: &CompletionConfig) -> Result<Self> {
        let (key_var, default_url) = match config.provider.as_str() {
            "groq" => ("GROQ_API_KEY", "https://api.groq.com/openai/v1"),
            "openai" => ("OPENAI_API_KEY", "https://api.openai.com/v1"),
            other => {
                return Err(Error::Config(format!(
                    "unknown completion provider: {}",
                    other
                )))
            }
        };
        let api_key =
            std::env::var(key_var).map_err(|_| provider_err(format!("{} not set", key_var)))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(provider_err)?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            url: config
                .url
                .clone()
                .unwrap_or_else(|| default_url.to_string()),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl CompletionProvider for ChatCompletion {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            messages: vec![ChatRequestMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(provider_err)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(provider_err(format!(
                "chat completions {}: {}",
                status, text
            )));
        }

        let parsed: ChatResponse = response.json().await.map_err(provider_err)?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| provider_err("empty completion response"))
    }
}

/// Create the configured [`CompletionProvider`].
pub fn create_provider(config: &CompletionConfig) -> Result<Box<dyn CompletionProvider>> {
    Ok(Box::new(ChatCompletion::new(config)?))
}
