//! Embedding provider adapters.
//!
//! Defines the [`EmbeddingProvider`] trait and two hosted backends:
//! - **OpenAI** — `POST /v1/embeddings`, authenticated via `OPENAI_API_KEY`.
//! - **Ollama** — `POST /api/embed` on a local or remote Ollama instance.
//!
//! Every call is a single attempt bounded by the configured timeout; callers
//! treat a failure as fatal for the current operation. Providers hold no
//! state beyond the HTTP client and model name.

use async_trait::async_trait;
use std::time::Duration;

use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};

/// Turns text into fixed-dimension vectors via a hosted service.
///
/// Constructed once at process start and passed into the pipeline and query
/// service, so tests can substitute a fake.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Model identifier (e.g. `"text-embedding-3-small"`).
    fn model_name(&self) -> &str;

    /// Embed a batch of texts, returning one vector per input in order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text. Used for dimension probing and query embedding.
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed(&[text.to_string()]).await?;
        if vectors.is_empty() {
            return Err(provider_err("embedding", "empty embedding response"));
        }
        Ok(vectors.remove(0))
    }
}

fn provider_err(provider: &'static str, reason: impl ToString) -> Error {
    Error::ProviderUnavailable {
        provider,
        reason: reason.to_string(),
    }
}

fn build_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| provider_err("embedding", e))
}

// ============ OpenAI ============

pub struct OpenAiEmbeddings {
    client: reqwest::Client,
    api_key: String,
    model: String,
    url: String,
}

impl OpenAiEmbeddings {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| provider_err("embedding", "OPENAI_API_KEY not set"))?;
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            api_key,
            model: config.model.clone(),
            url: config
                .url
                .clone()
                .unwrap_or_else(|| "https://api.openai.com/v1/embeddings".to_string()),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddings {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| provider_err("embedding", e))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(provider_err(
                "embedding",
                format!("OpenAI API error {}: {}", status, body_text),
            ));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| provider_err("embedding", e))?;
        parse_openai_response(&json)
    }
}

fn parse_openai_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| provider_err("embedding", "invalid response: missing data array"))?;

    let mut embeddings = Vec::with_capacity(data.len());
    for item in data {
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| provider_err("embedding", "invalid response: missing embedding"))?;
        let vec: Vec<f32> = embedding
            .iter()
            .map(|v| {
                v.as_f64().map(|f| f as f32).ok_or_else(|| {
                    provider_err("embedding", "invalid response: non-numeric embedding value")
                })
            })
            .collect::<Result<_>>()?;
        embeddings.push(vec);
    }
    Ok(embeddings)
}

// ============ Ollama ============

pub struct OllamaEmbeddings {
    client: reqwest::Client,
    model: String,
    url: String,
}

impl OllamaEmbeddings {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            model: config.model.clone(),
            url: config
                .url
                .clone()
                .unwrap_or_else(|| "http://localhost:11434".to_string()),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddings {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let response = self
            .client
            .post(format!("{}/api/embed", self.url))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                provider_err(
                    "embedding",
                    format!("Ollama connection error (is Ollama running at {}?): {}", self.url, e),
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(provider_err(
                "embedding",
                format!("Ollama API error {}: {}", status, body_text),
            ));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| provider_err("embedding", e))?;
        parse_ollama_response(&json)
    }
}

fn parse_ollama_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let embeddings = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| provider_err("embedding", "invalid response: missing embeddings array"))?;

    let mut result = Vec::with_capacity(embeddings.len());
    for embedding in embeddings {
        let vec: Vec<f32> = embedding
            .as_array()
            .ok_or_else(|| provider_err("embedding", "invalid response: embedding not an array"))?
            .iter()
            .map(|v| {
                v.as_f64().map(|f| f as f32).ok_or_else(|| {
                    provider_err("embedding", "invalid response: non-numeric embedding value")
                })
            })
            .collect::<Result<_>>()?;
        result.push(vec);
    }
    Ok(result)
}

/// Create the configured [`EmbeddingProvider`].
pub fn create_provider(config: &EmbeddingConfig) -> Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "openai" => Ok(Box::new(OpenAiEmbeddings::new(config)?)),
        "ollama" => Ok(Box::new(OllamaEmbeddings::new(config)?)),
        other => Err(Error::Config(format!(
            "unknown embedding provider: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_openai_embeddings() {
        let json = serde_json::json!({
            "data": [
                {"index": 0, "embedding": [0.1, 0.2]},
                {"index": 1, "embedding": [0.3, 0.4]}
            ]
        });
        let vecs = parse_openai_response(&json).unwrap();
        assert_eq!(vecs.len(), 2);
        assert_eq!(vecs[0], vec![0.1, 0.2]);
    }

    #[test]
    fn malformed_openai_response_is_provider_error() {
        let json = serde_json::json!({"unexpected": true});
        let err = parse_openai_response(&json).unwrap_err();
        assert!(matches!(err, Error::ProviderUnavailable { .. }));
    }

    #[test]
    fn parse_ollama_embeddings() {
        let json = serde_json::json!({"embeddings": [[1.0, 0.0], [0.0, 1.0]]});
        let vecs = parse_ollama_response(&json).unwrap();
        assert_eq!(vecs[1], vec![0.0, 1.0]);
    }

    #[test]
    fn non_numeric_embedding_value_is_an_error_not_zero() {
        let json = serde_json::json!({
            "data": [{"index": 0, "embedding": [0.1, "NaN", 0.3]}]
        });
        let err = parse_openai_response(&json).unwrap_err();
        assert!(matches!(err, Error::ProviderUnavailable { .. }));

        let json = serde_json::json!({"embeddings": [[1.0, null]]});
        let err = parse_ollama_response(&json).unwrap_err();
        assert!(matches!(err, Error::ProviderUnavailable { .. }));
    }
}
