//! OpenAI-compatible embeddings endpoint.

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::provider::{check_dimension, EmbeddingError, EmbeddingProvider};
use crate::config::EmbeddingConfig;

/// Configuration for the HTTP embedding provider.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// API base URL (e.g., "https://api.openai.com/v1")
    pub base_url: String,
    pub model: String,
    pub api_key: String,
    pub dimension: usize,
    pub batch_size: usize,
    pub timeout: Duration,
}

impl OpenAiConfig {
    /// Build from the `[embedding]` section, reading the key from `api_key_env`.
    ///
    /// A missing or empty key is a configuration error, surfaced before any request.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            EmbeddingError::InitializationError(format!(
                "Environment variable {} is not set",
                config.api_key_env
            ))
        })?;

        if api_key.trim().is_empty() {
            return Err(EmbeddingError::InitializationError(format!(
                "Environment variable {} is empty",
                config.api_key_env
            )));
        }

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            dimension: config.dimension,
            batch_size: config.batch_size,
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

/// Blocking client for `POST {base_url}/embeddings`.
pub struct OpenAiProvider {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiConfig) -> Result<Self, EmbeddingError> {
        if config.dimension == 0 {
            return Err(EmbeddingError::InitializationError(
                "Embedding dimension must be greater than 0".to_string(),
            ));
        }
        if config.batch_size == 0 {
            return Err(EmbeddingError::InitializationError(
                "Batch size must be greater than 0".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| EmbeddingError::InitializationError(e.to_string()))?;

        tracing::info!(
            "Initialized embedding endpoint {} with model {} ({}D)",
            config.base_url,
            config.model,
            config.dimension
        );

        Ok(Self { client, config })
    }

    fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        debug!(count = texts.len(), "Requesting embeddings");

        let response = self
            .client
            .post(format!("{}/embeddings", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&EmbeddingRequest {
                model: &self.config.model,
                input: texts,
            })
            .send()
            .map_err(|e| EmbeddingError::GenerationError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(EmbeddingError::GenerationError(format!(
                "API returned {}: {}",
                status, body
            )));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .map_err(|e| EmbeddingError::GenerationError(format!("Malformed response: {}", e)))?;

        order_embeddings(parsed.data, texts.len(), self.config.dimension)
    }
}

/// Put response items back into request order and validate them.
fn order_embeddings(
    mut data: Vec<EmbeddingData>,
    expected: usize,
    dimension: usize,
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    if data.len() != expected {
        return Err(EmbeddingError::CountMismatch {
            expected,
            actual: data.len(),
        });
    }

    data.sort_by_key(|d| d.index);

    let mut embeddings = Vec::with_capacity(expected);
    for (position, item) in data.into_iter().enumerate() {
        if item.index != position {
            return Err(EmbeddingError::GenerationError(format!(
                "Response is missing embedding for input {}",
                position
            )));
        }
        check_dimension(dimension, &item.embedding)?;
        embeddings.push(item.embedding);
    }

    Ok(embeddings)
}

impl EmbeddingProvider for OpenAiProvider {
    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        if texts.len() > self.config.batch_size {
            return Err(EmbeddingError::InvalidInput(format!(
                "Batch of {} exceeds provider limit {}",
                texts.len(),
                self.config.batch_size
            )));
        }

        self.request(texts)
    }

    fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::InvalidInput("Empty text".to_string()));
        }

        self.request(&[text.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::GenerationError("No embeddings generated".to_string()))
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }

    fn max_batch_size(&self) -> usize {
        self.config.batch_size
    }
}
