//! Remote embedding provider.
//!
//! Implements [`EmbeddingProvider`] against an OpenAI-compatible
//! `POST {base_url}/embeddings` endpoint. The call is blocking reqwest;
//! async callers wrap it in `spawn_blocking`.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use super::{EmbeddingError, EmbeddingProvider, EMBEDDING_DIM};
use crate::config::EmbeddingConfig;

/// HTTP client for an OpenAI-compatible embeddings endpoint.
pub struct RemoteEmbeddingProvider {
    client: Client,
    url: String,
    model: String,
    api_key: String,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

impl RemoteEmbeddingProvider {
    pub fn new(config: &EmbeddingConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let url = format!("{}/embeddings", config.base_url.trim_end_matches('/'));
        tracing::info!(url = %url, model = %config.model, "embedding provider ready");

        Ok(Self {
            client,
            url,
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

impl EmbeddingProvider for RemoteEmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::MalformedInput);
        }

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: text,
            })
            .send()
            .map_err(|e| EmbeddingError::Unavailable(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EmbeddingError::Unavailable(format!(
                "generator returned HTTP {status}"
            )));
        }

        let body: EmbeddingResponse = response
            .json()
            .map_err(|e| EmbeddingError::Unavailable(format!("malformed response: {e}")))?;

        let vector = body
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| EmbeddingError::Unavailable("response contained no embedding".into()))?;

        if vector.len() != EMBEDDING_DIM {
            return Err(EmbeddingError::Unavailable(format!(
                "expected {EMBEDDING_DIM} dimensions, got {}",
                vector.len()
            )));
        }

        Ok(vector)
    }
}
