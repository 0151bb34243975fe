//! OpenAI-compatible embedding client.
//!
//! Speaks `POST {base}/v1/embeddings` with bearer auth, which covers OpenAI,
//! Voyage, Ollama's compatibility layer and most self-hosted gateways.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Embedder, EmbeddingError};
use crate::retry::send_with_retry;

/// Inputs per request; larger batches are split.
const MAX_BATCH: usize = 256;

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Clone)]
pub struct ApiEmbedder {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    dimension: usize,
}

impl ApiEmbedder {
    pub fn new(
        base_url: &str,
        api_key: String,
        model: String,
        dimension: usize,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to build embedding HTTP client")?;

        Ok(Self {
            client,
            endpoint: format!("{}/v1/embeddings", base_url.trim_end_matches('/')),
            api_key,
            model,
            dimension,
        })
    }

    /// One request for at most `MAX_BATCH` inputs.
    async fn request(&self, input: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let body = EmbeddingRequest {
            model: &self.model,
            input,
        };

        let response = send_with_retry("Embedding request", Duration::from_millis(500), || {
            self.client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&body)
        })
        .await?;

        let parsed: EmbeddingResponse = response.json().await?;
        debug!(
            "Embedding call succeeded: model={}, inputs={}",
            self.model,
            input.len()
        );
        vectors_from_response(parsed, input.len(), self.dimension)
    }
}

/// Reorders response data by `index` and checks count and dimension.
fn vectors_from_response(
    mut response: EmbeddingResponse,
    expected: usize,
    dimension: usize,
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    if response.data.len() != expected {
        return Err(EmbeddingError::MalformedResponse(format!(
            "expected {expected} embeddings, got {}",
            response.data.len()
        )));
    }

    response.data.sort_by_key(|d| d.index);

    let mut vectors = Vec::with_capacity(expected);
    for (position, datum) in response.data.into_iter().enumerate() {
        if datum.index != position {
            return Err(EmbeddingError::MalformedResponse(format!(
                "missing embedding for input {position}"
            )));
        }
        if datum.embedding.len() != dimension {
            return Err(EmbeddingError::MalformedResponse(format!(
                "embedding {position} has {} dimensions, expected {dimension}",
                datum.embedding.len()
            )));
        }
        vectors.push(datum.embedding);
    }
    Ok(vectors)
}

#[async_trait]
impl Embedder for ApiEmbedder {
    fn name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| EmbeddingError::MalformedResponse("empty data array".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.iter().any(|t| t.trim().is_empty()) {
            return Err(EmbeddingError::EmptyInput);
        }

        let mut vectors = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(MAX_BATCH) {
            vectors.extend(self.request(chunk).await?);
        }
        Ok(vectors)
    }
}
