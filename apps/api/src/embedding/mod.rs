//! Embedding: pluggable, trait-based text → vector backends.
//!
//! Default: `HashEmbedder` (feature hashing, deterministic, no network).
//! Alternative: `ApiEmbedder` (OpenAI-compatible `/v1/embeddings`).
//! Either can be wrapped in `CachedEmbedder` when `REDIS_URL` is configured.
//!
//! `AppState` holds an `Arc<dyn Embedder>`, chosen once at startup via config.

use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::config::Config;
use crate::retry::RetryError;

pub mod api;
pub mod cache;
pub mod hash;

pub use api::ApiEmbedder;
pub use cache::CachedEmbedder;
pub use hash::HashEmbedder;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("cannot embed empty text")]
    EmptyInput,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("malformed embedding response: {0}")]
    MalformedResponse(String),

    #[error("Gave up after {attempts} attempts")]
    Exhausted { attempts: u32 },
}

impl From<RetryError> for EmbeddingError {
    fn from(err: RetryError) -> Self {
        match err {
            RetryError::Http(e) => EmbeddingError::Http(e),
            RetryError::Api { status, message } => EmbeddingError::Api { status, message },
            RetryError::Exhausted { attempts } => EmbeddingError::Exhausted { attempts },
        }
    }
}

/// The embedder trait. Implement this to swap backends without touching
/// the matcher, handlers, or callers.
///
/// Implementations must be deterministic for a given text and model version,
/// and must return vectors of `dimension()` length.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Backend label, used in logs and cache keys.
    fn name(&self) -> &str;

    fn dimension(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Embeds several texts, returning vectors in input order.
    /// Backends with a batch endpoint should override this.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }
}

/// Which embedder backend to construct at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedderKind {
    Hash,
    Api,
}

impl FromStr for EmbedderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "hash" => Ok(EmbedderKind::Hash),
            "api" => Ok(EmbedderKind::Api),
            other => anyhow::bail!("unknown embedder '{other}', expected 'hash' or 'api'"),
        }
    }
}

/// Builds the configured embedder, wrapping it in the Redis cache when enabled.
pub async fn build_embedder(config: &Config) -> Result<Arc<dyn Embedder>> {
    let inner: Arc<dyn Embedder> = match config.embedder {
        EmbedderKind::Hash => Arc::new(HashEmbedder::new(config.embedding_dimensions)),
        EmbedderKind::Api => {
            let api_key = config
                .embedding_api_key
                .clone()
                .context("EMBEDDING_API_KEY must be set when EMBEDDER=api")?;
            Arc::new(ApiEmbedder::new(
                &config.embedding_api_url,
                api_key,
                config.embedding_model.clone(),
                config.embedding_dimensions,
            )?)
        }
    };
    info!(
        "Embedder initialized (backend: {}, dimension: {})",
        inner.name(),
        inner.dimension()
    );

    match &config.redis_url {
        Some(url) => {
            let client = redis::Client::open(url.as_str())
                .context("REDIS_URL is not a valid redis connection string")?;
            let conn = client
                .get_multiplexed_async_connection()
                .await
                .context("Failed to connect to Redis for the embedding cache")?;
            info!("Embedding cache enabled (redis)");
            Ok(Arc::new(CachedEmbedder::new(inner, conn)))
        }
        None => Ok(inner),
    }
}
