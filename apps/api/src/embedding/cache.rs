use std::sync::Arc;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tracing::{debug, warn};

use super::{Embedder, EmbeddingError};

const KEY_PREFIX: &str = "skillmatch:embedding";

/// Write-through Redis cache in front of another embedder.
///
/// Embeddings are deterministic per (backend, dimension, text), so entries
/// never expire. Redis failures are logged and the inner embedder is used.
pub struct CachedEmbedder {
    inner: Arc<dyn Embedder>,
    conn: MultiplexedConnection,
}

impl CachedEmbedder {
    pub fn new(inner: Arc<dyn Embedder>, conn: MultiplexedConnection) -> Self {
        Self { inner, conn }
    }

    async fn lookup(&self, key: &str) -> Option<Vec<f32>> {
        let mut conn = self.conn.clone();
        let cached: Option<String> = match conn.get(key).await {
            Ok(v) => v,
            Err(e) => {
                warn!("Embedding cache read failed for {key}: {e}");
                return None;
            }
        };
        cached.and_then(|raw| decode_vector(&raw, self.inner.dimension()))
    }

    async fn store(&self, key: &str, vector: &[f32]) {
        let payload = match serde_json::to_string(vector) {
            Ok(p) => p,
            Err(e) => {
                warn!("Embedding cache encode failed for {key}: {e}");
                return;
            }
        };
        let mut conn = self.conn.clone();
        if let Err(e) = conn.set::<_, _, ()>(key, payload).await {
            warn!("Embedding cache write failed for {key}: {e}");
        }
    }
}

fn cache_key(backend: &str, dimension: usize, text: &str) -> String {
    format!("{KEY_PREFIX}:{backend}:{dimension}:{text}")
}

/// Decodes a cached vector, discarding entries of the wrong length.
fn decode_vector(raw: &str, dimension: usize) -> Option<Vec<f32>> {
    serde_json::from_str::<Vec<f32>>(raw)
        .ok()
        .filter(|v| v.len() == dimension)
}

#[async_trait]
impl Embedder for CachedEmbedder {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let key = cache_key(self.inner.name(), self.inner.dimension(), text);
        if let Some(vector) = self.lookup(&key).await {
            return Ok(vector);
        }
        let vector = self.inner.embed(text).await?;
        self.store(&key, &vector).await;
        Ok(vector)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut resolved: Vec<Option<Vec<f32>>> = Vec::with_capacity(texts.len());
        let mut misses = Vec::new();

        for (i, text) in texts.iter().enumerate() {
            let key = cache_key(self.inner.name(), self.inner.dimension(), text);
            let hit = self.lookup(&key).await;
            if hit.is_none() {
                misses.push(i);
            }
            resolved.push(hit);
        }

        debug!(
            "Embedding cache: {} hits, {} misses",
            texts.len() - misses.len(),
            misses.len()
        );

        let fresh = if misses.is_empty() {
            Vec::new()
        } else {
            let to_embed: Vec<String> = misses.iter().map(|&i| texts[i].clone()).collect();
            self.inner.embed_batch(&to_embed).await?
        };

        for (&i, vector) in misses.iter().zip(&fresh) {
            let key = cache_key(self.inner.name(), self.inner.dimension(), &texts[i]);
            self.store(&key, vector).await;
        }

        merge_fresh(resolved, &misses, fresh)
    }
}

/// Fills the cache misses (positions in `misses`) with `fresh` vectors, in order.
/// Fails if the inner embedder returned a different number of vectors.
fn merge_fresh(
    mut resolved: Vec<Option<Vec<f32>>>,
    misses: &[usize],
    fresh: Vec<Vec<f32>>,
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    if fresh.len() != misses.len() {
        return Err(EmbeddingError::MalformedResponse(format!(
            "expected {} fresh embeddings, got {}",
            misses.len(),
            fresh.len()
        )));
    }
    for (&i, vector) in misses.iter().zip(fresh) {
        resolved[i] = Some(vector);
    }
    resolved
        .into_iter()
        .map(|v| {
            v.ok_or_else(|| {
                EmbeddingError::MalformedResponse("embedder returned too few vectors".into())
            })
        })
        .collect()
}
