// Skill matching engine.
// Implements: phrase normalization, flat inner-product index, threshold matcher.
// Embedding goes through the `Embedder` trait; no backend-specific calls here.

pub mod handlers;
pub mod index;
pub mod matcher;
pub mod normalize;

use thiserror::Error;

use crate::embedding::EmbeddingError;

#[derive(Debug, Error)]
pub enum MatchError {
    /// The embedder failed for some phrase. The whole match is aborted since
    /// a partial skill set would skew the average similarity.
    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}
