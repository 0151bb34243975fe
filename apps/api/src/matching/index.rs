//! Nearest-neighbor index over unit vectors.
//!
//! `FlatIpIndex` is an exact, brute-force inner-product index. Skill lists are
//! tens to hundreds of phrases, so a linear scan beats any graph index here.

use std::cmp::Ordering;

use serde::Serialize;

use crate::matching::MatchError;

/// A search hit: position of the vector at insertion time and its similarity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Neighbor {
    pub index: usize,
    pub similarity: f32,
}

/// Top-k similarity search over a fixed set of vectors.
pub trait NearestNeighborIndex: Sized {
    /// Builds the index. Every vector must have `dimension` components.
    fn build(dimension: usize, vectors: Vec<Vec<f32>>) -> Result<Self, MatchError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns up to `k` neighbors ordered by descending similarity.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, MatchError>;
}

/// Exact inner-product index. With L2-normalized inputs the score is cosine
/// similarity. Ties keep insertion order, so the first-inserted vector wins.
#[derive(Debug, Clone)]
pub struct FlatIpIndex {
    dimension: usize,
    vectors: Vec<Vec<f32>>,
}

impl NearestNeighborIndex for FlatIpIndex {
    fn build(dimension: usize, vectors: Vec<Vec<f32>>) -> Result<Self, MatchError> {
        if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
            return Err(MatchError::DimensionMismatch {
                expected: dimension,
                actual: bad.len(),
            });
        }
        Ok(Self { dimension, vectors })
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, MatchError> {
        if query.len() != self.dimension {
            return Err(MatchError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut hits: Vec<Neighbor> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(index, v)| Neighbor {
                index,
                similarity: inner_product(query, v),
            })
            .collect();

        // Stable sort: equal scores stay in insertion order.
        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(Ordering::Equal)
        });
        hits.truncate(k);
        Ok(hits)
    }
}

/// Values this close to ±1 are rounding noise from normalizing in f32.
const UNIT_EPSILON: f64 = 1e-6;

/// Inner product of unit vectors, accumulated in f64 and kept in [-1, 1].
/// A phrase compared with itself scores exactly 1.0.
#[inline]
fn inner_product(a: &[f32], b: &[f32]) -> f32 {
    let dot: f64 = a
        .iter()
        .zip(b)
        .map(|(x, y)| f64::from(*x) * f64::from(*y))
        .sum();
    let dot = dot.clamp(-1.0, 1.0);
    let snapped = if 1.0 - dot.abs() < UNIT_EPSILON {
        dot.signum()
    } else {
        dot
    };
    snapped as f32
}
