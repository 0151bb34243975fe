use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use siphasher::sip::SipHasher13;

use super::{Embedder, EmbeddingError};

// Changing any seed changes every vector; cached embeddings keyed on
// `name()` must be invalidated by bumping the name.
const BUCKET_SEED_K0: u64 = 0x0123_4567_89ab_cdef;
const BUCKET_SEED_K1: u64 = 0xfedc_ba98_7654_3210;
const SIGN_SEED_K0: u64 = 0x9e37_79b9_7f4a_7c15;
const SIGN_SEED_K1: u64 = 0xc2b2_ae3d_27d4_eb4f;

const WORD_WEIGHT: f32 = 1.0;
const TRIGRAM_WEIGHT: f32 = 0.5;

/// Feature-hashing embedder for short skill phrases.
///
/// Each word contributes a whole-word feature plus its padded character
/// trigrams, so "postgres" and "postgresql" land close together while
/// unrelated words stay near-orthogonal. Not semantic: "java" and
/// "kotlin" are no closer than "java" and "excel".
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn bucket(&self, feature: &str) -> usize {
        let mut hasher = SipHasher13::new_with_keys(BUCKET_SEED_K0, BUCKET_SEED_K1);
        feature.hash(&mut hasher);
        (hasher.finish() % self.dimension as u64) as usize
    }

    fn sign(feature: &str) -> f32 {
        let mut hasher = SipHasher13::new_with_keys(SIGN_SEED_K0, SIGN_SEED_K1);
        feature.hash(&mut hasher);
        if hasher.finish() % 2 == 0 {
            1.0
        } else {
            -1.0
        }
    }

    fn add_feature(&self, vector: &mut [f32], feature: &str, weight: f32) {
        vector[self.bucket(feature)] += Self::sign(feature) * weight;
    }

    /// Synchronous core of `embed`, usable without a runtime.
    pub fn embed_sync(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let lowered = text.trim().to_lowercase();
        let words: Vec<&str> = lowered
            .split(|c: char| !(c.is_alphanumeric() || matches!(c, '+' | '#' | '.')))
            .map(|w| w.trim_matches('.'))
            .filter(|w| !w.is_empty())
            .collect();

        if words.is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        let mut vector = vec![0.0f32; self.dimension];
        for word in &words {
            self.add_feature(&mut vector, &format!("w:{word}"), WORD_WEIGHT);

            let padded: Vec<char> = format!("#{word}#").chars().collect();
            for window in padded.windows(3) {
                let trigram: String = window.iter().collect();
                self.add_feature(&mut vector, &format!("g:{trigram}"), TRIGRAM_WEIGHT);
            }
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        Ok(vector)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn name(&self) -> &str {
        "hash-v1"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.embed_sync(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn test_vectors_are_unit_length() {
        let embedder = HashEmbedder::new(256);
        let v = embedder.embed_sync("distributed systems").unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5, "norm was {norm}");
        assert_eq!(v.len(), 256);
    }

    #[test]
    fn test_same_text_same_vector() {
        let embedder = HashEmbedder::new(128);
        assert_eq!(
            embedder.embed_sync("Kubernetes").unwrap(),
            embedder.embed_sync("kubernetes").unwrap()
        );
    }

    #[test]
    fn test_shared_words_score_higher_than_unrelated() {
        let embedder = HashEmbedder::new(256);
        let phrase = embedder.embed_sync("python programming").unwrap();
        let python = embedder.embed_sync("python").unwrap();
        let java = embedder.embed_sync("java").unwrap();
        assert!(dot(&phrase, &python) > dot(&phrase, &java));
        assert!(dot(&phrase, &python) > 0.5);
    }

    #[test]
    fn test_blank_text_is_rejected() {
        let embedder = HashEmbedder::new(64);
        assert!(matches!(
            embedder.embed_sync("   "),
            Err(EmbeddingError::EmptyInput)
        ));
        assert!(matches!(
            embedder.embed_sync("--"),
            Err(EmbeddingError::EmptyInput)
        ));
    }

    #[test]
    fn test_symbol_heavy_skills_are_distinct() {
        let embedder = HashEmbedder::new(256);
        let cpp = embedder.embed_sync("c++").unwrap();
        let csharp = embedder.embed_sync("c#").unwrap();
        assert_ne!(cpp, csharp);
    }

    #[test]
    fn test_zero_dimension_is_clamped() {
        let embedder = HashEmbedder::new(0);
        assert_eq!(embedder.dimension(), 1);
        assert_eq!(embedder.embed_sync("rust").unwrap().len(), 1);
    }
}
