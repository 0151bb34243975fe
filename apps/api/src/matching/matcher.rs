//! Skill Matcher: embeds two skill collections and pairs every source phrase
//! with its nearest target phrase, accepting the pair above a similarity threshold.
//!
//! Algorithm:
//! 1. Normalize (trim, lower-case) and deduplicate both collections
//! 2. Embed every phrase, L2-normalize so inner product == cosine similarity
//! 3. Build a flat index over the target vectors
//! 4. Query k=1 for each source vector; accept when similarity ≥ threshold
//! 5. score = mean accepted similarity × 100, rounded to 2 decimals (0.0 if none)
//! 6. matched_target = targets hit by an accepted match; the rest are unmatched

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::embedding::{Embedder, EmbeddingError};
use crate::matching::index::{FlatIpIndex, NearestNeighborIndex};
use crate::matching::normalize::{l2_normalize, normalize_skills};
use crate::matching::MatchError;

pub const DEFAULT_THRESHOLD: f32 = 0.5;

/// Cosine thresholds outside [-1, 1] can never (or always) match.
pub fn is_valid_threshold(threshold: f32) -> bool {
    (-1.0..=1.0).contains(&threshold)
}

// ────────────────────────────────────────────────────────────────────────────
// Output data models
// ────────────────────────────────────────────────────────────────────────────

/// What happened to a single source phrase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MatchOutcome {
    Matched {
        target: String,
        similarity: f32,
    },
    /// Below threshold, or no targets at all (`best_similarity` is `None`).
    Unmatched {
        best_similarity: Option<f32>,
    },
}

/// Aggregate result of matching a source collection against a target collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchReport {
    /// Mean accepted similarity as a percentage, 2 decimals. 0.0 when nothing matched.
    pub score: f64,
    pub threshold: f32,
    pub matched_target: BTreeSet<String>,
    pub unmatched_target: BTreeSet<String>,
    pub unmatched_source: BTreeSet<String>,
    /// One entry per normalized source phrase.
    pub outcomes: BTreeMap<String, MatchOutcome>,
}

// ────────────────────────────────────────────────────────────────────────────
// Synchronous kernel
// ────────────────────────────────────────────────────────────────────────────

/// Matches raw skill collections using `embed` and a `FlatIpIndex`.
pub fn match_skills<F>(
    source: impl IntoIterator<Item = impl AsRef<str>>,
    target: impl IntoIterator<Item = impl AsRef<str>>,
    threshold: f32,
    embed: F,
) -> Result<MatchReport, MatchError>
where
    F: FnMut(&str) -> Result<Vec<f32>, EmbeddingError>,
{
    let source = normalize_skills(source);
    let target = normalize_skills(target);
    match_normalized::<FlatIpIndex, F>(&source, &target, threshold, embed)
}

/// Matches already-normalized collections using the index type `X`.
///
/// Target phrases are inserted in set order, so on equal similarity the
/// lexicographically smallest target wins.
pub fn match_normalized<X, F>(
    source: &BTreeSet<String>,
    target: &BTreeSet<String>,
    threshold: f32,
    mut embed: F,
) -> Result<MatchReport, MatchError>
where
    X: NearestNeighborIndex,
    F: FnMut(&str) -> Result<Vec<f32>, EmbeddingError>,
{
    debug!(
        "Matching {} source phrases against {} target phrases (threshold {threshold})",
        source.len(),
        target.len()
    );

    let mut dimension = None;
    let source_vectors = embed_phrases(source, &mut embed, &mut dimension)?;
    let target_vectors = embed_phrases(target, &mut embed, &mut dimension)?;

    let target_phrases: Vec<&String> = target.iter().collect();
    let index = X::build(dimension.unwrap_or(0), target_vectors)?;
    if index.is_empty() && !source.is_empty() {
        debug!("No target phrases; all {} source phrases are unmatched", source.len());
    }

    let mut outcomes = BTreeMap::new();
    let mut matched_target = BTreeSet::new();
    let mut unmatched_source = BTreeSet::new();
    let mut similarity_sum = 0.0_f64;
    let mut match_count = 0_usize;

    for (phrase, vector) in source.iter().zip(&source_vectors) {
        let best = index.search(vector, 1)?.into_iter().next();

        let outcome = match best {
            Some(hit) if hit.similarity >= threshold => {
                let target_phrase = target_phrases[hit.index].clone();
                similarity_sum += f64::from(hit.similarity);
                match_count += 1;
                matched_target.insert(target_phrase.clone());
                MatchOutcome::Matched {
                    target: target_phrase,
                    similarity: hit.similarity,
                }
            }
            other => {
                unmatched_source.insert(phrase.clone());
                MatchOutcome::Unmatched {
                    best_similarity: other.map(|hit| hit.similarity),
                }
            }
        };
        outcomes.insert(phrase.clone(), outcome);
    }

    let average = if match_count > 0 {
        similarity_sum / match_count as f64
    } else {
        0.0
    };

    let unmatched_target = target.difference(&matched_target).cloned().collect();

    Ok(MatchReport {
        score: to_percentage(average),
        threshold,
        matched_target,
        unmatched_target,
        unmatched_source,
        outcomes,
    })
}

/// Embeds and L2-normalizes each phrase, enforcing one dimension across calls.
fn embed_phrases<F>(
    phrases: &BTreeSet<String>,
    embed: &mut F,
    dimension: &mut Option<usize>,
) -> Result<Vec<Vec<f32>>, MatchError>
where
    F: FnMut(&str) -> Result<Vec<f32>, EmbeddingError>,
{
    let mut vectors = Vec::with_capacity(phrases.len());
    for phrase in phrases {
        let mut vector = embed(phrase).map_err(|e| {
            warn!("Embedding failed for '{phrase}': {e}");
            MatchError::Embedding(e)
        })?;

        match *dimension {
            Some(expected) if expected != vector.len() => {
                return Err(MatchError::DimensionMismatch {
                    expected,
                    actual: vector.len(),
                });
            }
            Some(_) => {}
            None => *dimension = Some(vector.len()),
        }

        l2_normalize(&mut vector);
        vectors.push(vector);
    }
    Ok(vectors)
}

fn to_percentage(average: f64) -> f64 {
    (average * 100.0 * 100.0).round() / 100.0
}

// ────────────────────────────────────────────────────────────────────────────
// Async service wrapper
// ────────────────────────────────────────────────────────────────────────────

/// Binds the kernel to an injected embedder. Phrases are embedded in one
/// batch up front, then the synchronous kernel runs over the lookup table.
#[derive(Clone)]
pub struct SkillMatcher {
    embedder: Arc<dyn Embedder>,
    default_threshold: f32,
}

impl SkillMatcher {
    pub fn new(embedder: Arc<dyn Embedder>, default_threshold: f32) -> Self {
        Self {
            embedder,
            default_threshold,
        }
    }

    pub fn embedder_name(&self) -> &str {
        self.embedder.name()
    }

    pub async fn match_skills(
        &self,
        source: &[String],
        target: &[String],
        threshold: Option<f32>,
    ) -> Result<MatchReport, MatchError> {
        let threshold = threshold.unwrap_or(self.default_threshold);
        let source = normalize_skills(source);
        let target = normalize_skills(target);

        let phrases: Vec<String> = source.union(&target).cloned().collect();
        let vectors = if phrases.is_empty() {
            Vec::new()
        } else {
            self.embedder.embed_batch(&phrases).await?
        };
        if vectors.len() != phrases.len() {
            return Err(MatchError::Embedding(EmbeddingError::MalformedResponse(
                format!(
                    "expected {} embeddings, got {}",
                    phrases.len(),
                    vectors.len()
                ),
            )));
        }

        let lookup: HashMap<&str, Vec<f32>> =
            phrases.iter().map(String::as_str).zip(vectors).collect();

        let report = match_skills(&source, &target, threshold, |phrase| {
            lookup.get(phrase).cloned().ok_or_else(|| {
                EmbeddingError::MalformedResponse(format!("no embedding for '{phrase}'"))
            })
        })?;

        info!(
            "Skill match: score={} matched={}/{} unmatched_source={} (embedder: {})",
            report.score,
            report.matched_target.len(),
            target.len(),
            report.unmatched_source.len(),
            self.embedder.name()
        );

        Ok(report)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbedder;

    /// Embedder backed by a fixed phrase → vector table.
    fn table<K: AsRef<str>>(
        entries: &[(K, Vec<f32>)],
    ) -> impl FnMut(&str) -> Result<Vec<f32>, EmbeddingError> {
        let map: HashMap<String, Vec<f32>> = entries
            .iter()
            .map(|(k, v)| (k.as_ref().to_string(), v.clone()))
            .collect();
        move |phrase: &str| map.get(phrase).cloned().ok_or(EmbeddingError::EmptyInput)
    }

    /// One-hot vectors: injective, and distinct phrases are orthogonal.
    fn one_hot(phrases: &[&str]) -> Vec<(String, Vec<f32>)> {
        phrases
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let mut v = vec![0.0; phrases.len()];
                v[i] = 1.0;
                (p.to_string(), v)
            })
            .collect()
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn python_scenario() -> Vec<(&'static str, Vec<f32>)> {
        vec![
            ("python programming", vec![1.0, 0.0, 0.0]),
            ("python", vec![0.9, (1.0f32 - 0.81).sqrt(), 0.0]),
            ("java", vec![0.1, 0.0, (1.0f32 - 0.01).sqrt()]),
        ]
    }

    #[test]
    fn test_python_scenario_scores_ninety() {
        let report = match_skills(
            ["python programming"],
            ["python", "java"],
            0.5,
            table(&python_scenario()),
        )
        .unwrap();

        assert_eq!(report.score, 90.0);
        assert_eq!(report.matched_target, set(&["python"]));
        assert_eq!(report.unmatched_target, set(&["java"]));
        assert!(report.unmatched_source.is_empty());
        match &report.outcomes["python programming"] {
            MatchOutcome::Matched { target, similarity } => {
                assert_eq!(target, "python");
                assert!((similarity - 0.9).abs() < 1e-5);
            }
            other => panic!("expected a match, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_source_leaves_every_target_unmatched() {
        let report = match_skills(
            Vec::<String>::new(),
            ["sql", "excel"],
            0.5,
            table(&one_hot(&["sql", "excel"])),
        )
        .unwrap();

        assert_eq!(report.score, 0.0);
        assert!(report.matched_target.is_empty());
        assert_eq!(report.unmatched_target, set(&["sql", "excel"]));
    }

    #[test]
    fn test_empty_target_leaves_every_source_unmatched() {
        let report = match_skills(
            ["rust", "go"],
            Vec::<String>::new(),
            0.5,
            table(&one_hot(&["rust", "go"])),
        )
        .unwrap();

        assert_eq!(report.score, 0.0);
        assert!(report.matched_target.is_empty());
        assert!(report.unmatched_target.is_empty());
        assert_eq!(report.unmatched_source, set(&["rust", "go"]));
        assert_eq!(
            report.outcomes["rust"],
            MatchOutcome::Unmatched {
                best_similarity: None
            }
        );
    }

    #[test]
    fn test_both_empty_is_zero_report() {
        let report = match_skills(
            Vec::<String>::new(),
            Vec::<String>::new(),
            0.5,
            table::<&str>(&[]),
        )
        .unwrap();
        assert_eq!(report.score, 0.0);
        assert!(report.outcomes.is_empty());
    }

    #[test]
    fn test_disjoint_orthogonal_skills_score_zero() {
        let vectors = one_hot(&["rust", "kafka", "excel", "figma"]);
        let report = match_skills(["rust", "kafka"], ["excel", "figma"], 0.5, table(&vectors)).unwrap();

        assert_eq!(report.score, 0.0);
        assert!(report.matched_target.is_empty());
        assert_eq!(report.unmatched_source, set(&["rust", "kafka"]));
    }

    #[test]
    fn test_identical_collections_score_hundred() {
        let skills = ["rust", "sql", "docker"];
        let report = match_skills(skills, skills, 0.5, table(&one_hot(&skills))).unwrap();

        assert_eq!(report.score, 100.0);
        assert!(report.unmatched_target.is_empty());
        assert_eq!(report.matched_target, set(&skills));
    }

    #[test]
    fn test_targets_are_partitioned() {
        let vectors = python_scenario();
        for threshold in [-1.0, 0.0, 0.05, 0.5, 0.95, 1.0] {
            let report = match_skills(
                ["python programming"],
                ["python", "java"],
                threshold,
                table(&vectors),
            )
            .unwrap();

            let union: BTreeSet<String> = report
                .matched_target
                .union(&report.unmatched_target)
                .cloned()
                .collect();
            assert_eq!(union, set(&["python", "java"]));
            assert!(report.matched_target.is_disjoint(&report.unmatched_target));
        }
    }

    #[test]
    fn test_raising_threshold_never_adds_matches() {
        let vectors = vec![
            ("a", vec![1.0, 0.0]),
            ("b", vec![0.0, 1.0]),
            ("x", vec![0.8, 0.6]),
            ("y", vec![0.3, 0.954]),
        ];
        let mut previous: Option<BTreeSet<String>> = None;
        for step in 0..=20 {
            let threshold = -1.0 + step as f32 * 0.1;
            let report = match_skills(["a", "b"], ["x", "y"], threshold, table(&vectors)).unwrap();
            if let Some(prev) = &previous {
                assert!(
                    report.matched_target.is_subset(prev),
                    "threshold {threshold} added matches"
                );
            }
            previous = Some(report.matched_target);
        }
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let vectors = vec![("a", vec![1.0, 0.0]), ("b", vec![1.0, 0.0])];
        let report = match_skills(["a"], ["b"], 1.0, table(&vectors)).unwrap();
        assert_eq!(report.matched_target, set(&["b"]));
    }

    #[test]
    fn test_hash_embedded_phrases_match_themselves_at_threshold_one() {
        let embedder = HashEmbedder::new(256);
        for phrase in ["machine learning", "c++", "distributed systems", "sql"] {
            let report =
                match_skills([phrase], [phrase], 1.0, |p| embedder.embed_sync(p)).unwrap();
            assert_eq!(
                report.outcomes[phrase],
                MatchOutcome::Matched {
                    target: phrase.to_string(),
                    similarity: 1.0
                },
                "{phrase} did not match itself"
            );
            assert_eq!(report.score, 100.0);
        }
    }

    #[test]
    fn test_identical_target_embeddings_pick_first_inserted() {
        let vectors = vec![
            ("query", vec![1.0, 0.0]),
            ("beta", vec![2.0, 0.0]),
            ("alpha", vec![1.0, 0.0]),
        ];
        let report = match_skills(["query"], ["beta", "alpha"], 0.5, table(&vectors)).unwrap();
        assert_eq!(report.matched_target, set(&["alpha"]));
        assert_eq!(report.unmatched_target, set(&["beta"]));
    }

    #[test]
    fn test_many_sources_can_share_one_target() {
        let vectors = vec![
            ("postgres", vec![0.9, 0.1]),
            ("postgresql", vec![0.95, 0.05]),
            ("sql", vec![1.0, 0.0]),
            ("design", vec![0.0, 1.0]),
        ];
        let report = match_skills(
            ["postgres", "postgresql"],
            ["sql", "design"],
            0.5,
            table(&vectors),
        )
        .unwrap();
        assert_eq!(report.matched_target, set(&["sql"]));
        assert_eq!(report.outcomes.len(), 2);
        assert!(report.score > 99.0);
    }

    #[test]
    fn test_inputs_are_normalized_before_matching() {
        let vectors = one_hot(&["python", "sql"]);
        let report = match_skills(
            ["  Python", "PYTHON ", ""],
            ["SQL", "python"],
            0.5,
            table(&vectors),
        )
        .unwrap();
        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.matched_target, set(&["python"]));
        assert_eq!(report.unmatched_target, set(&["sql"]));
    }

    #[test]
    fn test_embedding_failure_aborts_match() {
        let vectors = vec![("rust", vec![1.0, 0.0])];
        let err = match_skills(["rust", "unknown"], ["rust"], 0.5, table(&vectors)).unwrap_err();
        assert!(matches!(err, MatchError::Embedding(EmbeddingError::EmptyInput)));
    }

    #[test]
    fn test_dimension_mismatch_across_collections() {
        let vectors = vec![("rust", vec![1.0, 0.0]), ("sql", vec![1.0, 0.0, 0.0])];
        let err = match_skills(["rust"], ["sql"], 0.5, table(&vectors)).unwrap_err();
        assert!(matches!(
            err,
            MatchError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
    }

    #[test]
    fn test_dimension_mismatch_detected_with_empty_target() {
        let vectors = vec![("rust", vec![1.0, 0.0]), ("sql", vec![1.0])];
        let err = match_skills(["rust", "sql"], Vec::<String>::new(), 0.5, table(&vectors))
            .unwrap_err();
        assert!(matches!(err, MatchError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_score_is_rounded_to_two_decimals() {
        let vectors = vec![("a", vec![1.0, 0.0]), ("b", vec![0.876543, 0.481334])];
        let report = match_skills(["a"], ["b"], 0.5, table(&vectors)).unwrap();
        assert_eq!(report.score, 87.65);
    }

    #[test]
    fn test_match_is_idempotent() {
        let vectors = python_scenario();
        let first = match_skills(["python programming"], ["python", "java"], 0.5, table(&vectors)).unwrap();
        let second = match_skills(["python programming"], ["python", "java"], 0.5, table(&vectors)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_threshold_validation() {
        assert!(is_valid_threshold(-1.0));
        assert!(is_valid_threshold(DEFAULT_THRESHOLD));
        assert!(is_valid_threshold(1.0));
        assert!(!is_valid_threshold(1.01));
        assert!(!is_valid_threshold(f32::NAN));
    }

    #[tokio::test]
    async fn test_skill_matcher_with_hash_embedder() {
        let matcher = SkillMatcher::new(Arc::new(HashEmbedder::new(256)), DEFAULT_THRESHOLD);
        let source = vec!["Python Programming".to_string(), "Docker".to_string()];
        let target = vec!["python".to_string(), "kubernetes".to_string(), "docker".to_string()];

        let report = matcher.match_skills(&source, &target, None).await.unwrap();

        assert!(report.matched_target.contains("python"));
        assert!(report.matched_target.contains("docker"));
        assert!(report.unmatched_target.contains("kubernetes"));
        assert_eq!(report.threshold, DEFAULT_THRESHOLD);
        assert!(report.score > 50.0 && report.score <= 100.0);
    }

    #[tokio::test]
    async fn test_skill_matcher_threshold_override() {
        let matcher = SkillMatcher::new(Arc::new(HashEmbedder::new(256)), DEFAULT_THRESHOLD);
        let source = vec!["python programming".to_string()];
        let target = vec!["python".to_string()];

        let report = matcher.match_skills(&source, &target, Some(1.0)).await.unwrap();

        assert!(report.matched_target.is_empty());
        assert_eq!(report.unmatched_source.len(), 1);
    }

    #[tokio::test]
    async fn test_skill_matcher_propagates_embedding_errors() {
        let matcher = SkillMatcher::new(Arc::new(HashEmbedder::new(64)), DEFAULT_THRESHOLD);
        let source = vec!["--".to_string()];
        let target = vec!["rust".to_string()];

        let err = matcher.match_skills(&source, &target, None).await.unwrap_err();
        assert!(matches!(err, MatchError::Embedding(EmbeddingError::EmptyInput)));
    }
}
