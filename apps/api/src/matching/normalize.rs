use std::collections::BTreeSet;

/// Lower-cases and trims a skill phrase. Blank phrases yield `None`.
pub fn normalize_phrase(raw: &str) -> Option<String> {
    let phrase = raw.trim().to_lowercase();
    (!phrase.is_empty()).then_some(phrase)
}

/// Normalizes and deduplicates a skill collection.
/// The ordered set fixes index insertion order, which makes tie-breaks reproducible.
pub fn normalize_skills<I, S>(skills: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    skills
        .into_iter()
        .filter_map(|s| normalize_phrase(s.as_ref()))
        .collect()
}

/// Scales a vector to unit L2 norm in place. Zero vectors are left untouched.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_phrase_trims_and_lowercases() {
        assert_eq!(normalize_phrase("  Machine Learning\n"), Some("machine learning".into()));
    }

    #[test]
    fn test_normalize_phrase_drops_blank() {
        assert_eq!(normalize_phrase(" \t "), None);
    }

    #[test]
    fn test_normalize_skills_dedups_after_normalizing() {
        let skills = normalize_skills(["Python", "python ", "SQL", ""]);
        assert_eq!(skills.len(), 2);
        assert!(skills.contains("python"));
        assert!(skills.contains("sql"));
    }

    #[test]
    fn test_l2_normalize_unit_length() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_l2_normalize_zero_vector_unchanged() {
        let mut v = vec![0.0, 0.0, 0.0];
        l2_normalize(&mut v);
        assert_eq!(v, vec![0.0, 0.0, 0.0]);
    }
}
