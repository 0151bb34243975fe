use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use aho_corasick::AhoCorasick;
use anyhow::{Context, Result};
use async_trait::async_trait;

use super::{ExtractionError, ExtractionStrategy, SkillExtractor};
use crate::matching::normalize::{normalize_phrase, normalize_skills};

/// Built-in skill vocabulary. Single letters and common English words
/// ("go", "r", "c") are left out; they match far more prose than skills.
const BUILTIN_SKILLS: &[&str] = &[
    // Languages
    "python", "java", "javascript", "typescript", "rust", "golang", "c++", "c#",
    "kotlin", "swift", "scala", "ruby", "php", "perl", "haskell", "elixir",
    "matlab", "sql", "bash", "shell scripting", "objective-c", "dart", "lua",
    // Web and frameworks
    "html", "css", "react", "angular", "vue", "svelte", "next.js", "node.js",
    "django", "flask", "fastapi", "spring", "spring boot", "ruby on rails",
    ".net", "asp.net", "graphql", "rest api", "grpc", "tailwind",
    // Data and ML
    "machine learning", "deep learning", "natural language processing", "nlp",
    "computer vision", "data analysis", "data science", "data engineering",
    "data visualization", "statistics", "pandas", "numpy", "scikit-learn",
    "tensorflow", "pytorch", "keras", "spark", "hadoop", "airflow", "dbt",
    "tableau", "power bi", "excel", "etl", "large language models",
    // Storage
    "postgresql", "mysql", "sqlite", "mongodb", "redis", "elasticsearch",
    "cassandra", "dynamodb", "snowflake", "bigquery", "kafka", "rabbitmq",
    // Infrastructure
    "aws", "azure", "gcp", "google cloud", "docker", "kubernetes", "terraform",
    "ansible", "jenkins", "ci/cd", "github actions", "linux", "git", "devops",
    "microservices", "distributed systems", "cloud computing", "networking",
    "cybersecurity", "observability", "prometheus", "grafana",
    // Practice
    "agile", "scrum", "kanban", "jira", "unit testing", "test automation",
    "system design", "software architecture", "object-oriented programming",
    "functional programming", "api design", "code review", "debugging",
    "product management", "project management", "ux design", "ui design",
    "figma", "technical writing",
    // Soft skills
    "communication", "leadership", "teamwork", "collaboration",
    "problem solving", "critical thinking", "time management", "mentoring",
    "stakeholder management", "public speaking", "negotiation",
];

/// A case-insensitive multi-pattern skill vocabulary.
pub struct SkillDictionary {
    skills: Vec<String>,
    matcher: AhoCorasick,
}

impl SkillDictionary {
    pub fn builtin() -> Result<Self> {
        Self::from_entries(BUILTIN_SKILLS.iter().copied())
    }

    /// Builds a dictionary from arbitrary entries (normalized and deduplicated).
    pub fn from_entries<I, S>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let skills: Vec<String> = normalize_skills(entries).into_iter().collect();
        let matcher = AhoCorasick::new(&skills)
            .context("Failed to build skill dictionary matcher")?;
        Ok(Self { skills, matcher })
    }

    /// Built-in entries plus one skill per non-empty line of `path`.
    /// Lines starting with `#` are comments.
    pub fn builtin_with_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read skill dictionary {}", path.display()))?;
        let extra = contents
            .lines()
            .filter(|line| !line.trim_start().starts_with('#'))
            .filter_map(normalize_phrase);
        Self::from_entries(BUILTIN_SKILLS.iter().map(|s| s.to_string()).chain(extra))
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    /// Every dictionary skill occurring in `text` on word boundaries.
    /// Overlapping hits are all kept, so "spring boot" also yields "spring".
    ///
    /// Entries are stored lower-cased, so the text is lower-cased the same
    /// way (Unicode-aware) and boundaries are checked on the lowered copy.
    pub fn find(&self, text: &str) -> BTreeSet<String> {
        let lowered = text.to_lowercase();
        self.matcher
            .find_overlapping_iter(&lowered)
            .filter(|m| on_word_boundary(&lowered, m.start(), m.end()))
            .map(|m| self.skills[m.pattern().as_usize()].clone())
            .collect()
    }
}

fn on_word_boundary(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Dictionary strategy: deterministic, no network.
#[derive(Clone)]
pub struct DictionaryExtractor {
    dictionary: Arc<SkillDictionary>,
}

impl DictionaryExtractor {
    pub fn new(dictionary: Arc<SkillDictionary>) -> Self {
        Self { dictionary }
    }
}

#[async_trait]
impl SkillExtractor for DictionaryExtractor {
    fn strategy(&self) -> ExtractionStrategy {
        ExtractionStrategy::Dictionary
    }

    async fn extract(&self, text: &str) -> Result<BTreeSet<String>, ExtractionError> {
        Ok(self.dictionary.find(text))
    }
}
