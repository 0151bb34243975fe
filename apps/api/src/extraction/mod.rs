//! Skill extraction: pluggable strategies that turn free text into skill phrases.
//!
//! Strategies are invoked the same way for CVs and job descriptions:
//! - `dictionary`: known-skill lookup, pure Rust, deterministic
//! - `llm`: entity tagging via the LLM client
//! - `hybrid`: union of both
//!
//! `AppState` carries an `Extractors` registry; handlers ask it for a strategy.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::llm_client::{LlmClient, LlmError};

pub mod dictionary;
pub mod handlers;
pub mod llm;
pub mod prompts;

pub use dictionary::{DictionaryExtractor, SkillDictionary};
pub use llm::LlmSkillExtractor;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStrategy {
    #[default]
    Dictionary,
    Llm,
    Hybrid,
}

impl ExtractionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionStrategy::Dictionary => "dictionary",
            ExtractionStrategy::Llm => "llm",
            ExtractionStrategy::Hybrid => "hybrid",
        }
    }

    pub fn needs_llm(&self) -> bool {
        !matches!(self, ExtractionStrategy::Dictionary)
    }
}

impl fmt::Display for ExtractionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExtractionStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "dictionary" => Ok(ExtractionStrategy::Dictionary),
            "llm" | "ner" => Ok(ExtractionStrategy::Llm),
            "hybrid" => Ok(ExtractionStrategy::Hybrid),
            other => anyhow::bail!(
                "unknown skill extractor '{other}', expected 'dictionary', 'llm' or 'hybrid'"
            ),
        }
    }
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("extraction strategy '{0}' requires ANTHROPIC_API_KEY")]
    Unavailable(ExtractionStrategy),

    #[error("LLM extraction failed: {0}")]
    Llm(#[from] LlmError),
}

/// The extraction trait. Every strategy returns normalized, deduplicated phrases.
#[async_trait]
pub trait SkillExtractor: Send + Sync {
    fn strategy(&self) -> ExtractionStrategy;

    async fn extract(&self, text: &str) -> Result<BTreeSet<String>, ExtractionError>;
}

/// Union of two strategies, normally dictionary and LLM.
pub struct HybridSkillExtractor {
    dictionary: Arc<dyn SkillExtractor>,
    llm: Arc<dyn SkillExtractor>,
}

impl HybridSkillExtractor {
    pub fn new(dictionary: Arc<dyn SkillExtractor>, llm: Arc<dyn SkillExtractor>) -> Self {
        Self { dictionary, llm }
    }
}

#[async_trait]
impl SkillExtractor for HybridSkillExtractor {
    fn strategy(&self) -> ExtractionStrategy {
        ExtractionStrategy::Hybrid
    }

    async fn extract(&self, text: &str) -> Result<BTreeSet<String>, ExtractionError> {
        let mut skills = self.llm.extract(text).await?;
        skills.extend(self.dictionary.extract(text).await?);
        Ok(skills)
    }
}

/// Resources every strategy is built from, constructed once at startup.
#[derive(Clone)]
pub struct Extractors {
    dictionary: Arc<SkillDictionary>,
    llm: Option<LlmClient>,
    default_strategy: ExtractionStrategy,
}

impl Extractors {
    pub fn new(
        dictionary: Arc<SkillDictionary>,
        llm: Option<LlmClient>,
        default_strategy: ExtractionStrategy,
    ) -> Self {
        Self {
            dictionary,
            llm,
            default_strategy,
        }
    }

    pub fn default_strategy(&self) -> ExtractionStrategy {
        self.default_strategy
    }

    /// Returns the extractor for `strategy`, or the configured default.
    pub fn get(
        &self,
        strategy: Option<ExtractionStrategy>,
    ) -> Result<Arc<dyn SkillExtractor>, ExtractionError> {
        let strategy = strategy.unwrap_or(self.default_strategy);
        let dictionary: Arc<dyn SkillExtractor> =
            Arc::new(DictionaryExtractor::new(self.dictionary.clone()));

        if !strategy.needs_llm() {
            return Ok(dictionary);
        }

        let llm: Arc<dyn SkillExtractor> = match &self.llm {
            Some(client) => Arc::new(LlmSkillExtractor::new(client.clone())),
            None => return Err(ExtractionError::Unavailable(strategy)),
        };

        Ok(match strategy {
            ExtractionStrategy::Llm => llm,
            _ => Arc::new(HybridSkillExtractor::new(dictionary, llm)),
        })
    }
}
