use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::prompts::{SKILL_EXTRACTION_PROMPT_TEMPLATE, SKILL_EXTRACTION_SYSTEM};
use super::{ExtractionError, ExtractionStrategy, SkillExtractor};
use crate::llm_client::LlmClient;
use crate::matching::normalize::normalize_skills;

#[derive(Debug, Deserialize)]
struct TaggedSkills {
    #[serde(default)]
    skills: Vec<String>,
}

/// Entity-tagging strategy backed by the LLM.
#[derive(Clone)]
pub struct LlmSkillExtractor {
    llm: LlmClient,
}

impl LlmSkillExtractor {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

fn build_prompt(text: &str) -> String {
    SKILL_EXTRACTION_PROMPT_TEMPLATE.replace("{text}", text)
}

#[async_trait]
impl SkillExtractor for LlmSkillExtractor {
    fn strategy(&self) -> ExtractionStrategy {
        ExtractionStrategy::Llm
    }

    async fn extract(&self, text: &str) -> Result<BTreeSet<String>, ExtractionError> {
        let tagged: TaggedSkills = self
            .llm
            .call_json(&build_prompt(text), SKILL_EXTRACTION_SYSTEM)
            .await?;
        let skills = normalize_skills(tagged.skills);
        debug!("LLM tagged {} skills", skills.len());
        Ok(skills)
    }
}
