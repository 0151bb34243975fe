use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::embedding::EmbedderKind;
use crate::extraction::ExtractionStrategy;
use crate::matching::matcher::{is_valid_threshold, DEFAULT_THRESHOLD};

const DEFAULT_HASH_DIMENSIONS: usize = 256;
const DEFAULT_API_DIMENSIONS: usize = 1536;

/// Application configuration loaded from environment variables.
/// Startup fails with a readable error on malformed values.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub match_threshold: f32,
    pub embedder: EmbedderKind,
    pub embedding_dimensions: usize,
    pub embedding_api_url: String,
    pub embedding_api_key: Option<String>,
    pub embedding_model: String,
    pub redis_url: Option<String>,
    pub skill_extractor: ExtractionStrategy,
    pub skill_dictionary_path: Option<PathBuf>,
    pub anthropic_api_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key → value source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let embedder = match get("EMBEDDER") {
            Some(v) => v.parse::<EmbedderKind>()?,
            None => EmbedderKind::Hash,
        };

        let embedding_dimensions = match get("EMBEDDING_DIMENSIONS") {
            Some(v) => v
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|d| *d > 0)
                .context("EMBEDDING_DIMENSIONS must be a positive integer")?,
            None => match embedder {
                EmbedderKind::Hash => DEFAULT_HASH_DIMENSIONS,
                EmbedderKind::Api => DEFAULT_API_DIMENSIONS,
            },
        };

        let match_threshold = match get("MATCH_THRESHOLD") {
            Some(v) => v
                .trim()
                .parse::<f32>()
                .ok()
                .filter(|t| is_valid_threshold(*t))
                .context("MATCH_THRESHOLD must be a number between -1 and 1")?,
            None => DEFAULT_THRESHOLD,
        };

        let skill_extractor = match get("SKILL_EXTRACTOR") {
            Some(v) => v.parse::<ExtractionStrategy>()?,
            None => ExtractionStrategy::Dictionary,
        };

        let anthropic_api_key = get("ANTHROPIC_API_KEY");
        if skill_extractor.needs_llm() && anthropic_api_key.is_none() {
            anyhow::bail!("SKILL_EXTRACTOR={skill_extractor} requires ANTHROPIC_API_KEY");
        }

        Ok(Config {
            port: get("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: get("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            match_threshold,
            embedder,
            embedding_dimensions,
            embedding_api_url: get("EMBEDDING_API_URL")
                .unwrap_or_else(|| "https://api.openai.com".to_string()),
            embedding_api_key: get("EMBEDDING_API_KEY"),
            embedding_model: get("EMBEDDING_MODEL")
                .unwrap_or_else(|| "text-embedding-3-small".to_string()),
            redis_url: get("REDIS_URL"),
            skill_extractor,
            skill_dictionary_path: get("SKILL_DICTIONARY_PATH").map(PathBuf::from),
            anthropic_api_key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.match_threshold, DEFAULT_THRESHOLD);
        assert_eq!(config.embedder, EmbedderKind::Hash);
        assert_eq!(config.embedding_dimensions, 256);
        assert_eq!(config.skill_extractor, ExtractionStrategy::Dictionary);
        assert!(config.redis_url.is_none());
    }

    #[test]
    fn test_api_embedder_defaults_to_1536_dimensions() {
        let config = config(&[("EMBEDDER", "api"), ("EMBEDDING_API_KEY", "sk")]).unwrap();
        assert_eq!(config.embedder, EmbedderKind::Api);
        assert_eq!(config.embedding_dimensions, 1536);
        assert_eq!(config.embedding_model, "text-embedding-3-small");
    }

    #[test]
    fn test_explicit_dimensions_override_default() {
        let config = config(&[("EMBEDDING_DIMENSIONS", "64")]).unwrap();
        assert_eq!(config.embedding_dimensions, 64);
    }

    #[test]
    fn test_rejects_zero_dimensions() {
        assert!(config(&[("EMBEDDING_DIMENSIONS", "0")]).is_err());
    }

    #[test]
    fn test_rejects_out_of_range_threshold() {
        assert!(config(&[("MATCH_THRESHOLD", "1.5")]).is_err());
        assert!(config(&[("MATCH_THRESHOLD", "high")]).is_err());
        assert_eq!(
            config(&[("MATCH_THRESHOLD", "0.6")]).unwrap().match_threshold,
            0.6
        );
    }

    #[test]
    fn test_llm_extractor_requires_api_key() {
        assert!(config(&[("SKILL_EXTRACTOR", "hybrid")]).is_err());
        let config = config(&[("SKILL_EXTRACTOR", "llm"), ("ANTHROPIC_API_KEY", "key")]).unwrap();
        assert_eq!(config.skill_extractor, ExtractionStrategy::Llm);
    }

    #[test]
    fn test_blank_values_count_as_unset() {
        let config = config(&[("REDIS_URL", "  "), ("PORT", "")]).unwrap();
        assert!(config.redis_url.is_none());
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        assert!(config(&[("PORT", "eighty")]).is_err());
    }
}
