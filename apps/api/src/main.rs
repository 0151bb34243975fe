mod config;
mod embedding;
mod errors;
mod extraction;
mod llm_client;
mod matching;
mod retry;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::embedding::build_embedder;
use crate::extraction::{Extractors, SkillDictionary};
use crate::llm_client::LlmClient;
use crate::matching::matcher::SkillMatcher;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Skillmatch API v{}", env!("CARGO_PKG_VERSION"));

    // Embedder (hash by default, optionally behind the Redis cache)
    let embedder = build_embedder(&config).await?;
    let matcher = SkillMatcher::new(embedder, config.match_threshold);
    info!("Skill matcher ready (threshold: {})", config.match_threshold);

    // Skill dictionary
    let dictionary = match &config.skill_dictionary_path {
        Some(path) => SkillDictionary::builtin_with_file(path)?,
        None => SkillDictionary::builtin()?,
    };
    info!("Skill dictionary loaded ({} entries)", dictionary.len());

    // LLM client, only when a key is configured
    let llm = match &config.anthropic_api_key {
        Some(key) => {
            let client = LlmClient::new(key.clone())?;
            info!("LLM client initialized (model: {})", llm_client::MODEL);
            Some(client)
        }
        None => {
            info!("ANTHROPIC_API_KEY not set; llm and hybrid extraction disabled");
            None
        }
    };

    let extractors = Extractors::new(Arc::new(dictionary), llm, config.skill_extractor);
    info!("Default skill extractor: {}", config.skill_extractor);

    // Build app state
    let state = AppState {
        config: config.clone(),
        matcher,
        extractors,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
