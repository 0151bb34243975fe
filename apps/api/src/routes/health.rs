use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns service status plus the active embedder and matching defaults.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "skillmatch-api",
        "embedder": state.matcher.embedder_name(),
        "match_threshold": state.config.match_threshold,
        "skill_extractor": state.extractors.default_strategy(),
    }))
}
