pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::extraction::handlers as extraction;
use crate::matching::handlers as matching;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Matching API
        .route("/api/v1/match", post(matching::handle_match))
        .route("/api/v1/match/text", post(matching::handle_match_text))
        // Extraction API
        .route("/api/v1/skills/extract", post(extraction::handle_extract))
        .with_state(state)
}
