use std::collections::BTreeSet;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::extraction::ExtractionStrategy;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    pub text: String,
    #[serde(default)]
    pub strategy: Option<ExtractionStrategy>,
}

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub strategy: ExtractionStrategy,
    pub skills: BTreeSet<String>,
}

/// POST /api/v1/skills/extract
pub async fn handle_extract(
    State(state): State<AppState>,
    Json(req): Json<ExtractRequest>,
) -> Result<Json<ExtractResponse>, AppError> {
    if req.text.trim().is_empty() {
        return Err(AppError::Validation("text cannot be empty".to_string()));
    }

    let extractor = state.extractors.get(req.strategy)?;
    let skills = extractor.extract(&req.text).await?;

    Ok(Json(ExtractResponse {
        strategy: extractor.strategy(),
        skills,
    }))
}
