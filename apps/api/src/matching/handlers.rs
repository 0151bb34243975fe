//! Axum route handlers for the Matching API.

use std::collections::BTreeSet;

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::extraction::ExtractionStrategy;
use crate::matching::matcher::{is_valid_threshold, MatchReport};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct MatchRequest {
    pub source_skills: Vec<String>,
    pub target_skills: Vec<String>,
    #[serde(default)]
    pub threshold: Option<f32>,
}

#[derive(Debug, Serialize)]
pub struct MatchResponse {
    pub match_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub embedder: String,
    pub report: MatchReport,
}

#[derive(Debug, Deserialize)]
pub struct TextMatchRequest {
    pub cv_text: String,
    pub jd_text: String,
    #[serde(default)]
    pub threshold: Option<f32>,
    #[serde(default)]
    pub strategy: Option<ExtractionStrategy>,
}

#[derive(Debug, Serialize)]
pub struct TextMatchResponse {
    pub match_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub embedder: String,
    pub strategy: ExtractionStrategy,
    pub cv_skills: BTreeSet<String>,
    pub jd_skills: BTreeSet<String>,
    /// Source = CV skills, target = JD skills: `matched_target` are the
    /// overlapping skills, `unmatched_target` the ones worth learning.
    pub report: MatchReport,
}

fn check_threshold(threshold: Option<f32>) -> Result<(), AppError> {
    match threshold {
        Some(t) if !is_valid_threshold(t) => Err(AppError::Validation(format!(
            "threshold must be between -1 and 1, got {t}"
        ))),
        _ => Ok(()),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/match
///
/// Matches two explicit skill lists. Either list may be empty.
pub async fn handle_match(
    State(state): State<AppState>,
    Json(request): Json<MatchRequest>,
) -> Result<Json<MatchResponse>, AppError> {
    check_threshold(request.threshold)?;

    let report = state
        .matcher
        .match_skills(
            &request.source_skills,
            &request.target_skills,
            request.threshold,
        )
        .await?;

    Ok(Json(MatchResponse {
        match_id: Uuid::new_v4(),
        generated_at: Utc::now(),
        embedder: state.matcher.embedder_name().to_string(),
        report,
    }))
}

/// POST /api/v1/match/text
///
/// Full pipeline: extract skills from CV and JD text with one strategy → match.
pub async fn handle_match_text(
    State(state): State<AppState>,
    Json(request): Json<TextMatchRequest>,
) -> Result<Json<TextMatchResponse>, AppError> {
    if request.cv_text.trim().is_empty() {
        return Err(AppError::Validation("cv_text cannot be empty".to_string()));
    }
    if request.jd_text.trim().is_empty() {
        return Err(AppError::Validation("jd_text cannot be empty".to_string()));
    }
    check_threshold(request.threshold)?;

    let extractor = state.extractors.get(request.strategy)?;
    let cv_skills = extractor.extract(&request.cv_text).await?;
    let jd_skills = extractor.extract(&request.jd_text).await?;

    let source: Vec<String> = cv_skills.iter().cloned().collect();
    let target: Vec<String> = jd_skills.iter().cloned().collect();
    let report = state
        .matcher
        .match_skills(&source, &target, request.threshold)
        .await?;

    Ok(Json(TextMatchResponse {
        match_id: Uuid::new_v4(),
        generated_at: Utc::now(),
        embedder: state.matcher.embedder_name().to_string(),
        strategy: extractor.strategy(),
        cv_skills,
        jd_skills,
        report,
    }))
}
