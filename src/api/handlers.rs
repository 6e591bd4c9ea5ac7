use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::LazyLock;

use crate::{
    error::{AppError, AppResult},
    models::RecommendationList,
    services::{run_checks, DiagnosticsReport},
};

use super::AppState;

const MAX_MOOD_CHARS: usize = 100;

/// Letters, digits, whitespace, Latin-1 accents and light punctuation
static MOOD_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w\sÀ-ÿ,.'!?-]+$").expect("mood pattern is valid"));

#[derive(Debug, Deserialize)]
pub struct MoodQuery {
    pub mood: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DiagnosticsQuery {
    #[serde(default = "default_debug_mood")]
    pub mood: String,
}

fn default_debug_mood() -> String {
    "feliz".to_string()
}

/// Rejects moods the recommendation endpoint does not accept
pub fn validate_mood(mood: Option<&str>) -> AppResult<&str> {
    let mood = mood.ok_or_else(|| AppError::InvalidInput("mood is required".to_string()))?;

    let length = mood.chars().count();
    if length == 0 || length > MAX_MOOD_CHARS {
        return Err(AppError::InvalidInput(format!(
            "mood must have between 1 and {} characters",
            MAX_MOOD_CHARS
        )));
    }

    if !MOOD_PATTERN.is_match(mood) {
        return Err(AppError::InvalidInput(
            "mood contains unsupported characters".to_string(),
        ));
    }

    Ok(mood)
}

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

/// GET /recommendations?mood=...
pub async fn recommend(
    State(state): State<AppState>,
    Query(query): Query<MoodQuery>,
) -> AppResult<Json<RecommendationList>> {
    let mood = validate_mood(query.mood.as_deref())?;

    tracing::info!(mood = %mood, "Recommendation request");

    let list = state.recommendations.recommend_by_mood(mood).await;
    Ok(Json(list))
}

/// GET /_debug/checks?mood=...
pub async fn debug_checks(
    State(state): State<AppState>,
    Query(query): Query<DiagnosticsQuery>,
) -> Json<DiagnosticsReport> {
    Json(run_checks(&state.recommendations, state.ai_mode, &query.mood).await)
}
