use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    config::AiMode,
    error::CallTrace,
    models::Genre,
    services::{
        classifier::fallback_genres_for,
        recommendations::{RecommendationReport, RecommendationService, DEFAULT_GENRE_ID, TOP_K},
    },
};

/// Snapshot of classifier and catalog health for one mood
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticsReport {
    pub ai_mode: AiMode,
    pub classifier: &'static str,
    pub classifier_available: bool,
    pub classifier_error: Option<String>,
    pub effective_model: Option<String>,
    pub genres_ai: Vec<Genre>,
    pub genres_fallback: Vec<Genre>,
    /// The classifier failed and a request would use the static mapping
    pub used_static_mapping: bool,
    pub classifier_trace: Option<CallTrace>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_sample_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_error: Option<String>,
    pub checked_at: DateTime<Utc>,
}

/// Classifies the mood and runs one Comedy discovery, bypassing the cache
///
/// Every failure is captured in the report; nothing here returns an error.
pub async fn run_checks(
    service: &RecommendationService,
    ai_mode: AiMode,
    mood: &str,
) -> DiagnosticsReport {
    let classifier = service.classifier();
    let availability = classifier.availability().await;

    // Same classification path as a request, without touching the cache
    let mut report = RecommendationReport::default();
    let mut genres_ai = Vec::new();
    if availability.available {
        let genres = service.resolve_genres(mood, &mut report).await;
        if !report.used_static_mapping {
            genres_ai = genres;
        }
    }

    let (catalog_sample_count, catalog_error) = match service
        .catalog()
        .discover_by_genres(&[DEFAULT_GENRE_ID], mood)
        .await
    {
        Ok(hits) => (Some(hits.len()), None),
        Err(e) => (None, Some(e.to_string())),
    };

    tracing::info!(
        classifier = classifier.name(),
        available = availability.available,
        catalog_ok = catalog_error.is_none(),
        "Diagnostics checks completed"
    );

    DiagnosticsReport {
        ai_mode,
        classifier: classifier.name(),
        classifier_available: availability.available,
        classifier_error: availability.error.or(report.classifier_error),
        effective_model: classifier.effective_model(),
        genres_ai,
        genres_fallback: fallback_genres_for(mood, TOP_K),
        used_static_mapping: report.used_static_mapping,
        classifier_trace: report.classifier_trace,
        catalog_sample_count,
        catalog_error,
        checked_at: Utc::now(),
    }
}
