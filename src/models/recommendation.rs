use serde::{Deserialize, Serialize};

use super::CatalogHit;

/// Score used when the catalog has no rating for a title
pub const DEFAULT_SCORE: f64 = 0.7;

/// Score of the synthetic fallback recommendation
pub const FALLBACK_SCORE: f64 = 0.5;

/// Maximum number of streaming providers listed per title
pub const MAX_PROVIDERS: usize = 8;

/// Where a recommendation came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationSource {
    Catalog,
    Fallback,
}

/// Single recommendation item returned to the client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub title: String,
    pub source: RecommendationSource,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub providers: Option<Vec<String>>,
}

impl Recommendation {
    /// Builds a catalog-sourced recommendation from a raw hit
    pub fn from_hit(hit: &CatalogHit) -> Self {
        Self {
            title: hit.title.clone(),
            source: RecommendationSource::Catalog,
            score: clamp_score(hit.score.unwrap_or(DEFAULT_SCORE)),
            providers: None,
        }
    }

    /// Placeholder returned when every data-producing path failed
    pub fn synthetic_fallback(mood: &str) -> Self {
        Self {
            title: format!("Fallback pick for '{}'", mood),
            source: RecommendationSource::Fallback,
            score: FALLBACK_SCORE,
            providers: None,
        }
    }

    /// Attaches providers, deduplicated in order and capped
    pub fn with_providers(mut self, providers: Vec<String>) -> Self {
        self.providers = Some(dedupe_providers(providers));
        self
    }
}

/// Envelope holding a list of recommendations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RecommendationList {
    pub items: Vec<Recommendation>,
}

impl RecommendationList {
    pub fn new(items: Vec<Recommendation>) -> Self {
        Self { items }
    }

    /// A list holding only the synthetic fallback for `mood`
    pub fn fallback(mood: &str) -> Self {
        Self::new(vec![Recommendation::synthetic_fallback(mood)])
    }

    pub fn is_fallback(&self) -> bool {
        self.items.len() == 1 && self.items[0].source == RecommendationSource::Fallback
    }
}

/// Clamps to [0, 1]; NaN counts as unknown
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        DEFAULT_SCORE
    } else {
        score.clamp(0.0, 1.0)
    }
}

/// Removes duplicates keeping first occurrences, then caps the list
pub fn dedupe_providers(providers: Vec<String>) -> Vec<String> {
    let mut ordered: Vec<String> = Vec::with_capacity(providers.len().min(MAX_PROVIDERS));
    for provider in providers {
        if ordered.len() == MAX_PROVIDERS {
            break;
        }
        if !ordered.contains(&provider) {
            ordered.push(provider);
        }
    }
    ordered
}
