use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;

use crate::{
    db::{normalize_mood, Cache, CacheKey},
    error::{CallTrace, CatalogError},
    models::{CatalogHit, Genre, Recommendation, RecommendationList},
    services::{
        catalog::CatalogClient,
        classifier::{fallback_genres_for, MoodClassifier},
    },
};

/// Number of genres requested from the classifier
pub const TOP_K: usize = 2;

/// Comedy, used when no genre could be inferred
pub const DEFAULT_GENRE_ID: u32 = 35;

/// What happened while producing one recommendation list
#[derive(Debug, Clone, Default, Serialize)]
pub struct RecommendationReport {
    pub cache_hit: bool,
    pub genres: Vec<Genre>,
    pub used_static_mapping: bool,
    pub classifier_error: Option<String>,
    pub classifier_trace: Option<CallTrace>,
    pub used_search: bool,
    pub catalog_error: Option<String>,
}

/// Recommendation list together with the report of the call that built it
#[derive(Debug, Clone)]
pub struct Recommendations {
    pub list: RecommendationList,
    pub report: RecommendationReport,
}

/// Mood → genres → catalog → recommendations pipeline
///
/// Failures are downgraded in exactly two places: a classifier error falls
/// back to the static keyword mapping, and any catalog error yields the
/// synthetic fallback item. Both outcomes are cached like any other list.
#[derive(Clone)]
pub struct RecommendationService {
    classifier: Arc<dyn MoodClassifier>,
    catalog: Arc<dyn CatalogClient>,
    cache: Cache,
    include_providers: bool,
}

impl RecommendationService {
    pub fn new(
        classifier: Arc<dyn MoodClassifier>,
        catalog: Arc<dyn CatalogClient>,
        cache: Cache,
        include_providers: bool,
    ) -> Self {
        Self {
            classifier,
            catalog,
            cache,
            include_providers,
        }
    }

    pub fn classifier(&self) -> &Arc<dyn MoodClassifier> {
        &self.classifier
    }

    pub fn catalog(&self) -> &Arc<dyn CatalogClient> {
        &self.catalog
    }

    pub async fn recommend_by_mood(&self, mood: &str) -> RecommendationList {
        self.recommend_with_report(mood).await.list
    }

    pub async fn recommend_with_report(&self, mood: &str) -> Recommendations {
        let key = CacheKey::for_mood(mood);

        if let Some(list) = self.cache.get(&key) {
            tracing::debug!(key = %key, "Cache hit");
            return Recommendations {
                list,
                report: RecommendationReport {
                    cache_hit: true,
                    ..Default::default()
                },
            };
        }

        tracing::debug!(key = %key, "Cache miss");

        let mut report = RecommendationReport::default();
        let list = match self.build(mood, &mut report).await {
            Ok(items) if !items.is_empty() => RecommendationList::new(items),
            Ok(_) => {
                tracing::warn!(mood = %mood, "Catalog returned no titles, using synthetic fallback");
                RecommendationList::fallback(mood)
            }
            Err(e) => {
                tracing::warn!(mood = %mood, error = %e, "Catalog failed, using synthetic fallback");
                report.catalog_error = Some(e.to_string());
                RecommendationList::fallback(mood)
            }
        };

        self.cache.insert(key, list.clone());

        tracing::info!(
            mood = %mood,
            items = list.items.len(),
            genres = ?report.genres,
            static_mapping = report.used_static_mapping,
            fallback = list.is_fallback(),
            "Recommendations generated"
        );

        Recommendations { list, report }
    }

    /// Classifies the mood, downgrading any classifier failure to the static mapping
    pub async fn resolve_genres(&self, mood: &str, report: &mut RecommendationReport) -> Vec<Genre> {
        match self.classifier.classify(mood, TOP_K).await {
            Ok(classification) => {
                report.classifier_trace = classification.trace;
                classification.genres
            }
            Err(e) => {
                tracing::warn!(
                    classifier = self.classifier.name(),
                    error = %e,
                    "Classifier failed, using static mapping"
                );
                report.classifier_trace = e.trace().cloned();
                report.classifier_error = Some(e.to_string());
                report.used_static_mapping = true;
                fallback_genres_for(mood, TOP_K)
            }
        }
    }

    async fn build(
        &self,
        mood: &str,
        report: &mut RecommendationReport,
    ) -> Result<Vec<Recommendation>, CatalogError> {
        let genres = self.resolve_genres(mood, report).await;

        let mut genre_ids: Vec<u32> = genres.iter().map(|g| g.id()).collect();
        if genre_ids.is_empty() {
            genre_ids.push(DEFAULT_GENRE_ID);
        }
        report.genres = genres;

        let seed = normalize_mood(mood);
        let mut hits = self.catalog.discover_by_genres(&genre_ids, &seed).await?;

        if hits.is_empty() {
            tracing::info!(mood = %mood, "Discovery returned nothing, searching by mood");
            report.used_search = true;
            hits = self.catalog.search_by_mood(mood).await?;
        }

        if !self.include_providers {
            return Ok(hits.iter().map(Recommendation::from_hit).collect());
        }

        Ok(join_all(hits.iter().map(|hit| self.enrich(hit))).await)
    }

    /// Attaches watch providers; a failed lookup leaves them absent
    async fn enrich(&self, hit: &CatalogHit) -> Recommendation {
        let recommendation = Recommendation::from_hit(hit);
        let Some(catalog_id) = hit.id else {
            return recommendation;
        };

        match self.catalog.get_watch_providers(catalog_id).await {
            Ok(providers) => recommendation.with_providers(providers),
            Err(e) => {
                tracing::warn!(catalog_id, error = %e, "Provider lookup failed");
                recommendation
            }
        }
    }
}
