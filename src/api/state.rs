use std::sync::Arc;

use crate::{
    config::{AiMode, Config},
    db::Cache,
    error::AppResult,
    services::{build_classifier, CatalogClient, MoodClassifier, RecommendationService, TmdbCatalog},
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub recommendations: RecommendationService,
    pub ai_mode: AiMode,
}

impl AppState {
    pub fn new(service: RecommendationService, ai_mode: AiMode) -> Self {
        Self {
            recommendations: service,
            ai_mode,
        }
    }

    /// Wires the classifier, catalog client and cache selected by `config`
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let classifier: Arc<dyn MoodClassifier> = build_classifier(config)?;

        let catalog: Arc<dyn CatalogClient> = Arc::new(TmdbCatalog::new(
            config.tmdb_key(),
            config.tmdb_api_url.clone(),
            config.tmdb_language.clone(),
            config.tmdb_region.clone(),
            config.request_timeout(),
        )?);

        let cache = Cache::new(config.cache_capacity, config.cache_ttl())?;

        let service = RecommendationService::new(
            classifier,
            catalog,
            cache,
            config.tmdb_include_providers,
        );

        Ok(Self::new(service, config.ai_mode))
    }
}
