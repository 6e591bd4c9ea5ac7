/// TMDB (The Movie Database) catalog client
///
/// Uses the v3 API key as a query parameter for every endpoint:
/// 1. Discovery: /discover/movie → genre-filtered titles
/// 2. Search: /search/movie → free-text title search
/// 3. Providers: /movie/{id}/watch/providers → regional streaming availability
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::{
    error::{truncate_body, CatalogError, ConfigError, ERROR_BODY_LIMIT},
    models::{recommendation::dedupe_providers, CatalogHit, TmdbPage, TmdbWatchProviders},
    services::{
        catalog::{
            seed::{pick_page, pick_sort, MAX_PAGES},
            CatalogClient, MAX_HITS,
        },
        retry::RetryPolicy,
    },
};

/// Titles with fewer votes are left out of discovery
const MIN_VOTE_COUNT: &str = "200";
/// Region used when the configured one has no provider data
const DEFAULT_REGION: &str = "US";
const PROVIDER_BODY_LIMIT: usize = 200;

#[derive(Clone)]
pub struct TmdbCatalog {
    http_client: HttpClient,
    api_key: Option<String>,
    api_url: String,
    language: String,
    region: String,
    retry: RetryPolicy,
}

impl TmdbCatalog {
    pub fn new(
        api_key: Option<String>,
        api_url: String,
        language: String,
        region: String,
        timeout: Duration,
    ) -> Result<Self, CatalogError> {
        let http_client = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                ConfigError::Invalid(format!("Failed to create TMDB HTTP client: {}", e))
            })?;

        Ok(Self {
            http_client,
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            language,
            region: region.trim().to_uppercase(),
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn api_key(&self) -> Result<&str, CatalogError> {
        self.api_key
            .as_deref()
            .ok_or(CatalogError::Config(ConfigError::MissingCredential(
                "TMDB_API_KEY",
            )))
    }

    /// Single GET with status checking; retried by the caller
    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
        body_limit: usize,
    ) -> Result<T, CatalogError> {
        let api_key = self.api_key()?;
        let url = format!("{}{}", self.api_url, endpoint);

        let response = self
            .http_client
            .get(&url)
            .header("Accept", "application/json")
            .query(params)
            .query(&[("api_key", api_key)])
            .send()
            .await
            .map_err(|source| CatalogError::Transport {
                endpoint: endpoint.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body: truncate_body(&body, body_limit),
            });
        }

        let text = response
            .text()
            .await
            .map_err(|source| CatalogError::Transport {
                endpoint: endpoint.to_string(),
                source,
            })?;
        tracing::debug!(endpoint = %endpoint, response = %text, "Raw TMDB response");

        serde_json::from_str(&text).map_err(|e| CatalogError::Decode {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })
    }

    async fn fetch_page(
        &self,
        endpoint: &str,
        params: Vec<(&str, String)>,
    ) -> Result<Vec<CatalogHit>, CatalogError> {
        let page: TmdbPage = self
            .retry
            .run(endpoint, || self.get_json(endpoint, &params, ERROR_BODY_LIMIT))
            .await?;

        Ok(page
            .results
            .into_iter()
            .take(MAX_HITS)
            .map(CatalogHit::from)
            .collect())
    }
}

#[async_trait::async_trait]
impl CatalogClient for TmdbCatalog {
    async fn discover_by_genres(
        &self,
        genre_ids: &[u32],
        seed: &str,
    ) -> Result<Vec<CatalogHit>, CatalogError> {
        let with_genres = genre_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let page = pick_page(seed, MAX_PAGES);
        let sort_by = pick_sort(seed);

        let params = vec![
            ("with_genres", with_genres.clone()),
            ("sort_by", sort_by.as_str().to_string()),
            ("vote_count.gte", MIN_VOTE_COUNT.to_string()),
            ("language", self.language.clone()),
            ("page", page.to_string()),
        ];

        let hits = self.fetch_page("/discover/movie", params).await?;

        tracing::info!(
            genres = %with_genres,
            page,
            sort_by = %sort_by,
            results = hits.len(),
            provider = "tmdb",
            "Discovery completed"
        );

        Ok(hits)
    }

    async fn search_by_mood(&self, mood: &str) -> Result<Vec<CatalogHit>, CatalogError> {
        let params = vec![
            ("query", mood.to_string()),
            ("include_adult", "false".to_string()),
            ("language", self.language.clone()),
            ("page", "1".to_string()),
        ];

        let hits = self.fetch_page("/search/movie", params).await?;

        tracing::info!(
            query = %mood,
            results = hits.len(),
            provider = "tmdb",
            "Title search completed"
        );

        Ok(hits)
    }

    async fn get_watch_providers(&self, catalog_id: u64) -> Result<Vec<String>, CatalogError> {
        let endpoint = format!("/movie/{}/watch/providers", catalog_id);

        let data: TmdbWatchProviders = self
            .retry
            .run(&endpoint, || {
                self.get_json(&endpoint, &[], PROVIDER_BODY_LIMIT)
            })
            .await?;

        // A region entry without any provider counts as missing
        let providers = [self.region.as_str(), DEFAULT_REGION]
            .into_iter()
            .filter_map(|region| data.results.get(region))
            .map(|entry| entry.flatten())
            .find(|names| !names.is_empty())
            .map(dedupe_providers)
            .unwrap_or_default();

        tracing::debug!(
            catalog_id,
            region = %self.region,
            providers = providers.len(),
            "Watch providers fetched"
        );

        Ok(providers)
    }

    fn name(&self) -> &'static str {
        "tmdb"
    }
}
