use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;

pub mod genre;
pub mod recommendation;

pub use genre::Genre;
pub use recommendation::{Recommendation, RecommendationList, RecommendationSource};

/// Title shown when the catalog returns neither `title` nor `name`
pub const UNKNOWN_TITLE: &str = "Desconhecido";

/// Normalized result from the movie catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogHit {
    pub title: String,
    /// Relevance in [0, 1]; `None` when the catalog has no rating
    pub score: Option<f64>,
    /// Catalog identifier used for watch-provider lookups
    pub id: Option<u64>,
}

// ============================================================================
// TMDB API Types
// ============================================================================

/// Paged response from `/discover/movie` and `/search/movie`
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbPage {
    #[serde(default, deserialize_with = "skip_malformed_rows")]
    pub results: Vec<TmdbMovie>,
}

/// Movie entry inside a TMDB page
///
/// Fields of the wrong type decode as absent instead of failing the page.
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbMovie {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<u64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub vote_average: Option<f64>,
}

/// Drops rows that are not movie objects, keeping the rest of the page
fn skip_malformed_rows<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<TmdbMovie>, D::Error> {
    let rows = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();

    Ok(rows
        .into_iter()
        .filter_map(|row| match serde_json::from_value(row) {
            Ok(movie) => Some(movie),
            Err(e) => {
                tracing::debug!(error = %e, "Skipping malformed TMDB row");
                None
            }
        })
        .collect())
}

/// Integer id, also accepted as a numeric string
fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

impl From<TmdbMovie> for CatalogHit {
    fn from(movie: TmdbMovie) -> Self {
        let title = movie
            .title
            .filter(|t| !t.trim().is_empty())
            .or(movie.name.filter(|n| !n.trim().is_empty()))
            .unwrap_or_else(|| UNKNOWN_TITLE.to_string());

        // TMDB rates on a 0-10 scale
        let score = movie.vote_average.map(|vote| (vote / 10.0).clamp(0.0, 1.0));

        CatalogHit {
            title,
            score,
            id: movie.id,
        }
    }
}

/// Response from `/movie/{id}/watch/providers`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TmdbWatchProviders {
    #[serde(default)]
    pub results: HashMap<String, TmdbRegionProviders>,
}

/// Provider categories available in a single region
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TmdbRegionProviders {
    #[serde(default)]
    pub flatrate: Vec<TmdbProvider>,
    #[serde(default)]
    pub rent: Vec<TmdbProvider>,
    #[serde(default)]
    pub buy: Vec<TmdbProvider>,
    #[serde(default)]
    pub ads: Vec<TmdbProvider>,
    #[serde(default)]
    pub free: Vec<TmdbProvider>,
}

impl TmdbRegionProviders {
    /// Provider names across categories: subscription, rental, purchase, ad-supported, free
    pub fn flatten(&self) -> Vec<String> {
        [&self.flatrate, &self.rent, &self.buy, &self.ads, &self.free]
            .into_iter()
            .flatten()
            .filter_map(|p| p.provider_name.clone())
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbProvider {
    #[serde(default)]
    pub provider_name: Option<String>,
}
