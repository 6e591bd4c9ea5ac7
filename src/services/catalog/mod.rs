/// Movie catalog abstraction
///
/// The orchestrator only sees this trait; the TMDB implementation owns the
/// HTTP details, paging seed and retry policy.
use crate::{error::CatalogError, models::CatalogHit};

pub mod seed;
pub mod tmdb;

pub use tmdb::TmdbCatalog;

/// Maximum number of hits returned by discovery and search
pub const MAX_HITS: usize = 10;

/// Idempotent reads against a third-party movie catalog
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogClient: Send + Sync {
    /// Genre-filtered discovery
    ///
    /// Page and sort order are derived from `seed`, so identical seeds return
    /// identical pages.
    async fn discover_by_genres(
        &self,
        genre_ids: &[u32],
        seed: &str,
    ) -> Result<Vec<CatalogHit>, CatalogError>;

    /// Free-text title search, used when discovery comes back empty
    async fn search_by_mood(&self, mood: &str) -> Result<Vec<CatalogHit>, CatalogError>;

    /// Streaming providers for a title in the configured region
    async fn get_watch_providers(&self, catalog_id: u64) -> Result<Vec<String>, CatalogError>;

    /// Catalog name for logging and diagnostics
    fn name(&self) -> &'static str;
}
