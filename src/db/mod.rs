pub mod cache;

pub use cache::normalize_mood;
pub use cache::Cache;
pub use cache::CacheKey;
