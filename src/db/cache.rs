use lru::LruCache;
use parking_lot::Mutex;
use std::fmt::Display;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::ConfigError;
use crate::models::RecommendationList;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Recommendations(String),
}

impl CacheKey {
    /// Key for a mood, normalized by trimming and lower-casing
    pub fn for_mood(mood: &str) -> Self {
        CacheKey::Recommendations(normalize_mood(mood))
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Recommendations(mood) => write!(f, "recs:{}", mood),
        }
    }
}

/// Trims and lower-cases a mood; also the catalog paging seed
pub fn normalize_mood(mood: &str) -> String {
    mood.trim().to_lowercase()
}

struct CacheEntry {
    value: RecommendationList,
    inserted_at: Instant,
}

/// Process-wide recommendation cache
///
/// Entries expire a fixed time after insertion and are checked lazily on
/// read. Once the capacity is reached the least recently used entry is
/// evicted. Concurrent writers for the same key simply overwrite each other.
#[derive(Clone)]
pub struct Cache {
    inner: Arc<Mutex<LruCache<CacheKey, CacheEntry>>>,
    ttl: Duration,
}

impl Cache {
    pub fn new(capacity: usize, ttl: Duration) -> Result<Self, ConfigError> {
        let capacity = NonZeroUsize::new(capacity).ok_or_else(|| {
            ConfigError::Invalid("cache capacity must be greater than zero".to_string())
        })?;

        Ok(Self {
            inner: Arc::new(Mutex::new(LruCache::new(capacity))),
            ttl,
        })
    }

    /// Returns the cached list, or `None` if absent or expired
    pub fn get(&self, key: &CacheKey) -> Option<RecommendationList> {
        let mut cache = self.inner.lock();
        if let Some(entry) = cache.get(key) {
            if entry.inserted_at.elapsed() < self.ttl {
                return Some(entry.value.clone());
            }
            cache.pop(key);
        }
        None
    }

    pub fn insert(&self, key: CacheKey, value: RecommendationList) {
        let mut cache = self.inner.lock();
        cache.put(
            key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
