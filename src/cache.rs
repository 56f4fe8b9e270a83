//! In-memory cache of ranked run results.
//!
//! Keyed by the (lowercased query, provider set, limit) triple so that a user
//! retyping a recent query gets an instant answer. Uses [`moka`] for
//! async-friendly caching with TTL and bounded capacity. Nothing is persisted.

use std::time::Duration;

use moka::future::Cache;

use crate::query::QueryContext;
use crate::types::{Provider, ScoredCandidate};

/// Maximum number of cached result sets.
const MAX_CACHE_ENTRIES: u64 = 100;

/// Composite cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    query: String,
    providers: Vec<Provider>,
    limit: usize,
}

impl CacheKey {
    /// Build a key that ignores query case, surrounding whitespace and
    /// provider order.
    pub fn new(query: &str, providers: &[Provider], limit: usize) -> Self {
        let mut providers = providers.to_vec();
        providers.sort();
        providers.dedup();
        Self {
            query: query.trim().to_lowercase(),
            providers,
            limit,
        }
    }

    pub fn for_context(context: &QueryContext) -> Self {
        Self::new(&context.raw, &context.providers, context.limit)
    }
}

/// TTL-bounded cache of ranked results.
#[derive(Clone)]
pub struct ResultCache {
    inner: Cache<CacheKey, Vec<ScoredCandidate>>,
}

impl ResultCache {
    /// Create a cache whose entries expire `ttl_seconds` after insertion.
    ///
    /// Returns `None` when `ttl_seconds` is 0 (caching disabled).
    pub fn new(ttl_seconds: u64) -> Option<Self> {
        if ttl_seconds == 0 {
            return None;
        }
        let inner = Cache::builder()
            .max_capacity(MAX_CACHE_ENTRIES)
            .time_to_live(Duration::from_secs(ttl_seconds))
            .build();
        Some(Self { inner })
    }

    pub async fn get(&self, key: &CacheKey) -> Option<Vec<ScoredCandidate>> {
        self.inner.get(key).await
    }

    pub async fn insert(&self, key: CacheKey, results: Vec<ScoredCandidate>) {
        self.inner.insert(key, results).await;
    }
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("entries", &self.inner.entry_count())
            .finish()
    }
}
