//! Fetch-result cache using moka
//!
//! Fetchers are idempotent, so successful results can be memoized per
//! required source. Errors are never cached.

use crate::collaborators::SourceFetcher;
use crate::config::CacheConfig;
use crate::error::FetchError;
use lex_core::{RawDocument, RequiredSource};
use moka::future::Cache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Statistics for cache monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of entries in cache
    pub entry_count: u64,
    /// Lookups served from the cache
    pub hits: u64,
    /// Lookups forwarded to the inner fetcher
    pub misses: u64,
}

impl CacheStats {
    /// Fraction of lookups served from the cache
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        self.hits as f64 / total as f64
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Caching decorator around a [`SourceFetcher`]
#[derive(Clone)]
pub struct CachedFetcher {
    inner: Arc<dyn SourceFetcher>,
    cache: Cache<RequiredSource, Arc<Vec<RawDocument>>>,
    counters: Arc<Counters>,
}

impl CachedFetcher {
    /// Wrap `inner` with the configured capacity and lifetime
    #[must_use]
    pub fn new(inner: Arc<dyn SourceFetcher>, config: &CacheConfig) -> Self {
        Self {
            inner,
            cache: Cache::builder()
                .max_capacity(config.max_capacity)
                .time_to_live(config.ttl())
                .build(),
            counters: Arc::default(),
        }
    }

    /// Get cache statistics
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.cache.entry_count(),
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
        }
    }

    /// Drop every cached result
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }
}

#[async_trait::async_trait]
impl SourceFetcher for CachedFetcher {
    async fn fetch(&self, source: &RequiredSource) -> Result<Vec<RawDocument>, FetchError> {
        if let Some(hit) = self.cache.get(source).await {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            let stats = self.stats();
            tracing::debug!(
                query = source.query(),
                hits = stats.hits,
                misses = stats.misses,
                "fetch cache hit"
            );
            return Ok(hit.as_ref().clone());
        }
        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        let docs = self.inner.fetch(source).await?;
        self.cache.insert(source.clone(), Arc::new(docs.clone())).await;
        let stats = self.stats();
        tracing::debug!(
            query = source.query(),
            hits = stats.hits,
            misses = stats.misses,
            entries = stats.entry_count,
            "fetch cache miss"
        );
        Ok(docs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lex_core::{Autoridad, SourceKind};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl SourceFetcher for Counting {
        async fn fetch(&self, source: &RequiredSource) -> Result<Vec<RawDocument>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(FetchError::Transient("down".into()));
            }
            Ok(vec![RawDocument::new("https://example.org/doc", source.query())])
        }
    }

    fn source() -> RequiredSource {
        RequiredSource::new(SourceKind::Norma, "ley 1480", Autoridad::CongresoDeLaRepublica)
    }

    #[tokio::test]
    async fn second_fetch_is_served_from_cache() {
        let inner = Arc::new(Counting::default());
        let cached = CachedFetcher::new(inner.clone(), &CacheConfig::default());
        let a = cached.fetch(&source()).await.unwrap();
        let b = cached.fetch(&source()).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stats_count_hits_and_misses() {
        let cached = CachedFetcher::new(Arc::new(Counting::default()), &CacheConfig::default());
        assert_eq!(cached.stats().hit_rate(), 0.0);
        for _ in 0..3 {
            cached.fetch(&source()).await.unwrap();
        }
        let stats = cached.stats();
        assert_eq!((stats.hits, stats.misses), (2, 1));
        assert!((stats.hit_rate() - 2.0 / 3.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn failed_fetch_counts_as_miss() {
        let cached = CachedFetcher::new(
            Arc::new(Counting {
                calls: AtomicUsize::new(0),
                fail: true,
            }),
            &CacheConfig::default(),
        );
        assert!(cached.fetch(&source()).await.is_err());
        let stats = cached.stats();
        assert_eq!((stats.hits, stats.misses), (0, 1));
    }

    #[tokio::test]
    async fn errors_are_not_cached() {
        let inner = Arc::new(Counting {
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let cached = CachedFetcher::new(inner.clone(), &CacheConfig::default());
        assert!(cached.fetch(&source()).await.is_err());
        assert!(cached.fetch(&source()).await.is_err());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }
}
