//! Metrics hooks for request-cache operations.
//!
//! Implement [`CacheMetrics`] to feed hits, misses, and errors into your
//! monitoring system; the default methods log via the `log` crate, and
//! [`NoOpMetrics`] silences them entirely.
//!
//! ```ignore
//! use fetch_kit::metrics::CacheMetrics;
//! use std::time::Duration;
//!
//! struct PrometheusMetrics;
//!
//! impl CacheMetrics for PrometheusMetrics {
//!     fn record_hit(&self, _key: &str, _duration: Duration) {
//!         // counter!("request_cache_hits").inc();
//!     }
//!     // ... other hooks as needed
//! }
//!
//! // let executor = RequestExecutor::new(cache, options)
//! //     .with_metrics(Box::new(PrometheusMetrics));
//! ```

use std::time::Duration;

/// Trait for cache metrics collection.
pub trait CacheMetrics: Send + Sync {
    /// Record a fresh cache hit (operation short-circuited).
    fn record_hit(&self, key: &str, duration: Duration) {
        debug!("Cache HIT: {} took {:?}", key, duration);
    }

    /// Record a stale hit (old data served while revalidating).
    fn record_stale_hit(&self, key: &str) {
        debug!("Cache STALE HIT: {}", key);
    }

    /// Record a cache miss (operation invoked).
    fn record_miss(&self, key: &str, duration: Duration) {
        debug!("Cache MISS: {} took {:?}", key, duration);
    }

    /// Record a cache write.
    fn record_set(&self, key: &str) {
        debug!("Cache SET: {}", key);
    }

    /// Record an invalidation.
    fn record_invalidate(&self, key: &str) {
        debug!("Cache INVALIDATE: {}", key);
    }

    /// Record an operation or cache error.
    fn record_error(&self, key: &str, error: &str) {
        warn!("Cache ERROR for {}: {}", key, error);
    }
}

/// Default metrics implementation (no-op).
#[derive(Clone, Default)]
pub struct NoOpMetrics;

impl CacheMetrics for NoOpMetrics {
    fn record_hit(&self, _key: &str, _duration: Duration) {}
    fn record_stale_hit(&self, _key: &str) {}
    fn record_miss(&self, _key: &str, _duration: Duration) {}
    fn record_set(&self, _key: &str) {}
    fn record_invalidate(&self, _key: &str) {}
    fn record_error(&self, _key: &str, _error: &str) {}
}
