//! Request executor - lifecycle of one asynchronous request slot.
//!
//! A [`RequestExecutor`] owns the observable state of a single logical
//! request: it consults the [`RequestCache`] before running the
//! operation, serves fresh entries without a network round-trip,
//! revalidates stale ones in the background of the same call, and folds
//! every failure into its state fields instead of propagating errors to
//! the caller.
//!
//! Executors are `Clone`; clones share state and liveness, so a UI layer
//! can hold one handle for rendering while another drives `send`.

use crate::abort::AbortSignal;
use crate::cache::RequestCache;
use crate::key::CacheKeyBuilder;
use crate::metrics::{CacheMetrics, NoOpMetrics};
use crate::operation::RequestOperation;
use crate::outcome::FetchOutcome;
use crate::serialization::{deserialize_from_cache, serialize_for_cache};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

/// Default freshness window: entries younger than this are served without
/// revalidation.
pub const DEFAULT_FRESH_FOR: Duration = Duration::from_secs(5 * 60);

/// Default hard expiry.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(30 * 60);

/// Caching configuration for an executor.
///
/// Supplying any `CacheOptions` enables caching for the executor;
/// without them every `send` goes straight to the operation.
///
/// `fresh_for` is assumed not to exceed `max_age`. Violating that is not
/// rejected — entries are then stale the instant they are written, which
/// is unusual but valid (it degrades the executor to always-revalidate).
///
/// # Example
///
/// ```
/// use fetch_kit::executor::CacheOptions;
/// use std::time::Duration;
///
/// let options = CacheOptions::default()
///     .with_fresh_for(Duration::from_secs(60))
///     .with_max_age(Duration::from_secs(600));
/// ```
#[derive(Clone, Debug)]
pub struct CacheOptions {
    /// Window during which an entry is served without revalidation.
    pub fresh_for: Duration,

    /// Total lifetime before hard expiry.
    pub max_age: Duration,

    /// Serve stale-but-unexpired entries immediately while refetching in
    /// the background of the same call.
    pub stale_while_revalidate: bool,

    /// Explicit cache key. When absent the key is derived from the
    /// operation's name and serialized params.
    pub cache_key: Option<String>,
}

impl Default for CacheOptions {
    fn default() -> Self {
        CacheOptions {
            fresh_for: DEFAULT_FRESH_FOR,
            max_age: DEFAULT_MAX_AGE,
            stale_while_revalidate: true,
            cache_key: None,
        }
    }
}

impl CacheOptions {
    /// Override the freshness window.
    pub fn with_fresh_for(mut self, fresh_for: Duration) -> Self {
        self.fresh_for = fresh_for;
        self
    }

    /// Override the hard expiry.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Enable or disable stale-while-revalidate.
    pub fn with_stale_while_revalidate(mut self, enabled: bool) -> Self {
        self.stale_while_revalidate = enabled;
        self
    }

    /// Pin an explicit cache key, bypassing derivation.
    pub fn with_cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = Some(key.into());
        self
    }
}

/// Per-call switches for `send`.
///
/// Replaces positional booleans with an explicit config struct.
#[derive(Clone, Debug, Default)]
pub struct SendConfig {
    /// Clear the previous response and cache flags before fetching.
    pub remove_prior_data: bool,

    /// Also invoke the completion callback immediately after the
    /// operation resolves, before state is finalized.
    ///
    /// The callback then runs twice for one `send` — once before and once
    /// after finalization. That dual invocation is the documented
    /// contract; callers opting in must be idempotent.
    pub callback_before_resolve: bool,
}

impl SendConfig {
    /// Clear prior response data before fetching.
    pub fn with_remove_prior_data(mut self, enabled: bool) -> Self {
        self.remove_prior_data = enabled;
        self
    }

    /// Invoke the callback before state finalization as well as after.
    pub fn with_callback_before_resolve(mut self, enabled: bool) -> Self {
        self.callback_before_resolve = enabled;
        self
    }
}

/// Observable state of one request slot.
#[derive(Clone, Debug)]
pub struct RequestState<T> {
    /// Last response payload, if any.
    pub response: Option<T>,
    /// A `send` is in progress.
    pub pending: bool,
    /// The underlying operation is in flight (false while a fresh cache
    /// hit short-circuits).
    pub fetching: bool,
    /// Failure message of the last completed send; empty on success.
    pub error: String,
    /// Last completed send succeeded.
    pub success: bool,
    /// An operation has been invoked on this slot at least once.
    pub dirty: bool,
    /// Current response came from cache.
    pub from_cache: bool,
    /// Current response is stale cache data awaiting revalidation.
    pub stale: bool,
}

impl<T> Default for RequestState<T> {
    fn default() -> Self {
        RequestState {
            response: None,
            pending: false,
            fetching: false,
            error: String::new(),
            success: false,
            dirty: false,
            from_cache: false,
            stale: false,
        }
    }
}

/// Executor for one logical request slot.
///
/// # Example
///
/// ```ignore
/// use fetch_kit::{RequestExecutor, RequestCache, CacheOptions, FnOperation, FetchOutcome};
///
/// let cache = RequestCache::new();
/// let executor = RequestExecutor::new(cache)
///     .with_cache_options(CacheOptions::default());
///
/// let op = FnOperation::new("list_journals", params, |_abort| async {
///     Ok(FetchOutcome::ok(fetch_from_api().await?))
/// });
/// let outcome = executor.send(op).await;
/// let state = executor.state();
/// ```
pub struct RequestExecutor<T> {
    cache: RequestCache,
    options: Option<CacheOptions>,
    metrics: Arc<dyn CacheMetrics>,
    state: Arc<RwLock<RequestState<T>>>,
    alive: Arc<AtomicBool>,
    seq: Arc<AtomicU64>,
    last_key: Arc<RwLock<Option<String>>>,
}

impl<T> Clone for RequestExecutor<T> {
    fn clone(&self) -> Self {
        RequestExecutor {
            cache: self.cache.clone(),
            options: self.options.clone(),
            metrics: self.metrics.clone(),
            state: self.state.clone(),
            alive: self.alive.clone(),
            seq: self.seq.clone(),
            last_key: self.last_key.clone(),
        }
    }
}

impl<T> RequestExecutor<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync,
{
    /// Create an executor without caching (every send runs the operation).
    pub fn new(cache: RequestCache) -> Self {
        RequestExecutor {
            cache,
            options: None,
            metrics: Arc::new(NoOpMetrics),
            state: Arc::new(RwLock::new(RequestState::default())),
            alive: Arc::new(AtomicBool::new(true)),
            seq: Arc::new(AtomicU64::new(0)),
            last_key: Arc::new(RwLock::new(None)),
        }
    }

    /// Enable caching with the given options.
    pub fn with_cache_options(mut self, options: CacheOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Set custom metrics handler.
    pub fn with_metrics(mut self, metrics: Box<dyn CacheMetrics>) -> Self {
        self.metrics = Arc::from(metrics);
        self
    }

    /// Snapshot of the current request state.
    pub fn state(&self) -> RequestState<T> {
        self.state
            .read()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// Mark the owning consumer as torn down.
    ///
    /// In-flight operations are allowed to settle but their results are
    /// discarded; no state mutation happens past this point.
    pub fn dispose(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    /// True until `dispose` is called.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Execute the operation with default config and no callback.
    pub async fn send<O>(&self, op: O) -> FetchOutcome<T>
    where
        O: RequestOperation<T>,
    {
        self.send_with_config(op, |_: &FetchOutcome<T>| {}, SendConfig::default())
            .await
    }

    /// Execute the operation with a completion callback.
    pub async fn send_with<O, C>(&self, op: O, on_complete: C) -> FetchOutcome<T>
    where
        O: RequestOperation<T>,
        C: FnMut(&FetchOutcome<T>) + Send,
    {
        self.send_with_config(op, on_complete, SendConfig::default())
            .await
    }

    /// Execute the operation.
    ///
    /// Lifecycle:
    /// 1. Resolve the cache key (explicit option wins over derivation).
    /// 2. With caching enabled: a fresh entry short-circuits the call
    ///    entirely; a stale unexpired entry is published immediately and
    ///    the operation still runs (stale-while-revalidate); otherwise
    ///    fall through to a plain fetch.
    /// 3. Run the operation, write the result to cache and state, and
    ///    invoke the callback with the resolved outcome.
    ///
    /// Failures never propagate: an `Err` from the operation (or a
    /// resolved `success: false`) lands in the `error` state field and in
    /// the returned outcome. `Error::Aborted` is swallowed entirely —
    /// superseded work is not a user-visible failure.
    ///
    /// A completion that has been superseded by a newer `send` on the same
    /// slot, or that settles after `dispose`, mutates nothing.
    pub async fn send_with_config<O, C>(
        &self,
        mut op: O,
        mut on_complete: C,
        config: SendConfig,
    ) -> FetchOutcome<T>
    where
        O: RequestOperation<T>,
        C: FnMut(&FetchOutcome<T>) + Send,
    {
        let request_id = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        let timer = Instant::now();

        let cache_key = self.resolve_cache_key(&op);
        if let Ok(mut guard) = self.last_key.write() {
            guard.clone_from(&cache_key);
        }

        // Cache consultation
        if let (Some(opts), Some(key)) = (&self.options, &cache_key) {
            if let Some(entry) = self.cache.get(key) {
                match deserialize_from_cache::<T>(&entry.data) {
                    Ok(data) => {
                        if entry.is_fresh(opts.fresh_for) {
                            debug!("» Send {} -> fresh cache hit, short-circuit", key);
                            let outcome = FetchOutcome::ok(data.clone());
                            self.write_state(|s| {
                                s.response = Some(data);
                                s.pending = false;
                                s.fetching = false;
                                s.error.clear();
                                s.success = true;
                                s.from_cache = true;
                                s.stale = false;
                            });
                            self.metrics.record_hit(key, timer.elapsed());
                            on_complete(&outcome);
                            return outcome;
                        }

                        if opts.stale_while_revalidate {
                            debug!("» Send {} -> stale hit, revalidating", key);
                            self.write_state(|s| {
                                s.response = Some(data);
                                s.from_cache = true;
                                s.stale = true;
                            });
                            self.metrics.record_stale_hit(key);
                        }
                        // Stale without revalidation serving falls through
                        // to a plain fetch with no pre-population.
                    }
                    Err(e) => {
                        // Corrupt or version-drifted entry: evict, refetch
                        warn!("Evicting undecodable cache entry {}: {}", key, e);
                        self.cache.invalidate(key);
                    }
                }
            }
        }

        // Fetch phase
        self.write_state(|s| {
            s.pending = true;
            s.fetching = true;
            s.error.clear();
            s.success = false;
            if config.remove_prior_data {
                s.response = None;
                s.from_cache = false;
                s.stale = false;
            }
            s.dirty = true;
        });

        let result = op.run(&AbortSignal::never()).await;

        let superseded = self.seq.load(Ordering::SeqCst) != request_id;
        if superseded || !self.is_alive() {
            debug!(
                "Send result discarded (superseded: {}, disposed: {})",
                superseded,
                !self.is_alive()
            );
            return match result {
                Ok(outcome) => outcome,
                Err(e) => FetchOutcome::fail(e.to_string()),
            };
        }

        match result {
            Ok(outcome) => {
                if config.callback_before_resolve {
                    on_complete(&outcome);
                }

                if outcome.success {
                    if let (Some(opts), Some(key), Some(data)) =
                        (&self.options, &cache_key, &outcome.data)
                    {
                        match serialize_for_cache(data) {
                            Ok(bytes) => {
                                self.cache.set(key, bytes, opts.max_age);
                                self.metrics.record_set(key);
                            }
                            Err(e) => warn!("Skipping cache write for {}: {}", key, e),
                        }
                    }
                    if let Some(key) = &cache_key {
                        self.metrics.record_miss(key, timer.elapsed());
                    }
                    info!("✓ Request resolved in {:?}", timer.elapsed());
                } else if let Some(key) = &cache_key {
                    self.metrics.record_error(key, &outcome.error_message());
                }

                let error = if outcome.success {
                    String::new()
                } else {
                    outcome.error_message()
                };
                self.write_state(|s| {
                    s.pending = false;
                    s.fetching = false;
                    s.response = outcome.data.clone();
                    s.error = error;
                    s.success = outcome.success;
                    s.from_cache = false;
                    s.stale = false;
                });

                on_complete(&outcome);
                outcome
            }
            Err(crate::error::Error::Aborted) => {
                // Superseded work, not a user-visible failure
                debug!("Send aborted; leaving state untouched");
                self.write_state(|s| {
                    s.pending = false;
                    s.fetching = false;
                });
                FetchOutcome {
                    success: false,
                    data: None,
                    error: None,
                    status: None,
                }
            }
            Err(e) => {
                let message = e.to_string();
                if let Some(key) = &cache_key {
                    self.metrics.record_error(key, &message);
                }
                self.write_state(|s| {
                    s.pending = false;
                    s.fetching = false;
                    s.error = message.clone();
                    s.success = false;
                    s.from_cache = false;
                    s.stale = false;
                });
                FetchOutcome::fail(message)
            }
        }
    }

    /// Remove the cache entry for this executor's key, or an explicit one.
    ///
    /// With no override, the explicit `cache_key` option is preferred,
    /// falling back to the key of the most recent `send`.
    pub fn invalidate_cache(&self, key: Option<&str>) {
        let target = key.map(str::to_string).or_else(|| {
            self.options
                .as_ref()
                .and_then(|o| o.cache_key.clone())
                .or_else(|| self.last_key.read().ok().and_then(|k| k.clone()))
        });

        if let Some(target) = target {
            self.cache.invalidate(&target);
            self.metrics.record_invalidate(&target);
        }
    }

    /// Invalidate first, then fetch with prior data cleared.
    ///
    /// Guarantees an operation round-trip even when a fresh entry exists.
    pub async fn refresh<O, C>(&self, op: O, on_complete: C) -> FetchOutcome<T>
    where
        O: RequestOperation<T>,
        C: FnMut(&FetchOutcome<T>) + Send,
    {
        if let Some(key) = self.resolve_cache_key(&op) {
            self.cache.invalidate(&key);
            self.metrics.record_invalidate(&key);
        }
        self.send_with_config(
            op,
            on_complete,
            SendConfig::default().with_remove_prior_data(true),
        )
        .await
    }

    /// Explicit key option, else derived from the operation.
    ///
    /// Returns `None` when caching is disabled, and also — with a warning —
    /// when params fail to serialize, degrading that send to uncached.
    fn resolve_cache_key<O>(&self, op: &O) -> Option<String>
    where
        O: RequestOperation<T>,
    {
        let opts = self.options.as_ref()?;
        if let Some(key) = &opts.cache_key {
            return Some(key.clone());
        }
        match CacheKeyBuilder::derive(op.name(), op.params()) {
            Ok(key) => Some(key),
            Err(e) => {
                warn!("Key derivation failed for {}: {}; send uncached", op.name(), e);
                None
            }
        }
    }

    fn write_state(&self, f: impl FnOnce(&mut RequestState<T>)) {
        if !self.is_alive() {
            return;
        }
        if let Ok(mut guard) = self.state.write() {
            f(&mut guard);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::FnOperation;
    use serde::{Deserialize, Serialize};
    use std::sync::atomic::AtomicUsize;

    #[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
    struct Journal {
        id: u32,
        title: String,
    }

    #[derive(Clone, Serialize)]
    struct ListParams {
        page: u32,
    }

    fn journal(id: u32) -> Journal {
        Journal {
            id,
            title: format!("entry {}", id),
        }
    }

    type OpFuture = futures::future::BoxFuture<
        'static,
        crate::error::Result<FetchOutcome<Vec<Journal>>>,
    >;

    fn counting_op(
        calls: Arc<AtomicUsize>,
        payload: Vec<Journal>,
    ) -> FnOperation<ListParams, impl FnMut(AbortSignal) -> OpFuture + Send> {
        FnOperation::new(
            "list_journals",
            ListParams { page: 0 },
            move |_abort| -> OpFuture {
                let calls = calls.clone();
                let payload = payload.clone();
                Box::pin(async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(FetchOutcome::ok(payload))
                })
            },
        )
    }

    #[tokio::test]
    async fn test_send_without_cache_always_fetches() {
        let calls = Arc::new(AtomicUsize::new(0));
        let executor: RequestExecutor<Vec<Journal>> = RequestExecutor::new(RequestCache::new());

        executor.send(counting_op(calls.clone(), vec![journal(1)])).await;
        executor.send(counting_op(calls.clone(), vec![journal(1)])).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let state = executor.state();
        assert!(state.success);
        assert!(!state.from_cache);
        assert!(state.dirty);
    }

    #[tokio::test]
    async fn test_fresh_hit_short_circuits_operation() {
        let calls = Arc::new(AtomicUsize::new(0));
        let executor: RequestExecutor<Vec<Journal>> = RequestExecutor::new(RequestCache::new())
            .with_cache_options(CacheOptions::default());

        let outcome = executor
            .send(counting_op(calls.clone(), vec![journal(1), journal(2)]))
            .await;
        assert!(outcome.success);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Same operation identity and params: must not invoke again
        let outcome = executor
            .send(counting_op(calls.clone(), vec![journal(9)]))
            .await;
        assert!(outcome.success);
        assert_eq!(calls.load(Ordering::SeqCst), 1, "Fresh hit must not fetch");

        let state = executor.state();
        assert!(state.from_cache);
        assert!(!state.stale);
        assert!(state.success);
        assert_eq!(
            state.response.expect("Response missing"),
            vec![journal(1), journal(2)]
        );
    }

    #[tokio::test]
    async fn test_fresh_hit_still_invokes_callback() {
        let executor: RequestExecutor<Vec<Journal>> = RequestExecutor::new(RequestCache::new())
            .with_cache_options(CacheOptions::default());

        executor.send(counting_op(Arc::new(AtomicUsize::new(0)), vec![journal(1)])).await;

        let callback_calls = Arc::new(AtomicUsize::new(0));
        let cb = callback_calls.clone();
        executor
            .send_with(
                counting_op(Arc::new(AtomicUsize::new(0)), vec![journal(2)]),
                move |outcome: &FetchOutcome<Vec<Journal>>| {
                    assert!(outcome.success);
                    cb.fetch_add(1, Ordering::SeqCst);
                },
            )
            .await;

        assert_eq!(callback_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_shared_cache_deduplicates_across_executors() {
        let cache = RequestCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let first: RequestExecutor<Vec<Journal>> =
            RequestExecutor::new(cache.clone()).with_cache_options(CacheOptions::default());
        first.send(counting_op(calls.clone(), vec![journal(1)])).await;

        let second: RequestExecutor<Vec<Journal>> =
            RequestExecutor::new(cache).with_cache_options(CacheOptions::default());
        second.send(counting_op(calls.clone(), vec![journal(2)])).await;

        // Same derived key, so the second executor reads the first's entry
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            second.state().response.expect("Response missing"),
            vec![journal(1)]
        );
    }

    #[tokio::test]
    async fn test_stale_while_revalidate_publishes_stale_then_fresh() {
        let cache = RequestCache::new();
        let executor: RequestExecutor<Vec<Journal>> = RequestExecutor::new(cache.clone())
            .with_cache_options(
                CacheOptions::default()
                    .with_fresh_for(Duration::from_millis(50))
                    .with_max_age(Duration::from_secs(10)),
            );

        executor
            .send(counting_op(Arc::new(AtomicUsize::new(0)), vec![journal(1)]))
            .await;
        tokio::time::sleep(Duration::from_millis(80)).await;

        // Slow revalidation so the stale window is observable
        let slow_op = FnOperation::new("list_journals", ListParams { page: 0 }, |_abort| async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok(FetchOutcome::ok(vec![journal(2)]))
        });

        let observer = executor.clone();
        let send_task = tokio::spawn(async move { executor.send(slow_op).await });

        tokio::time::sleep(Duration::from_millis(30)).await;
        let mid = observer.state();
        assert!(mid.from_cache, "Stale data should be published immediately");
        assert!(mid.stale);
        assert!(mid.pending);
        assert!(mid.fetching);
        assert_eq!(mid.response.clone().expect("Stale response missing"), vec![journal(1)]);

        send_task.await.expect("Send task failed");
        let done = observer.state();
        assert!(!done.from_cache);
        assert!(!done.stale);
        assert!(done.success);
        assert_eq!(done.response.expect("Response missing"), vec![journal(2)]);

        // Revalidation refreshed the cache entry
        let key = CacheKeyBuilder::derive("list_journals", &ListParams { page: 0 })
            .expect("Failed to derive");
        assert!(cache.is_fresh(&key, Duration::from_millis(50)));
    }

    #[tokio::test]
    async fn test_stale_without_swr_fetches_plainly() {
        let executor: RequestExecutor<Vec<Journal>> = RequestExecutor::new(RequestCache::new())
            .with_cache_options(
                CacheOptions::default()
                    .with_fresh_for(Duration::from_millis(20))
                    .with_stale_while_revalidate(false),
            );

        let calls = Arc::new(AtomicUsize::new(0));
        executor.send(counting_op(calls.clone(), vec![journal(1)])).await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        executor.send(counting_op(calls.clone(), vec![journal(2)])).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let state = executor.state();
        assert!(!state.stale);
        assert_eq!(state.response.expect("Response missing"), vec![journal(2)]);
    }

    #[tokio::test]
    async fn test_operation_error_lands_in_state() {
        let executor: RequestExecutor<Vec<Journal>> = RequestExecutor::new(RequestCache::new());

        let op = FnOperation::new("failing", (), |_abort| async {
            Err(crate::error::Error::OperationFailed("connection reset".to_string()))
        });

        let outcome: FetchOutcome<Vec<Journal>> = executor.send(op).await;
        assert!(!outcome.success);

        let state = executor.state();
        assert!(!state.success);
        assert!(!state.pending);
        assert!(state.error.contains("connection reset"));
    }

    #[tokio::test]
    async fn test_in_band_failure_sets_error_and_calls_back() {
        let executor: RequestExecutor<Vec<Journal>> = RequestExecutor::new(RequestCache::new());

        let op = FnOperation::new("not_found", (), |_abort| async {
            Ok(FetchOutcome::<Vec<Journal>>::fail("no such resource").with_status(404))
        });

        let callback_calls = Arc::new(AtomicUsize::new(0));
        let cb = callback_calls.clone();
        executor
            .send_with(op, move |outcome: &FetchOutcome<Vec<Journal>>| {
                assert_eq!(outcome.status, Some(404));
                cb.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        let state = executor.state();
        assert!(!state.success);
        assert_eq!(state.error, "no such resource");
        assert_eq!(callback_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_aborted_operation_is_swallowed() {
        let executor: RequestExecutor<Vec<Journal>> = RequestExecutor::new(RequestCache::new());

        let op = FnOperation::new("superseded", (), |_abort| async {
            Err(crate::error::Error::Aborted)
        });

        let callback_calls = Arc::new(AtomicUsize::new(0));
        let cb = callback_calls.clone();
        executor
            .send_with(op, move |_: &FetchOutcome<Vec<Journal>>| {
                cb.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        let state = executor.state();
        assert!(state.error.is_empty(), "Abort must not surface as error");
        assert!(!state.pending);
        assert_eq!(callback_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_callback_before_resolve_invokes_twice() {
        let executor: RequestExecutor<Vec<Journal>> = RequestExecutor::new(RequestCache::new());

        let callback_calls = Arc::new(AtomicUsize::new(0));
        let cb = callback_calls.clone();
        executor
            .send_with_config(
                counting_op(Arc::new(AtomicUsize::new(0)), vec![journal(1)]),
                move |_: &FetchOutcome<Vec<Journal>>| {
                    cb.fetch_add(1, Ordering::SeqCst);
                },
                SendConfig::default().with_callback_before_resolve(true),
            )
            .await;

        assert_eq!(callback_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_remove_prior_data_clears_response() {
        let executor: RequestExecutor<Vec<Journal>> = RequestExecutor::new(RequestCache::new());

        executor
            .send(counting_op(Arc::new(AtomicUsize::new(0)), vec![journal(1)]))
            .await;
        assert!(executor.state().response.is_some());

        let slow_op = FnOperation::new("slow", (), |_abort| async {
            tokio::time::sleep(Duration::from_millis(80)).await;
            Ok(FetchOutcome::ok(vec![journal(2)]))
        });

        let observer = executor.clone();
        let task = tokio::spawn(async move {
            executor
                .send_with_config(
                    slow_op,
                    |_: &FetchOutcome<Vec<Journal>>| {},
                    SendConfig::default().with_remove_prior_data(true),
                )
                .await
        });

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(
            observer.state().response.is_none(),
            "Prior data should be cleared while fetching"
        );

        task.await.expect("Send task failed");
        assert_eq!(
            observer.state().response.expect("Response missing"),
            vec![journal(2)]
        );
    }

    #[tokio::test]
    async fn test_disposed_executor_discards_settled_result() {
        let executor: RequestExecutor<Vec<Journal>> = RequestExecutor::new(RequestCache::new());

        executor
            .send(counting_op(Arc::new(AtomicUsize::new(0)), vec![journal(1)]))
            .await;

        let slow_op = FnOperation::new("slow", (), |_abort| async {
            tokio::time::sleep(Duration::from_millis(60)).await;
            Ok(FetchOutcome::ok(vec![journal(2)]))
        });

        let observer = executor.clone();
        let task = tokio::spawn(async move { executor.send(slow_op).await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        observer.dispose();
        task.await.expect("Send task failed");

        // The in-flight promise settled but its result was discarded
        assert_eq!(
            observer.state().response.expect("Response missing"),
            vec![journal(1)]
        );
    }

    #[tokio::test]
    async fn test_superseded_send_does_not_overwrite_newer() {
        let executor: RequestExecutor<Vec<Journal>> = RequestExecutor::new(RequestCache::new());

        let slow_op = FnOperation::new("slow", (), |_abort| async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok(FetchOutcome::ok(vec![journal(1)]))
        });
        let fast_op = FnOperation::new("fast", (), |_abort| async {
            Ok(FetchOutcome::ok(vec![journal(2)]))
        });

        let slow_exec = executor.clone();
        let slow_task = tokio::spawn(async move { slow_exec.send(slow_op).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        executor.send(fast_op).await;

        slow_task.await.expect("Slow task failed");

        // The older send settled last but was discarded
        assert_eq!(
            executor.state().response.expect("Response missing"),
            vec![journal(2)]
        );
    }

    #[tokio::test]
    async fn test_refresh_forces_round_trip() {
        let calls = Arc::new(AtomicUsize::new(0));
        let executor: RequestExecutor<Vec<Journal>> = RequestExecutor::new(RequestCache::new())
            .with_cache_options(CacheOptions::default());

        executor.send(counting_op(calls.clone(), vec![journal(1)])).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // A fresh entry exists, but refresh must still hit the operation
        executor
            .refresh(
                counting_op(calls.clone(), vec![journal(2)]),
                |_: &FetchOutcome<Vec<Journal>>| {},
            )
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            executor.state().response.expect("Response missing"),
            vec![journal(2)]
        );
    }

    #[tokio::test]
    async fn test_invalidate_cache_uses_last_key() {
        let cache = RequestCache::new();
        let executor: RequestExecutor<Vec<Journal>> =
            RequestExecutor::new(cache.clone()).with_cache_options(CacheOptions::default());

        executor
            .send(counting_op(Arc::new(AtomicUsize::new(0)), vec![journal(1)]))
            .await;
        assert_eq!(cache.len(), 1);

        executor.invalidate_cache(None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_explicit_cache_key_overrides_derivation() {
        let cache = RequestCache::new();
        let executor: RequestExecutor<Vec<Journal>> = RequestExecutor::new(cache.clone())
            .with_cache_options(CacheOptions::default().with_cache_key("journals_page_0"));

        executor
            .send(counting_op(Arc::new(AtomicUsize::new(0)), vec![journal(1)]))
            .await;

        assert!(cache.get("journals_page_0").is_some());
    }

    #[tokio::test]
    async fn test_dirty_tracks_operation_invocation() {
        let executor: RequestExecutor<Vec<Journal>> = RequestExecutor::new(RequestCache::new())
            .with_cache_options(CacheOptions::default());

        assert!(!executor.state().dirty);

        executor
            .send(counting_op(Arc::new(AtomicUsize::new(0)), vec![journal(1)]))
            .await;
        assert!(executor.state().dirty);
    }
}
