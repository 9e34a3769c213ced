//! Pagination controller - one paged, searchable collection.
//!
//! A [`PaginationController`] presents a single `data`/`page`/`next`/
//! `previous` surface backed by a caller-supplied fetch callback, while
//! internally coordinating two independent cursors: one for browsing the
//! unfiltered listing and one for a search-scoped listing. Setting a
//! search term switches the active cursor; clearing it (with `auto`
//! enabled) switches back without losing browse progress.
//!
//! Search fetches are debounced by a short window (20 ms by default —
//! just enough to collapse back-to-back triggers, not a typing debounce)
//! and an in-flight search is aborted when a newer one supersedes it.
//! Browse fetches have no cancellation.
//!
//! Page numbering: cursors store the last fetched page number and start
//! at 0, meaning "nothing fetched yet"; advancing requests `page + 1`,
//! so the first requested page is 1. The `previous` boundary guard
//! treats 1 as the first page. A stay-on-current fetch against a freshly
//! reset cursor therefore requests page 0 — an inherited interface
//! inconsistency that is preserved deliberately.

use crate::abort::{AbortHandle, AbortSignal};
use crate::cache::RequestCache;
use crate::error::Result;
use crate::executor::{CacheOptions, RequestExecutor, SendConfig};
use crate::operation::FnOperation;
use crate::outcome::FetchOutcome;
use crate::sink::ItemSink;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Default page size.
pub const DEFAULT_PER_PAGE: u32 = 10;

/// Default debounce window for search fetches.
pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(20);

/// One paged request handed to the fetch callback.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PageRequest {
    /// Active search term, absent in browse mode.
    pub search: Option<String>,
    /// Requested page number.
    pub page: u32,
    /// Requested page size.
    pub limit: u32,
}

/// One page of results as reported by the fetch callback.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_pages: u32,
}

/// Fetch callback supplied by the caller.
///
/// Receives the paged request and an abort signal; honoring the signal is
/// the callback's responsibility (forward it to the transport layer).
pub type PageFetcher<T> =
    Arc<dyn Fn(PageRequest, AbortSignal) -> BoxFuture<'static, Result<FetchOutcome<Page<T>>>> + Send + Sync>;

/// Pagination state for one mode (browse or search).
///
/// `page` is the last successfully fetched page number, 0-based in the
/// sense that 0 means "nothing fetched yet"; fetched pages count from 1.
#[derive(Clone, Debug)]
pub struct PageCursor {
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
    /// The last page has been reached (a fetch returned fewer items than
    /// `limit`).
    pub done: bool,
}

impl PageCursor {
    fn new(limit: u32) -> Self {
        PageCursor {
            page: 0,
            limit,
            total_pages: 1,
            done: false,
        }
    }

    /// Zero the position and termination flag, optionally changing the
    /// page size. Accumulated `total_pages` survives a reset.
    fn reset(&mut self, limit: Option<u32>) {
        self.page = 0;
        self.done = false;
        if let Some(limit) = limit {
            self.limit = limit;
        }
    }

    fn target_page(&self, advancing: bool, stay_on_current: bool) -> u32 {
        if advancing {
            if stay_on_current {
                self.page
            } else {
                self.page + 1
            }
        } else {
            self.page.saturating_sub(1)
        }
    }
}

/// Configuration for a pagination controller.
#[derive(Clone, Debug)]
pub struct PaginationConfig {
    /// Initial page size.
    pub per_page: u32,
    /// Automatically return to browse mode when the search term empties.
    pub auto: bool,
    /// Cache options for the underlying executor; `None` disables caching.
    pub cache: Option<CacheOptions>,
    /// Operation identity used for cache-key derivation.
    pub operation: String,
    /// Debounce window for search fetches.
    pub debounce: Duration,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        PaginationConfig {
            per_page: DEFAULT_PER_PAGE,
            auto: true,
            cache: None,
            operation: "paginate".to_string(),
            debounce: DEFAULT_SEARCH_DEBOUNCE,
        }
    }
}

impl PaginationConfig {
    /// Set the initial page size.
    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page;
        self
    }

    /// Enable or disable automatic return to browse mode.
    pub fn with_auto(mut self, auto: bool) -> Self {
        self.auto = auto;
        self
    }

    /// Enable caching with the given options.
    pub fn with_cache(mut self, options: CacheOptions) -> Self {
        self.cache = Some(options);
        self
    }

    /// Set the operation identity for cache-key derivation.
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = operation.into();
        self
    }

    /// Override the search debounce window.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }
}

struct Pager<T> {
    fetcher: PageFetcher<T>,
    sink: Option<Arc<dyn ItemSink<T>>>,
    config: PaginationConfig,
    search: String,
    searching: bool,
    browse: PageCursor,
    search_cursor: PageCursor,
    /// Last successful response of either flow; the data source when no
    /// sink applies.
    last_page: Option<Page<T>>,
    /// Total page count reported by the last successful response.
    last_total: u32,
    debounce: Option<JoinHandle<()>>,
    abort: Option<AbortHandle>,
    /// Search generation; bumped whenever a newer search supersedes the
    /// current one.
    epoch: u64,
}

impl<T> Pager<T> {
    fn active_cursor(&self) -> &PageCursor {
        if self.searching {
            &self.search_cursor
        } else {
            &self.browse
        }
    }

    fn active_cursor_mut(&mut self) -> &mut PageCursor {
        if self.searching {
            &mut self.search_cursor
        } else {
            &mut self.browse
        }
    }

    fn request_for(&self, advancing: bool, stay_on_current: bool) -> (PageRequest, u32) {
        let cursor = self.active_cursor();
        let target = cursor.target_page(advancing, stay_on_current);
        let search = if self.search.is_empty() {
            None
        } else {
            Some(self.search.clone())
        };
        (
            PageRequest {
                search,
                page: target,
                limit: cursor.limit,
            },
            target,
        )
    }

    /// Record a successful response against the cursor that issued the
    /// request (the active mode may have changed while it was in flight).
    fn apply_success(&mut self, was_searching: bool, target: u32, page: &Page<T>)
    where
        T: Clone,
    {
        let cursor = if was_searching {
            &mut self.search_cursor
        } else {
            &mut self.browse
        };
        cursor.page = target;
        cursor.total_pages = page.total_pages;
        // Last-page heuristic: a short page terminates the sequence. A
        // final page of exactly `limit` items costs one extra empty fetch
        // before this fires.
        if (page.items.len() as u32) < cursor.limit {
            cursor.done = true;
        }
        self.last_total = page.total_pages;
        self.last_page = Some(page.clone());
    }
}

/// Controller over a paged, searchable collection.
///
/// `Clone` shares the controller; all clones observe the same cursors,
/// search state, and executor.
///
/// # Example
///
/// ```ignore
/// use fetch_kit::{PaginationController, PaginationConfig, RequestCache, Page, FetchOutcome};
/// use std::sync::Arc;
///
/// let fetcher = Arc::new(|req, _abort| {
///     Box::pin(async move {
///         let page = api::list_journals(req.page, req.limit, req.search).await?;
///         Ok(FetchOutcome::ok(page))
///     }) as futures::future::BoxFuture<'static, _>
/// });
/// let pager = PaginationController::new(RequestCache::new(), fetcher, PaginationConfig::default());
/// pager.send().await;          // load the first page
/// pager.next().await;          // advance
/// let rows = pager.data().await;
/// ```
pub struct PaginationController<T> {
    inner: Arc<Mutex<Pager<T>>>,
    executor: RequestExecutor<Page<T>>,
}

impl<T> Clone for PaginationController<T> {
    fn clone(&self) -> Self {
        PaginationController {
            inner: self.inner.clone(),
            executor: self.executor.clone(),
        }
    }
}

impl<T> PaginationController<T>
where
    T: Clone + Send + Sync + Serialize + DeserializeOwned + 'static,
{
    /// Create a controller over the given fetch callback.
    pub fn new(cache: RequestCache, fetcher: PageFetcher<T>, config: PaginationConfig) -> Self {
        let mut executor = RequestExecutor::new(cache);
        if let Some(options) = config.cache.clone() {
            executor = executor.with_cache_options(options);
        }

        let per_page = config.per_page;
        PaginationController {
            inner: Arc::new(Mutex::new(Pager {
                fetcher,
                sink: None,
                config,
                search: String::new(),
                searching: false,
                browse: PageCursor::new(per_page),
                search_cursor: PageCursor::new(per_page),
                last_page: None,
                last_total: 0,
                debounce: None,
                abort: None,
                epoch: 0,
            })),
            executor,
        }
    }

    /// Publish browse-mode results into an external sink.
    pub fn with_sink(self, sink: Arc<dyn ItemSink<T>>) -> Self {
        {
            let mut inner = self
                .inner
                .try_lock()
                .expect("with_sink must be called before the controller is shared");
            inner.sink = Some(sink);
        }
        self
    }

    // ------------------------------------------------------------------
    // Consumer surface
    // ------------------------------------------------------------------

    /// Last fetched page number of the active cursor (0 = nothing yet).
    pub async fn page(&self) -> u32 {
        self.inner.lock().await.active_cursor().page
    }

    /// Total page count reported by the last response (0 if none yet).
    pub async fn total_pages(&self) -> u32 {
        self.inner.lock().await.last_total
    }

    /// The externally observed collection.
    ///
    /// Browse-mode results live in the sink (when one was supplied) so
    /// they can be shared across consumers; search-mode results are
    /// transient to this controller.
    pub async fn data(&self) -> Vec<T> {
        let inner = self.inner.lock().await;
        if let (Some(sink), false) = (&inner.sink, inner.searching) {
            return sink.read_all();
        }
        inner
            .last_page
            .as_ref()
            .map(|p| p.items.clone())
            .unwrap_or_default()
    }

    /// Current search term.
    pub async fn search(&self) -> String {
        self.inner.lock().await.search.clone()
    }

    /// Current page size.
    pub async fn per_page(&self) -> u32 {
        self.inner.lock().await.active_cursor().limit
    }

    /// Failure message of the last fetch; empty on success.
    pub fn error(&self) -> String {
        self.executor.state().error
    }

    /// A fetch is in progress.
    pub fn pending(&self) -> bool {
        self.executor.state().pending
    }

    /// At least one fetch has been issued.
    pub fn dirty(&self) -> bool {
        self.executor.state().dirty
    }

    /// Advance the active cursor one page.
    pub async fn next(&self) {
        let searching = self.inner.lock().await.searching;
        if searching {
            self.fetch_search(true, false).await;
        } else {
            self.fetch(true, false).await;
        }
    }

    /// Step the active cursor one page back.
    ///
    /// No-op on the first page. The guard fires on `page <= 1`: pages
    /// count from 1 at this boundary even though the cursor's rest
    /// position is 0.
    pub async fn previous(&self) {
        let searching = {
            let mut inner = self.inner.lock().await;
            if inner.active_cursor().page <= 1 {
                return;
            }
            // Moving backward always un-terminates the sequence
            inner.active_cursor_mut().done = false;
            inner.searching
        };
        if searching {
            self.fetch_search(false, false).await;
        } else {
            self.fetch(false, false).await;
        }
    }

    /// Full manual reset: zero both cursors and reload from the start.
    ///
    /// Use after an external mutation invalidated every page.
    pub async fn send(&self) {
        {
            let mut inner = self.inner.lock().await;
            inner.browse.reset(None);
            inner.search_cursor.reset(None);
        }
        self.fetch(true, false).await;
    }

    /// Change the search term, switching modes as needed.
    ///
    /// A non-empty term resets the search cursor and triggers a debounced
    /// search fetch. An emptied term (with `auto` enabled) returns to
    /// browse mode and re-fetches the browse cursor's current page.
    pub async fn set_search(&self, term: impl Into<String>) {
        let term = term.into();
        let action = {
            let mut inner = self.inner.lock().await;
            if inner.search == term {
                return;
            }
            inner.search = term.clone();
            if !term.is_empty() {
                inner.search_cursor.reset(None);
                inner.searching = true;
                SearchAction::Search
            } else if inner.config.auto {
                inner.searching = false;
                inner.browse.done = false;
                SearchAction::Browse
            } else {
                SearchAction::None
            }
        };

        match action {
            SearchAction::Search => self.fetch_search(true, false).await,
            SearchAction::Browse => self.fetch(true, true).await,
            SearchAction::None => {}
        }
    }

    /// Change the page size: both cursors reset to the new limit and the
    /// active flow re-fetches its current (reset) position.
    pub async fn set_per_page(&self, per_page: u32) {
        let searching = {
            let mut inner = self.inner.lock().await;
            inner.browse.reset(Some(per_page));
            inner.search_cursor.reset(Some(per_page));
            !inner.search.is_empty()
        };
        if searching {
            self.fetch_search(true, true).await;
        } else {
            self.fetch(true, true).await;
        }
    }

    // ------------------------------------------------------------------
    // Fetch flows
    // ------------------------------------------------------------------

    /// Browse-mode fetch. No debounce, no cancellation.
    async fn fetch(&self, advancing: bool, stay_on_current: bool) {
        let (request, target, was_searching, fetcher, operation) = {
            let inner = self.inner.lock().await;
            if self.executor.state().pending {
                return;
            }
            if advancing && !stay_on_current && inner.active_cursor().done {
                return;
            }
            let (request, target) = inner.request_for(advancing, stay_on_current);
            (
                request,
                target,
                inner.searching,
                inner.fetcher.clone(),
                inner.config.operation.clone(),
            )
        };

        debug!("» Browse fetch page {} (limit {})", request.page, request.limit);
        let op = {
            let request = request.clone();
            FnOperation::new(
                operation,
                request.clone(),
                move |_executor_signal: AbortSignal| fetcher(request.clone(), AbortSignal::never()),
            )
        };
        let outcome = self
            .executor
            .send_with_config(
                op,
                |_: &FetchOutcome<Page<T>>| {},
                SendConfig::default().with_remove_prior_data(true),
            )
            .await;

        if !outcome.success {
            // Error is reflected in executor state; the cursor stays put
            return;
        }
        if let Some(page) = outcome.data {
            let mut inner = self.inner.lock().await;
            if let Some(sink) = &inner.sink {
                sink.replace_all(page.items.clone());
            }
            inner.apply_success(was_searching, target, &page);
        }
    }

    /// Search-mode fetch: debounced, abortable, sink cleared up front.
    async fn fetch_search(&self, advancing: bool, stay_on_current: bool) {
        let (epoch, signal, debounce) = {
            let mut inner = self.inner.lock().await;

            // A newer search supersedes any scheduled or in-flight one
            if let Some(timer) = inner.debounce.take() {
                timer.abort();
            }
            if let Some(abort) = inner.abort.take() {
                abort.abort();
            }

            // Optimistic clear: shared consumers see an emptied collection
            // until the debounced fetch lands
            if let Some(sink) = &inner.sink {
                sink.clear();
            }

            inner.epoch += 1;
            let (handle, signal) = AbortHandle::new();
            inner.abort = Some(handle);
            (inner.epoch, signal, inner.config.debounce)
        };

        let controller = self.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            controller
                .run_search(epoch, signal, advancing, stay_on_current)
                .await;
        });
        self.inner.lock().await.debounce = Some(timer);
    }

    async fn run_search(
        &self,
        epoch: u64,
        signal: AbortSignal,
        advancing: bool,
        stay_on_current: bool,
    ) {
        let (request, target, fetcher, operation) = {
            let inner = self.inner.lock().await;
            if inner.epoch != epoch {
                return;
            }
            // No pending guard here: a superseded search may still be
            // settling its abort, and must not block its successor. The
            // executor's request sequencing discards the older result.
            if advancing && !stay_on_current && inner.search_cursor.done {
                return;
            }
            let target = inner
                .search_cursor
                .target_page(advancing, stay_on_current);
            let search = if inner.search.is_empty() {
                None
            } else {
                Some(inner.search.clone())
            };
            (
                PageRequest {
                    search,
                    page: target,
                    limit: inner.search_cursor.limit,
                },
                target,
                inner.fetcher.clone(),
                inner.config.operation.clone(),
            )
        };

        debug!(
            "» Search fetch page {} (term: {:?})",
            request.page, request.search
        );
        let op = {
            let request = request.clone();
            let signal = signal.clone();
            FnOperation::new(
                operation,
                request.clone(),
                move |_executor_signal: AbortSignal| fetcher(request.clone(), signal.clone()),
            )
        };
        let outcome = self
            .executor
            .send_with_config(
                op,
                |_: &FetchOutcome<Page<T>>| {},
                SendConfig::default().with_remove_prior_data(true),
            )
            .await;

        if !outcome.success {
            return;
        }
        if let Some(page) = outcome.data {
            let mut inner = self.inner.lock().await;
            // Superseded while in flight: discard
            if inner.epoch != epoch {
                return;
            }
            inner.apply_success(true, target, &page);
        }
    }
}

enum SearchAction {
    Search,
    Browse,
    None,
}
