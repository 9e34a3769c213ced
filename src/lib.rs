//! # fetch-kit
//!
//! A type-safe, fully generic client-side request cache and pagination
//! framework for Rust.
//!
//! ## Features
//!
//! - **Fully Generic:** Cache any `Serialize + Deserialize` payload type
//! - **Stale-While-Revalidate:** Serve aged entries instantly while refetching
//!   in the background of the same call
//! - **Request De-duplication:** Identical operation + params derive the same
//!   cache key automatically
//! - **Dual-Cursor Pagination:** Independent browse and search cursors with
//!   debounced, abortable search
//! - **Transport Independent:** Consumes an abstract async operation; zero
//!   dependencies on HTTP clients or web frameworks
//! - **Production Ready:** Built-in logging, metrics hooks, and versioned
//!   cache envelopes
//!
//! ## Quick Start
//!
//! ```ignore
//! use fetch_kit::{
//!     RequestCache, RequestExecutor, CacheOptions, FnOperation, FetchOutcome,
//! };
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! struct ListParams { page: u32 }
//!
//! // 1. One shared cache per application
//! let cache = RequestCache::new();
//!
//! // 2. One executor per logical request slot
//! let journals = RequestExecutor::new(cache.clone())
//!     .with_cache_options(CacheOptions::default());
//!
//! // 3. Send: fresh entries short-circuit, stale ones revalidate
//! let op = FnOperation::new("list_journals", ListParams { page: 1 }, |_abort| async {
//!     Ok(FetchOutcome::ok(api::list_journals(1).await?))
//! });
//! let outcome = journals.send(op).await;
//!
//! // 4. Render from observable state
//! let state = journals.state();
//! assert!(state.success || !state.error.is_empty());
//! ```
//!
//! For paged collections, wrap a fetch callback in a
//! [`PaginationController`]: it owns a browse cursor and a search cursor,
//! routes `next()`/`previous()` to whichever is active, and debounces and
//! aborts superseded search requests.

#[macro_use]
extern crate log;

pub mod abort;
pub mod cache;
pub mod error;
pub mod executor;
pub mod key;
pub mod metrics;
pub mod operation;
pub mod outcome;
pub mod pagination;
pub mod serialization;
pub mod sink;

// Re-exports for convenience
pub use abort::{AbortHandle, AbortSignal};
pub use cache::{CacheEntry, CacheStats, RequestCache};
pub use error::{Error, Result};
pub use executor::{CacheOptions, RequestExecutor, RequestState, SendConfig};
pub use key::CacheKeyBuilder;
pub use metrics::{CacheMetrics, NoOpMetrics};
pub use operation::{FnOperation, RequestOperation};
pub use outcome::FetchOutcome;
pub use pagination::{
    Page, PageCursor, PageFetcher, PageRequest, PaginationConfig, PaginationController,
};
pub use sink::{ItemSink, SharedVecSink};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
