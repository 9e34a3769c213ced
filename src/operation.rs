//! The request operation trait — the abstract "request function".
//!
//! The executor never talks to a transport directly; it runs a
//! [`RequestOperation`] and consumes the [`FetchOutcome`] it resolves
//! with. The operation also carries the two ingredients of automatic
//! cache-key derivation: a stable `name` and serializable `params`.
//!
//! Implement the trait for your service wrappers, or use [`FnOperation`]
//! to lift a closure:
//!
//! ```
//! use fetch_kit::operation::FnOperation;
//! use fetch_kit::outcome::FetchOutcome;
//! use fetch_kit::AbortSignal;
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! struct Params { page: u32 }
//!
//! let op = FnOperation::new("list_journals", Params { page: 0 }, |_abort: AbortSignal| async {
//!     Ok::<_, fetch_kit::Error>(FetchOutcome::ok(vec!["entry".to_string()]))
//! });
//! # let _ = op;
//! ```

use crate::abort::AbortSignal;
use crate::error::Result;
use crate::outcome::FetchOutcome;
use serde::Serialize;
use std::future::Future;

/// Trait for request operations.
///
/// Abstracts the asynchronous call (HTTP request, storage read, anything
/// awaitable), decoupling the executor from the transport. `name` and
/// `params` identify the operation for key derivation: two operations with
/// equal names and structurally equal params are considered the same
/// request and share a cache slot.
///
/// The abort signal is advisory — forward it to your transport's
/// cancellation primitive if it has one, or ignore it and let the result
/// be discarded.
#[allow(async_fn_in_trait)]
pub trait RequestOperation<T>: Send {
    /// Parameter type, serialized into the derived cache key.
    type Params: Serialize + Send + Sync;

    /// Stable operation identity (e.g. `"list_journals"`).
    fn name(&self) -> &str;

    /// The parameters of this invocation.
    fn params(&self) -> &Self::Params;

    /// Execute the operation.
    ///
    /// # Errors
    ///
    /// Returns `Err` for transport-level rejections; resolve with
    /// `FetchOutcome { success: false, .. }` for in-band failures. Either
    /// way the executor folds the failure into its `error` state rather
    /// than propagating it. Return `Err(Error::Aborted)` when honoring the
    /// abort signal; that outcome is swallowed silently.
    async fn run(&mut self, abort: &AbortSignal) -> Result<FetchOutcome<T>>;
}

/// Closure-backed [`RequestOperation`].
///
/// The usual way to hand an ad-hoc request to an executor without defining
/// a dedicated type.
pub struct FnOperation<P, F> {
    name: String,
    params: P,
    run_fn: F,
}

impl<P, F> FnOperation<P, F> {
    /// Create an operation from a name, params, and an async closure.
    pub fn new(name: impl Into<String>, params: P, run_fn: F) -> Self {
        FnOperation {
            name: name.into(),
            params,
            run_fn,
        }
    }
}

impl<T, P, F, Fut> RequestOperation<T> for FnOperation<P, F>
where
    P: Serialize + Send + Sync,
    F: FnMut(AbortSignal) -> Fut + Send,
    Fut: Future<Output = Result<FetchOutcome<T>>> + Send,
{
    type Params = P;

    fn name(&self) -> &str {
        &self.name
    }

    fn params(&self) -> &Self::Params {
        &self.params
    }

    async fn run(&mut self, abort: &AbortSignal) -> Result<FetchOutcome<T>> {
        (self.run_fn)(abort.clone()).await
    }
}
