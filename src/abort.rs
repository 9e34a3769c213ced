//! Cooperative cancellation for superseded requests.
//!
//! The pagination controller aborts an in-flight search when a newer one
//! arrives. Cancellation is advisory: the signal is handed to the
//! operation callback, which forwards it to whatever transport-level
//! primitive it has. An operation that ignores the signal simply runs to
//! completion and has its result discarded.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Owning side of a cancellation pair.
pub struct AbortHandle {
    inner: Arc<AbortInner>,
}

/// Observing side, cloned into operations.
#[derive(Clone)]
pub struct AbortSignal {
    inner: Arc<AbortInner>,
}

struct AbortInner {
    aborted: AtomicBool,
    notify: Notify,
}

impl AbortHandle {
    /// Create a connected handle/signal pair.
    pub fn new() -> (AbortHandle, AbortSignal) {
        let inner = Arc::new(AbortInner {
            aborted: AtomicBool::new(false),
            notify: Notify::new(),
        });
        (
            AbortHandle {
                inner: inner.clone(),
            },
            AbortSignal { inner },
        )
    }

    /// Trigger the signal. Idempotent.
    pub fn abort(&self) {
        self.inner.aborted.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }
}

impl AbortSignal {
    /// True once the paired handle has fired.
    pub fn is_aborted(&self) -> bool {
        self.inner.aborted.load(Ordering::SeqCst)
    }

    /// Resolve when the paired handle fires (immediately if it already has).
    pub async fn aborted(&self) {
        let notified = self.inner.notify.notified();
        tokio::pin!(notified);
        // Register before re-checking the flag, or an abort() landing in
        // between would never wake this waiter
        notified.as_mut().enable();
        if self.is_aborted() {
            return;
        }
        notified.await;
    }

    /// A signal that never fires, for operations without cancellation
    /// (browse-mode fetches, plain executor sends).
    pub fn never() -> AbortSignal {
        AbortSignal {
            inner: Arc::new(AbortInner {
                aborted: AtomicBool::new(false),
                notify: Notify::new(),
            }),
        }
    }
}
