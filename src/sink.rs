//! Sink port for publishing fetched collections outside a controller.
//!
//! Browse-mode pagination results are pushed into an [`ItemSink`] so that
//! several consumers can observe one shared collection (a normalized
//! store pattern). The contract is full replacement: the controller calls
//! `replace_all` with the complete new list on every successful browse
//! fetch, never an incremental append.

/// Port for an externally shared collection.
pub trait ItemSink<T>: Send + Sync {
    /// Replace the sink's contents wholesale.
    fn replace_all(&self, items: Vec<T>);

    /// Read the sink's current contents.
    fn read_all(&self) -> Vec<T>;

    /// Empty the sink.
    ///
    /// Used by the search flow to optimistically clear shared results
    /// before a debounced fetch lands.
    fn clear(&self) {
        self.replace_all(Vec::new());
    }
}

// ============================================================================
// Generic Sink Implementation
// ============================================================================

use std::sync::{Arc, RwLock};

/// Shared-vector sink, suitable for application stores and tests.
///
/// `Clone` shares the underlying collection.
#[derive(Clone)]
pub struct SharedVecSink<T> {
    items: Arc<RwLock<Vec<T>>>,
}

impl<T> SharedVecSink<T> {
    pub fn new() -> Self {
        SharedVecSink {
            items: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Number of items currently held.
    pub fn len(&self) -> usize {
        self.items.read().map(|v| v.len()).unwrap_or(0)
    }

    /// True if the sink holds no items.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for SharedVecSink<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + Sync> ItemSink<T> for SharedVecSink<T> {
    fn replace_all(&self, items: Vec<T>) {
        if let Ok(mut guard) = self.items.write() {
            *guard = items;
        }
    }

    fn read_all(&self) -> Vec<T> {
        self.items.read().map(|v| v.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_vec_sink_replace_and_read() {
        let sink = SharedVecSink::new();

        sink.replace_all(vec![1, 2, 3]);
        assert_eq!(sink.read_all(), vec![1, 2, 3]);

        sink.replace_all(vec![4]);
        assert_eq!(sink.read_all(), vec![4]);
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_sink_clear() {
        let sink = SharedVecSink::new();
        sink.replace_all(vec!["a".to_string()]);

        sink.clear();
        assert!(sink.is_empty());
    }

    #[test]
    fn test_sink_clone_shares_items() {
        let sink1 = SharedVecSink::new();
        let sink2 = sink1.clone();

        sink1.replace_all(vec![7u32]);
        assert_eq!(sink2.read_all(), vec![7]);
    }
}
