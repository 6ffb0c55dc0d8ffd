//! Summary cache keyed by `(fingerprint, mode)`.
//!
//! Keyed on the content hash of the document bytes rather than the filename,
//! so renaming a file — or uploading the same paper twice under different
//! names — reuses the cached result and issues zero completion calls.
//!
//! Entries are published as `Arc<Summary>` behind one mutex: a reader either
//! sees a fully-built summary or nothing, never a partial write. Concurrent
//! writers for the same key are last-write-wins. Capacity-bounded caches
//! evict the oldest inserted entry (insertion order, not LRU — re-reads do
//! not refresh an entry's position).

use crate::config::SummaryMode;
use crate::output::Summary;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tracing::debug;

type Key = (String, SummaryMode);

struct CacheInner {
    entries: HashMap<Key, Arc<Summary>>,
    /// Insertion order for oldest-entry eviction.
    order: VecDeque<Key>,
    capacity: Option<usize>,
}

/// Concurrent `(fingerprint, mode)` → [`Summary`] map with optional
/// oldest-entry eviction.
pub struct SummaryCache {
    inner: Mutex<CacheInner>,
}

impl SummaryCache {
    /// Unbounded cache.
    pub fn new() -> Self {
        Self::with_capacity(None)
    }

    /// Cache holding at most `capacity` entries (None = unbounded).
    pub fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                order: VecDeque::new(),
                capacity,
            }),
        }
    }

    /// Look up a previously computed summary.
    pub fn get(&self, fingerprint: &str, mode: SummaryMode) -> Option<Arc<Summary>> {
        let inner = self.inner.lock().expect("cache mutex poisoned");
        inner
            .entries
            .get(&(fingerprint.to_string(), mode))
            .cloned()
    }

    /// Store a summary, evicting the oldest entry when at capacity.
    pub fn put(&self, fingerprint: impl Into<String>, mode: SummaryMode, summary: Arc<Summary>) {
        let key = (fingerprint.into(), mode);
        let mut inner = self.inner.lock().expect("cache mutex poisoned");

        if inner.entries.insert(key.clone(), summary).is_none() {
            inner.order.push_back(key);
            if let Some(cap) = inner.capacity {
                while inner.order.len() > cap {
                    if let Some(oldest) = inner.order.pop_front() {
                        debug!(fingerprint = %oldest.0, mode = %oldest.1, "evicting oldest cache entry");
                        inner.entries.remove(&oldest);
                    }
                }
            }
        }
        // Re-insertion of an existing key overwrites in place (last-write-wins)
        // without touching the eviction order.
    }

    /// Number of cached summaries.
    pub fn len(&self) -> usize {
        self.inner.lock().expect("cache mutex poisoned").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SummaryCache {
    fn default() -> Self {
        Self::new()
    }
}
