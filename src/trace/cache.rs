//! Bounded cache of materialized windows
//!
//! Eviction is by insertion order: once the cache is over its limit the
//! oldest inserted entry goes, however recently it was read. Lookups use
//! `peek`, so the LRU list only ever moves on insert.

use lru::LruCache;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

use super::window::TraceWindow;

/// Exact `(level, x0, x1)` request key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowKey {
    level: usize,
    x0: u64,
    x1: u64,
}

impl WindowKey {
    pub fn new(level: usize, x0: f64, x1: f64) -> Self {
        Self {
            level,
            x0: float_key(x0),
            x1: float_key(x1),
        }
    }
}

// 0.0 and -0.0 compare equal, so they share a key
fn float_key(value: f64) -> u64 {
    if value == 0.0 {
        0.0f64.to_bits()
    } else {
        value.to_bits()
    }
}

pub struct WindowCache {
    entries: LruCache<WindowKey, Arc<TraceWindow>>,
}

impl WindowCache {
    pub fn new(limit: usize) -> Self {
        let limit = NonZeroUsize::new(limit).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(limit),
        }
    }

    pub fn get(&self, key: &WindowKey) -> Option<Arc<TraceWindow>> {
        self.entries.peek(key).cloned()
    }

    pub fn contains(&self, key: &WindowKey) -> bool {
        self.entries.contains(key)
    }

    pub fn insert(&mut self, key: WindowKey, window: Arc<TraceWindow>) {
        if let Some((evicted, _)) = self.entries.push(key, window) {
            if evicted != key {
                tracing::trace!("Evicted cached window {:?}", evicted);
            }
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.entries.cap().get()
    }
}

impl fmt::Debug for WindowCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowCache")
            .field("len", &self.len())
            .field("limit", &self.limit())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_eviction() {
        let mut cache = WindowCache::new(3);
        for i in 0..4 {
            cache.insert(WindowKey::new(0, i as f64, 10.0), Arc::default());
        }
        assert_eq!(cache.len(), 3);
        assert!(!cache.contains(&WindowKey::new(0, 0.0, 10.0)));
        assert!(cache.contains(&WindowKey::new(0, 3.0, 10.0)));
    }

    #[test]
    fn test_reads_do_not_refresh() {
        let mut cache = WindowCache::new(2);
        let first = WindowKey::new(0, 0.0, 1.0);
        cache.insert(first, Arc::default());
        cache.insert(WindowKey::new(0, 1.0, 2.0), Arc::default());
        assert!(cache.get(&first).is_some());
        cache.insert(WindowKey::new(0, 2.0, 3.0), Arc::default());
        assert!(!cache.contains(&first));
    }

    #[test]
    fn test_zero_limit_keeps_one() {
        let mut cache = WindowCache::new(0);
        assert_eq!(cache.limit(), 1);
        cache.insert(WindowKey::new(0, 0.0, 1.0), Arc::default());
        cache.insert(WindowKey::new(0, 1.0, 2.0), Arc::default());
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&WindowKey::new(0, 1.0, 2.0)));
    }

    #[test]
    fn test_negative_zero_shares_key() {
        assert_eq!(WindowKey::new(1, -0.0, 5.0), WindowKey::new(1, 0.0, 5.0));
    }
}
