//! LRU cache for computed center-family index windows.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use goods_common::BoundingBox;

use crate::types::{CacheStats, HorizontalWindow};

/// Cache key for windows: (source_hash, bbox_key, crosses_dateline, stride).
pub type WindowKey = (u64, String, bool, usize);

/// LRU cache of center windows keyed by grid source and request geometry.
///
/// A capacity of zero disables caching; every lookup is then a miss.
pub struct WindowCache {
    cache: Option<LruCache<WindowKey, HorizontalWindow>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl WindowCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: NonZeroUsize::new(capacity).map(LruCache::new),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Build a key for `source_id` and a request.
    pub fn key(
        source_id: &str,
        bbox: &BoundingBox,
        crosses_dateline: bool,
        stride: usize,
    ) -> WindowKey {
        (hash_path(source_id), bbox.cache_key(), crosses_dateline, stride)
    }

    pub fn get(&mut self, key: &WindowKey) -> Option<HorizontalWindow> {
        match self.cache.as_mut().and_then(|c| c.get(key).copied()) {
            Some(window) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(window)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn insert(&mut self, key: WindowKey, window: HorizontalWindow) {
        if let Some(cache) = self.cache.as_mut() {
            if let Some((old_key, _)) = cache.push(key, window) {
                // `push` also returns the old value when replacing the same key
                if cache.peek(&old_key).is_none() {
                    self.evictions.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    pub fn len(&self) -> usize {
        self.cache.as_ref().map_or(0, |c| c.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Hash a source path or URL for use in cache keys.
pub fn hash_path(path: &str) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    path.hash(&mut hasher);
    hasher.finish()
}
