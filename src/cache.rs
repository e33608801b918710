//! Mtime-validated metadata cache.
//!
//! Freshness oracle is modification-time equality: one stat call instead
//! of a content read. A write that lands within the same filesystem clock
//! tick is indistinguishable from no change — accepted; content hashing
//! would cost more than it saves at corpus scale.
//!
//! Bounded: at capacity the oldest 10% of entries (by insertion time) are
//! evicted before a new insert. One mutex guards the whole
//! check-and-evict sequence, so concurrent category scans cannot break
//! the size invariant.

use std::collections::HashMap;
use std::time::{Duration, Instant, SystemTime};

use parking_lot::Mutex;

use crate::config::CacheConfig;
use crate::metadata::DocMetadata;
use crate::store::VaultStore;
use crate::types::Category;

/// Running hit/miss counters, for diagnostics only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

struct CacheEntry {
    modified: SystemTime,
    metadata: DocMetadata,
    inserted_at: Instant,
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<(Category, String), CacheEntry>,
    hits: u64,
    misses: u64,
}

/// Per-document cache of derived metadata, keyed by (category, id).
pub struct MetadataCache {
    inner: Mutex<CacheInner>,
    max_entries: usize,
    ttl: Duration,
}

impl MetadataCache {
    pub fn new(config: &CacheConfig) -> Self {
        MetadataCache {
            inner: Mutex::new(CacheInner::default()),
            max_entries: config.max_entries.max(1),
            ttl: Duration::from_secs(config.ttl_secs),
        }
    }

    /// Return cached metadata only while the document is unchanged on disk
    /// and the entry is within its TTL; otherwise drop the entry and miss.
    pub fn get(&self, store: &VaultStore, category: Category, id: &str) -> Option<DocMetadata> {
        let key = (category, id.to_string());
        let current_modified = store.modified_time(category, id).ok();

        let mut inner = self.inner.lock();
        let fresh = match (inner.entries.get(&key), current_modified) {
            (Some(entry), Some(modified)) => {
                entry.modified == modified && entry.inserted_at.elapsed() < self.ttl
            }
            _ => false,
        };

        if fresh {
            inner.hits += 1;
            return inner.entries.get(&key).map(|e| e.metadata.clone());
        }

        inner.entries.remove(&key);
        inner.misses += 1;
        None
    }

    /// Insert metadata for a document, reading its mtime fresh from the
    /// store. A document that cannot be stat'ed is not cached.
    pub fn put(&self, store: &VaultStore, category: Category, id: &str, metadata: DocMetadata) {
        let modified = match store.modified_time(category, id) {
            Ok(t) => t,
            Err(e) => {
                log::debug!("not caching {}/{}: {}", category, id, e);
                return;
            }
        };

        let mut inner = self.inner.lock();
        let key = (category, id.to_string());
        if inner.entries.len() >= self.max_entries && !inner.entries.contains_key(&key) {
            self.evict_oldest(&mut inner);
        }
        inner.entries.insert(
            key,
            CacheEntry {
                modified,
                metadata,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Drop the oldest 10% of entries by insertion time (at least one).
    fn evict_oldest(&self, inner: &mut CacheInner) {
        let evict_count = (self.max_entries / 10).max(1);
        let mut by_age: Vec<((Category, String), Instant)> = inner
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.inserted_at))
            .collect();
        by_age.sort_by_key(|(_, inserted_at)| *inserted_at);

        for (key, _) in by_age.into_iter().take(evict_count) {
            inner.entries.remove(&key);
        }
        log::debug!("cache evicted {} oldest entries", evict_count);
    }

    /// Drop all entries and reset the hit/miss counters.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.hits = 0;
        inner.misses = 0;
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
        }
    }
}
