//! Object-cache backends.
//!
//! The response cache talks to an external key/value store through
//! [`ObjectCacheBackend`]. [`MemoryObjectCache`] is the in-process
//! implementation: one LRU per cache group, with per-entry expiry.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use lru::LruCache;
use metrics::counter;
use serde_json::Value;
use thiserror::Error;

use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

const METRIC_OBJECT_CACHE_EVICT: &str = "headwind_object_cache_evict_total";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FlushError {
    #[error("backend does not support flushing a single cache group")]
    Unsupported,
}

/// Key/value store with group namespacing.
///
/// All calls are synchronous and complete within the invoking request.
pub trait ObjectCacheBackend: Send + Sync {
    fn get(&self, key: &str, group: &str) -> Option<Value>;

    fn set(&self, key: &str, value: Value, group: &str, ttl: Duration);

    /// Remove every entry in `group`, leaving other groups untouched.
    fn flush_group(&self, group: &str) -> Result<(), FlushError>;

    /// Remove every entry in every group.
    fn flush_all(&self);
}

struct StoredEntry {
    value: Value,
    /// `None` when the TTL reaches past what `Instant` can represent.
    expires_at: Option<Instant>,
}

impl StoredEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

/// In-memory object cache.
pub struct MemoryObjectCache {
    groups: RwLock<HashMap<String, LruCache<String, StoredEntry>>>,
    capacity: NonZeroUsize,
    group_flush: bool,
}

impl MemoryObjectCache {
    /// Create a store holding at most `capacity` entries per group.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            groups: RwLock::new(HashMap::new()),
            capacity,
            group_flush: true,
        }
    }

    /// Create a store that rejects group flushes, like backends without
    /// namespace support.
    pub fn without_group_flush(capacity: NonZeroUsize) -> Self {
        Self {
            group_flush: false,
            ..Self::new(capacity)
        }
    }

    /// Number of live and not-yet-collected entries in `group`.
    pub fn group_len(&self, group: &str) -> usize {
        rw_read(&self.groups, SOURCE, "group_len")
            .get(group)
            .map_or(0, LruCache::len)
    }

    pub fn len(&self) -> usize {
        rw_read(&self.groups, SOURCE, "len")
            .values()
            .map(LruCache::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ObjectCacheBackend for MemoryObjectCache {
    fn get(&self, key: &str, group: &str) -> Option<Value> {
        let mut groups = rw_write(&self.groups, SOURCE, "get");
        let entries = groups.get_mut(group)?;

        let expired = entries.peek(key)?.is_expired(Instant::now());
        if expired {
            entries.pop(key);
            return None;
        }

        entries.get(key).map(|entry| entry.value.clone())
    }

    fn set(&self, key: &str, value: Value, group: &str, ttl: Duration) {
        let expires_at = Instant::now().checked_add(ttl);
        let mut groups = rw_write(&self.groups, SOURCE, "set");
        let entries = groups
            .entry(group.to_string())
            .or_insert_with(|| LruCache::new(self.capacity));

        if let Some((evicted, _)) = entries.push(key.to_string(), StoredEntry { value, expires_at })
            && evicted != key
        {
            counter!(METRIC_OBJECT_CACHE_EVICT).increment(1);
        }
    }

    fn flush_group(&self, group: &str) -> Result<(), FlushError> {
        if !self.group_flush {
            return Err(FlushError::Unsupported);
        }
        rw_write(&self.groups, SOURCE, "flush_group").remove(group);
        Ok(())
    }

    fn flush_all(&self) {
        rw_write(&self.groups, SOURCE, "flush_all").clear();
    }
}
