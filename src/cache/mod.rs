//! Query response cache.
//!
//! Wraps an object-cache backend with key derivation, TTLs and mutation
//! exclusion. Responses live under one cache group so they can be flushed
//! without touching anything else in the store.
//!
//! The cache is a library entry point for the host's query layer: the host
//! wraps its read path in [`ResponseCache::lookup_or_populate`]. The
//! `headwind` binary serves no queries itself; it only shares the cache
//! with the purge coordinator so a CDN purge flushes what the host stored.
//!
//! ```
//! use std::num::NonZeroUsize;
//! use std::sync::Arc;
//!
//! use headwind::cache::{MemoryObjectCache, ResponseCache, ResponseCacheConfig};
//! use headwind::events::EventLog;
//! use serde_json::{Value, json};
//!
//! let backend = Arc::new(MemoryObjectCache::new(NonZeroUsize::MIN));
//! let cache = ResponseCache::new(ResponseCacheConfig::default(), backend, Arc::new(EventLog::new()));
//!
//! let posts: Value = cache.lookup_or_populate("{ posts }", &Value::Null, || json!([1, 2]));
//! let cached: Value = cache.lookup_or_populate("{ posts }", &Value::Null, || json!([]));
//! assert_eq!(posts, cached);
//! ```
//!
//! ## Configuration
//!
//! ```toml
//! [response_cache]
//! enabled = true
//! ttl_seconds = 600
//! mutation_keyword = "mutation"
//! group = "headwind_query_responses"
//! ```

mod config;
mod keys;
pub(crate) mod lock;
mod response;
mod store;

pub use config::{DEFAULT_CACHE_GROUP, DEFAULT_MUTATION_KEYWORD, DEFAULT_TTL_SECONDS, ResponseCacheConfig};
pub use keys::{canonical_json, response_key};
pub use response::ResponseCache;
pub use store::{FlushError, MemoryObjectCache, ObjectCacheBackend};
