//! Read-through response cache for query results.

use std::sync::Arc;

use metrics::counter;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::events::{EventLog, FlushScope, PipelineEventKind};

use super::config::ResponseCacheConfig;
use super::keys::response_key;
use super::store::{FlushError, ObjectCacheBackend};

const METRIC_HIT: &str = "headwind_response_cache_hit_total";
const METRIC_MISS: &str = "headwind_response_cache_miss_total";
const METRIC_BYPASS: &str = "headwind_response_cache_bypass_total";
const METRIC_UNSTORABLE: &str = "headwind_response_cache_unstorable_total";

/// Query-response cache over an [`ObjectCacheBackend`].
///
/// Mutations are never read from or written to the cache. Everything else is
/// keyed by query text plus canonicalized variables and stored for the
/// configured TTL, provided the value survives a JSON round trip unchanged.
pub struct ResponseCache {
    config: ResponseCacheConfig,
    backend: Arc<dyn ObjectCacheBackend>,
    events: Arc<EventLog>,
}

impl ResponseCache {
    pub fn new(
        config: ResponseCacheConfig,
        backend: Arc<dyn ObjectCacheBackend>,
        events: Arc<EventLog>,
    ) -> Self {
        Self {
            config,
            backend,
            events,
        }
    }

    /// True when the trimmed query text starts with the mutation keyword.
    pub fn is_mutation(&self, query: &str) -> bool {
        query.trim_start().starts_with(self.config.mutation_keyword())
    }

    /// Return the cached response for `(query, variables)` or compute, store
    /// and return it.
    pub fn lookup_or_populate<T, F>(&self, query: &str, variables: &Value, compute: F) -> T
    where
        T: Serialize + DeserializeOwned + PartialEq,
        F: FnOnce() -> T,
    {
        if !self.config.enabled || self.is_mutation(query) {
            counter!(METRIC_BYPASS).increment(1);
            return compute();
        }

        let key = response_key(query, variables);
        let group = self.config.group();

        if let Some(stored) = self.backend.get(&key, group) {
            match serde_json::from_value::<T>(stored) {
                Ok(value) => {
                    debug!(cache = "response", outcome = "hit", key = %key);
                    counter!(METRIC_HIT).increment(1);
                    return value;
                }
                Err(err) => {
                    debug!(
                        cache = "response",
                        key = %key,
                        error = %err,
                        "stored response does not decode, recomputing"
                    );
                }
            }
        }

        debug!(cache = "response", outcome = "miss", key = %key);
        counter!(METRIC_MISS).increment(1);

        let value = compute();
        match json_round_trip(&value) {
            Some(encoded) => self.backend.set(&key, encoded, group, self.config.ttl()),
            None => {
                debug!(
                    cache = "response",
                    key = %key,
                    "response does not survive a JSON round trip, not caching"
                );
                counter!(METRIC_UNSTORABLE).increment(1);
            }
        }
        value
    }

    /// Flush this cache's group, falling back to a full-store flush when the
    /// backend cannot flush a single group.
    #[instrument(skip(self), fields(group = %self.config.group()))]
    pub fn flush(&self) -> FlushScope {
        let group = self.config.group();
        let scope = match self.backend.flush_group(group) {
            Ok(()) => FlushScope::Group,
            Err(FlushError::Unsupported) => {
                warn!("backend cannot flush a single group, flushing the whole store");
                self.backend.flush_all();
                FlushScope::FullStore
            }
        };

        info!(scope = %scope, "Response cache flushed");
        self.events.publish(PipelineEventKind::ResponseCacheFlushed {
            group: group.to_string(),
            scope,
        });
        scope
    }

    pub fn config(&self) -> &ResponseCacheConfig {
        &self.config
    }
}

/// Encode `value` as JSON, returning the encoding only if decoding it yields
/// an equal value.
fn json_round_trip<T>(value: &T) -> Option<Value>
where
    T: Serialize + DeserializeOwned + PartialEq,
{
    let encoded = serde_json::to_value(value).ok()?;
    let decoded: T = serde_json::from_value(encoded.clone()).ok()?;
    (decoded == *value).then_some(encoded)
}
