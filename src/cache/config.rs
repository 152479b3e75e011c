//! Response cache configuration.
//!
//! Populated from the `[response_cache]` section of `headwind.toml`.

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::Deserialize;

pub const DEFAULT_TTL_SECONDS: u64 = 600;
pub const DEFAULT_MUTATION_KEYWORD: &str = "mutation";
pub const DEFAULT_CACHE_GROUP: &str = "headwind_query_responses";
const DEFAULT_CAPACITY: usize = 1000;

/// Response cache configuration.
///
/// TTL and mutation keyword fall back to their defaults independently when
/// they are zero or blank.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResponseCacheConfig {
    /// Enable read-through caching of query responses.
    pub enabled: bool,
    /// Lifetime of a stored response, in seconds.
    pub ttl_seconds: u64,
    /// Leading keyword that marks a query as a mutation.
    pub mutation_keyword: String,
    /// Cache group (namespace) the responses live under.
    pub group: String,
    /// Maximum responses kept per group by the in-memory backend.
    pub capacity: usize,
}

impl Default for ResponseCacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: DEFAULT_TTL_SECONDS,
            mutation_keyword: DEFAULT_MUTATION_KEYWORD.to_string(),
            group: DEFAULT_CACHE_GROUP.to_string(),
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl From<&crate::config::ResponseCacheSettings> for ResponseCacheConfig {
    fn from(settings: &crate::config::ResponseCacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            ttl_seconds: settings.ttl_seconds,
            mutation_keyword: settings.mutation_keyword.clone(),
            group: settings.group.clone(),
            capacity: settings.capacity,
        }
    }
}

impl ResponseCacheConfig {
    pub fn ttl(&self) -> Duration {
        match self.ttl_seconds {
            0 => Duration::from_secs(DEFAULT_TTL_SECONDS),
            secs => Duration::from_secs(secs),
        }
    }

    pub fn mutation_keyword(&self) -> &str {
        match self.mutation_keyword.trim() {
            "" => DEFAULT_MUTATION_KEYWORD,
            keyword => keyword,
        }
    }

    pub fn group(&self) -> &str {
        match self.group.trim() {
            "" => DEFAULT_CACHE_GROUP,
            group => group,
        }
    }

    /// Returns the capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.capacity).unwrap_or(NonZeroUsize::MIN)
    }
}
