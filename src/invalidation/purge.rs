//! Debounced CDN purge.
//!
//! A purge is a full-domain CDN invalidation followed by a flush of the
//! response cache group. At most one purge runs per [`UnitOfWork`].

use std::sync::Arc;

use async_trait::async_trait;
use metrics::counter;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cache::ResponseCache;
use crate::domain::ContentChangeEvent;
use crate::events::{EventLog, FlushScope, PipelineEventKind};

use super::guard::{PublishGuard, SkipReason};
use super::unit_of_work::UnitOfWork;

const METRIC_PURGE: &str = "headwind_cdn_purge_total";
const METRIC_PURGE_DEBOUNCED: &str = "headwind_cdn_purge_debounced_total";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PurgeError {
    #[error("CDN purge request failed: {0}")]
    Request(String),
    #[error("CDN rejected purge with status {0}")]
    Rejected(u16),
}

/// External CDN integration able to invalidate a whole domain.
#[async_trait]
pub trait CdnIntegration: Send + Sync {
    /// Whether purging is switched on for this integration.
    fn purge_enabled(&self) -> bool;

    async fn purge_everything(&self) -> Result<(), PurgeError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurgeOutcome {
    Purged { cdn_ok: bool, flush: FlushScope },
    Skipped(SkipReason),
}

impl PurgeOutcome {
    pub fn is_purged(&self) -> bool {
        matches!(self, Self::Purged { .. })
    }
}

pub struct CdnPurgeCoordinator {
    cdn: Option<Arc<dyn CdnIntegration>>,
    guard: Arc<PublishGuard>,
    response_cache: Arc<ResponseCache>,
    events: Arc<EventLog>,
}

impl CdnPurgeCoordinator {
    /// The coordinator is inert for its whole lifetime when `cdn` is absent
    /// or reports purging disabled at construction.
    pub fn new(
        cdn: Option<Arc<dyn CdnIntegration>>,
        guard: Arc<PublishGuard>,
        response_cache: Arc<ResponseCache>,
        events: Arc<EventLog>,
    ) -> Self {
        let cdn = cdn.filter(|cdn| cdn.purge_enabled());
        if cdn.is_none() {
            info!("CDN purge coordinator inert: no integration or purging disabled");
        }
        Self {
            cdn,
            guard,
            response_cache,
            events,
        }
    }

    pub fn is_inert(&self) -> bool {
        self.cdn.is_none()
    }

    pub async fn purge(&self, uow: &UnitOfWork, event: &ContentChangeEvent) -> PurgeOutcome {
        let Some(cdn) = self.cdn.as_ref() else {
            return PurgeOutcome::Skipped(SkipReason::Inert);
        };

        if let Err(reason) = self.guard.check(event) {
            debug!(
                unit_of_work = %uow.id(),
                entity_id = event.entity_id,
                reason = %reason,
                "CDN purge skipped by publish guard"
            );
            return PurgeOutcome::Skipped(reason);
        }

        if !uow.claim_purge() {
            debug!(unit_of_work = %uow.id(), "CDN purge already issued in this unit of work");
            counter!(METRIC_PURGE_DEBOUNCED).increment(1);
            return PurgeOutcome::Skipped(SkipReason::Debounced);
        }

        let cdn_ok = match cdn.purge_everything().await {
            Ok(()) => true,
            Err(err) => {
                warn!(unit_of_work = %uow.id(), error = %err, "CDN purge failed");
                false
            }
        };
        counter!(METRIC_PURGE, "outcome" => if cdn_ok { "ok" } else { "failed" }).increment(1);
        let flush = self.response_cache.flush();

        info!(
            unit_of_work = %uow.id(),
            cdn_ok,
            flush = %flush,
            "CDN purge completed"
        );
        self.events.publish(PipelineEventKind::CdnPurgeCompleted);

        PurgeOutcome::Purged { cdn_ok, flush }
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;
    use crate::cache::{MemoryObjectCache, ObjectCacheBackend, ResponseCacheConfig};

    struct FakeCdn {
        enabled: AtomicBool,
        calls: AtomicUsize,
        fail: bool,
    }

    impl FakeCdn {
        fn new(enabled: bool) -> Arc<Self> {
            Arc::new(Self {
                enabled: AtomicBool::new(enabled),
                calls: AtomicUsize::new(0),
                fail: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                enabled: AtomicBool::new(true),
                calls: AtomicUsize::new(0),
                fail: true,
            })
        }
    }

    #[async_trait]
    impl CdnIntegration for FakeCdn {
        fn purge_enabled(&self) -> bool {
            self.enabled.load(Ordering::SeqCst)
        }

        async fn purge_everything(&self) -> Result<(), PurgeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(PurgeError::Rejected(503))
            } else {
                Ok(())
            }
        }
    }

    struct Fixture {
        coordinator: CdnPurgeCoordinator,
        backend: Arc<MemoryObjectCache>,
        events: Arc<EventLog>,
    }

    fn fixture(cdn: Option<Arc<FakeCdn>>) -> Fixture {
        let events = Arc::new(EventLog::new());
        let backend = Arc::new(MemoryObjectCache::new(
            NonZeroUsize::new(16).expect("non-zero"),
        ));
        let response_cache = Arc::new(ResponseCache::new(
            ResponseCacheConfig::default(),
            backend.clone(),
            events.clone(),
        ));
        let coordinator = CdnPurgeCoordinator::new(
            cdn.map(|cdn| cdn as Arc<dyn CdnIntegration>),
            Arc::new(PublishGuard::default()),
            response_cache,
            events.clone(),
        );
        Fixture {
            coordinator,
            backend,
            events,
        }
    }

    fn published(id: i64) -> ContentChangeEvent {
        ContentChangeEvent::post("post", id, "publish")
    }

    #[tokio::test]
    async fn one_purge_per_unit_of_work() {
        let cdn = FakeCdn::new(true);
        let fx = fixture(Some(cdn.clone()));
        let uow = UnitOfWork::new();

        let mut outcomes = Vec::new();
        for id in 1..=5 {
            outcomes.push(fx.coordinator.purge(&uow, &published(id)).await);
        }

        assert_eq!(cdn.calls.load(Ordering::SeqCst), 1);
        assert!(outcomes[0].is_purged());
        assert!(
            outcomes[1..]
                .iter()
                .all(|outcome| *outcome == PurgeOutcome::Skipped(SkipReason::Debounced))
        );
    }

    #[tokio::test]
    async fn new_unit_of_work_purges_again() {
        let cdn = FakeCdn::new(true);
        let fx = fixture(Some(cdn.clone()));

        fx.coordinator.purge(&UnitOfWork::new(), &published(1)).await;
        fx.coordinator.purge(&UnitOfWork::new(), &published(1)).await;

        assert_eq!(cdn.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn absent_integration_is_inert() {
        let fx = fixture(None);
        let uow = UnitOfWork::new();

        assert!(fx.coordinator.is_inert());
        assert_eq!(
            fx.coordinator.purge(&uow, &published(1)).await,
            PurgeOutcome::Skipped(SkipReason::Inert)
        );
        assert!(!uow.purge_issued());
    }

    #[tokio::test]
    async fn disabled_at_startup_stays_inert() {
        let cdn = FakeCdn::new(false);
        let fx = fixture(Some(cdn.clone()));

        cdn.enabled.store(true, Ordering::SeqCst);
        let outcome = fx.coordinator.purge(&UnitOfWork::new(), &published(1)).await;

        assert_eq!(outcome, PurgeOutcome::Skipped(SkipReason::Inert));
        assert_eq!(cdn.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn guarded_events_do_not_consume_the_debounce_flag() {
        let cdn = FakeCdn::new(true);
        let fx = fixture(Some(cdn.clone()));
        let uow = UnitOfWork::new();

        let draft = ContentChangeEvent::post("post", 1, "draft");
        assert!(!fx.coordinator.purge(&uow, &draft).await.is_purged());
        assert!(!uow.purge_issued());

        assert!(fx.coordinator.purge(&uow, &published(1)).await.is_purged());
        assert_eq!(cdn.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn purge_flushes_the_response_cache() {
        let fx = fixture(Some(FakeCdn::new(true)));
        fx.backend.set(
            "key",
            json!({"data": 1}),
            crate::cache::DEFAULT_CACHE_GROUP,
            std::time::Duration::from_secs(60),
        );
        assert_eq!(fx.backend.len(), 1);

        let outcome = fx.coordinator.purge(&UnitOfWork::new(), &published(1)).await;

        assert_eq!(
            outcome,
            PurgeOutcome::Purged {
                cdn_ok: true,
                flush: FlushScope::Group
            }
        );
        assert!(fx.backend.is_empty());
        let kinds: Vec<_> = fx.events.snapshot().into_iter().map(|e| e.kind).collect();
        assert_eq!(kinds.last(), Some(&PipelineEventKind::CdnPurgeCompleted));
    }

    #[tokio::test]
    async fn cdn_failure_still_flushes_and_completes() {
        let fx = fixture(Some(FakeCdn::failing()));

        let outcome = fx.coordinator.purge(&UnitOfWork::new(), &published(1)).await;

        assert_eq!(
            outcome,
            PurgeOutcome::Purged {
                cdn_ok: false,
                flush: FlushScope::Group
            }
        );
        assert!(
            fx.events
                .snapshot()
                .iter()
                .any(|e| e.kind == PipelineEventKind::CdnPurgeCompleted)
        );
    }
}
