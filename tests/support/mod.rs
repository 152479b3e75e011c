#![allow(dead_code)]

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use headwind::application::preview::PreviewTokenService;
use headwind::cache::{MemoryObjectCache, ResponseCache, ResponseCacheConfig};
use headwind::domain::RevalidationRequest;
use headwind::events::EventLog;
use headwind::infra::http::{HookState, PreviewState, RouterState};
use headwind::invalidation::{
    CdnIntegration, CdnPurgeCoordinator, InvalidationPipeline, PublishGuard, PurgeError,
    RevalidationConfig, RevalidationDispatcher, RevalidationTransport, TagDeriver,
    TransportError,
};
use headwind::util::clock::FixedClock;

pub const REVALIDATE_URL: &str = "https://frontend.test/api/revalidate";
pub const REVALIDATE_SECRET: &str = "s3cret";
pub const PREVIEW_SECRET: &str = "preview-signing-key";
pub const NOW: i64 = 1_700_000_000;

#[derive(Default)]
pub struct RecordingTransport {
    pub calls: AtomicUsize,
    pub requests: Mutex<Vec<(String, RevalidationRequest)>>,
}

impl RecordingTransport {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<(String, RevalidationRequest)> {
        self.requests.lock().expect("requests lock").clone()
    }
}

#[async_trait]
impl RevalidationTransport for RecordingTransport {
    async fn send(
        &self,
        endpoint: &str,
        request: &RevalidationRequest,
    ) -> Result<u16, TransportError> {
        self.requests
            .lock()
            .expect("requests lock")
            .push((endpoint.to_string(), request.clone()));
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(200)
    }
}

/// Records purge calls and whether a revalidation delivery had already
/// started when each purge ran.
pub struct RecordingCdn {
    pub calls: AtomicUsize,
    pub revalidation_seen_first: AtomicBool,
    transport: Arc<RecordingTransport>,
}

#[async_trait]
impl CdnIntegration for RecordingCdn {
    fn purge_enabled(&self) -> bool {
        true
    }

    async fn purge_everything(&self) -> Result<(), PurgeError> {
        // Give detached delivery tasks a chance to run on the test runtime.
        for _ in 0..16 {
            if self.transport.calls() > 0 {
                break;
            }
            tokio::task::yield_now().await;
        }
        self.revalidation_seen_first
            .store(self.transport.calls() > 0, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct Harness {
    pub pipeline: Arc<InvalidationPipeline>,
    pub transport: Arc<RecordingTransport>,
    pub cdn: Arc<RecordingCdn>,
    pub events: Arc<EventLog>,
    pub backend: Arc<MemoryObjectCache>,
    pub response_cache: Arc<ResponseCache>,
}

impl Harness {
    pub fn new(revalidation: RevalidationConfig) -> Self {
        let events = Arc::new(EventLog::new());
        let backend = Arc::new(MemoryObjectCache::new(
            NonZeroUsize::new(64).expect("non-zero capacity"),
        ));
        let response_cache = Arc::new(ResponseCache::new(
            ResponseCacheConfig::default(),
            backend.clone(),
            events.clone(),
        ));
        let guard = Arc::new(PublishGuard::default());
        let transport = Arc::new(RecordingTransport::default());
        let cdn = Arc::new(RecordingCdn {
            calls: AtomicUsize::new(0),
            revalidation_seen_first: AtomicBool::new(false),
            transport: transport.clone(),
        });

        let dispatcher = RevalidationDispatcher::new(
            revalidation,
            guard.clone(),
            transport.clone(),
            events.clone(),
        );
        let purge = CdnPurgeCoordinator::new(
            Some(cdn.clone() as Arc<dyn CdnIntegration>),
            guard,
            response_cache.clone(),
            events.clone(),
        );
        let pipeline = Arc::new(InvalidationPipeline::new(
            TagDeriver::new(),
            dispatcher,
            purge,
        ));

        Self {
            pipeline,
            transport,
            cdn,
            events,
            backend,
            response_cache,
        }
    }

    pub fn configured() -> Self {
        Self::new(RevalidationConfig::new(REVALIDATE_URL, REVALIDATE_SECRET))
    }

    pub fn purge_calls(&self) -> usize {
        self.cdn.calls.load(Ordering::SeqCst)
    }

    pub fn router_state(&self, hook_secret: Option<&str>, preview: Option<Arc<PreviewTokenService>>) -> RouterState {
        RouterState {
            hooks: HookState {
                pipeline: self.pipeline.clone(),
                secret: hook_secret.map(Arc::from),
            },
            preview: PreviewState { tokens: preview },
        }
    }
}

pub fn preview_service(clock: Arc<FixedClock>) -> Arc<PreviewTokenService> {
    Arc::new(PreviewTokenService::new(PREVIEW_SECRET, 300, clock).expect("preview service"))
}

/// Poll until `condition` holds, yielding to spawned tasks in between.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
