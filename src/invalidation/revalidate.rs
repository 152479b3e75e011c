//! Frontend revalidation webhook dispatch.
//!
//! Dispatch is fire-and-forget: the webhook is sent from a detached task
//! bounded by [`DELIVERY_TIMEOUT`], the caller never waits for it, and a
//! failed delivery is only reported through a completion event.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use metrics::histogram;
use thiserror::Error;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::domain::{ContentChangeEvent, RevalidationRequest, TagSet};
use crate::events::{DeliveryOutcome, EventLog, PipelineEventKind};

use super::guard::{PublishGuard, SkipReason};

/// Upper bound on one webhook delivery, connection included.
pub const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

const METRIC_DELIVERY_MS: &str = "headwind_revalidation_delivery_ms";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("revalidation request failed: {0}")]
    Request(String),
    #[error("revalidation request timed out after {0:?}")]
    Timeout(Duration),
}

/// Sends a revalidation body to the frontend and returns the HTTP status.
#[async_trait]
pub trait RevalidationTransport: Send + Sync {
    async fn send(
        &self,
        endpoint: &str,
        request: &RevalidationRequest,
    ) -> Result<u16, TransportError>;
}

/// Webhook endpoint and shared secret. Either being empty disables dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevalidationConfig {
    pub endpoint: String,
    pub secret: String,
}

impl RevalidationConfig {
    pub fn new(endpoint: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            secret: secret.into(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.endpoint.trim().is_empty() && !self.secret.trim().is_empty()
    }
}

impl From<&crate::config::RevalidationSettings> for RevalidationConfig {
    fn from(settings: &crate::config::RevalidationSettings) -> Self {
        Self {
            endpoint: settings
                .endpoint
                .as_ref()
                .map(|url| url.to_string())
                .unwrap_or_default(),
            secret: settings.secret.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Delivery task started; its result arrives as a completion event.
    Spawned,
    Skipped(SkipReason),
}

impl DispatchOutcome {
    pub fn is_spawned(&self) -> bool {
        matches!(self, Self::Spawned)
    }
}

pub struct RevalidationDispatcher {
    config: RevalidationConfig,
    guard: Arc<PublishGuard>,
    transport: Arc<dyn RevalidationTransport>,
    events: Arc<EventLog>,
}

impl RevalidationDispatcher {
    pub fn new(
        config: RevalidationConfig,
        guard: Arc<PublishGuard>,
        transport: Arc<dyn RevalidationTransport>,
        events: Arc<EventLog>,
    ) -> Self {
        Self {
            config,
            guard,
            transport,
            events,
        }
    }

    pub fn config(&self) -> &RevalidationConfig {
        &self.config
    }

    /// Start delivery of `tags` for `event` and return immediately.
    pub fn dispatch(&self, event: &ContentChangeEvent, tags: &TagSet) -> DispatchOutcome {
        if !self.config.is_configured() {
            debug!(
                entity_kind = event.entity_kind.as_str(),
                entity_id = event.entity_id,
                "Revalidation skipped: endpoint or secret not configured"
            );
            return DispatchOutcome::Skipped(SkipReason::NotConfigured);
        }

        if let Err(reason) = self.guard.check(event) {
            debug!(
                entity_kind = event.entity_kind.as_str(),
                entity_id = event.entity_id,
                reason = %reason,
                "Revalidation skipped by publish guard"
            );
            return DispatchOutcome::Skipped(reason);
        }

        let endpoint = self.config.endpoint.clone();
        let request = RevalidationRequest {
            tags: tags.to_strings(),
            secret: self.config.secret.clone(),
        };
        let transport = self.transport.clone();
        let events = self.events.clone();

        spawn_detached(async move {
            let outcome = deliver(transport.as_ref(), &endpoint, &request).await;
            if !outcome.is_delivered() {
                warn!(
                    endpoint = %endpoint,
                    tags = ?request.tags,
                    outcome = ?outcome,
                    "Revalidation webhook not delivered"
                );
            }
            events.publish(PipelineEventKind::RevalidationCompleted {
                tags: request.tags,
                endpoint,
                outcome,
            });
        });

        DispatchOutcome::Spawned
    }
}

async fn deliver(
    transport: &dyn RevalidationTransport,
    endpoint: &str,
    request: &RevalidationRequest,
) -> DeliveryOutcome {
    let started = Instant::now();
    let result = match tokio::time::timeout(DELIVERY_TIMEOUT, transport.send(endpoint, request)).await
    {
        Ok(result) => result,
        Err(_) => Err(TransportError::Timeout(DELIVERY_TIMEOUT)),
    };
    histogram!(METRIC_DELIVERY_MS).record(started.elapsed().as_secs_f64() * 1000.0);

    match result {
        Ok(status) => DeliveryOutcome::Delivered { status },
        Err(err) => DeliveryOutcome::Failed {
            reason: err.to_string(),
        },
    }
}

/// Run `task` on the current runtime, or on a dedicated thread when called
/// outside one.
fn spawn_detached<F>(task: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(handle) = Handle::try_current() {
        handle.spawn(task);
        return;
    }

    let spawned = std::thread::Builder::new()
        .name("headwind-revalidate".to_string())
        .spawn(move || {
            match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime.block_on(task),
                Err(err) => warn!(error = %err, "Failed to start revalidation runtime"),
            }
        });

    if let Err(err) = spawned {
        warn!(error = %err, "Failed to spawn revalidation thread");
    }
}
