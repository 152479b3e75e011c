//! Pipeline observability events.
//!
//! Completion signals emitted by the revalidation dispatcher, the CDN purge
//! coordinator and the response cache. Events are logged when published and
//! kept in a bounded in-memory log for inspection; nothing is persisted.

use std::collections::VecDeque;
use std::fmt::{Display, Formatter};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use metrics::{counter, gauge};
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::cache::lock::mutex_lock;

const SOURCE: &str = "events";
const DEFAULT_LOG_LIMIT: usize = 256;

const METRIC_EVENT_LOG_LEN: &str = "headwind_event_log_len";
const METRIC_EVENT_DROPPED: &str = "headwind_event_dropped_total";

/// Monotonic sequence number for ordering events within this process.
pub type Epoch = u64;

#[derive(Debug, Clone)]
pub struct PipelineEvent {
    pub id: Uuid,
    pub epoch: Epoch,
    pub kind: PipelineEventKind,
    pub timestamp: OffsetDateTime,
}

impl PipelineEvent {
    pub fn new(kind: PipelineEventKind, epoch: Epoch) -> Self {
        Self {
            id: Uuid::new_v4(),
            epoch,
            kind,
            timestamp: OffsetDateTime::now_utc(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEventKind {
    /// The frontend revalidation webhook finished, successfully or not.
    RevalidationCompleted {
        tags: Vec<String>,
        endpoint: String,
        outcome: DeliveryOutcome,
    },
    /// CDN purge and response-cache flush both finished.
    CdnPurgeCompleted,
    /// The response cache was flushed.
    ResponseCacheFlushed { group: String, scope: FlushScope },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered { status: u16 },
    Failed { reason: String },
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { status } if (200..300).contains(status))
    }
}

/// What a response-cache flush actually cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushScope {
    /// Only the response cache's own group.
    Group,
    /// The backend could not flush a single group, so everything was flushed.
    FullStore,
}

impl FlushScope {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Group => "group",
            Self::FullStore => "full_store",
        }
    }
}

impl Display for FlushScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bounded log of recent pipeline events.
///
/// When full, the oldest event is dropped to make room.
pub struct EventLog {
    queue: Mutex<VecDeque<PipelineEvent>>,
    epoch_counter: AtomicU64,
    limit: usize,
}

impl EventLog {
    pub fn new() -> Self {
        Self::new_with_limit(DEFAULT_LOG_LIMIT)
    }

    pub fn new_with_limit(limit: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            epoch_counter: AtomicU64::new(0),
            limit: limit.max(1),
        }
    }

    pub fn next_epoch(&self) -> Epoch {
        self.epoch_counter.fetch_add(1, Ordering::SeqCst)
    }

    /// Record an event. The event is logged for observability.
    pub fn publish(&self, kind: PipelineEventKind) {
        let event = PipelineEvent::new(kind, self.next_epoch());

        info!(
            event_id = %event.id,
            event_epoch = event.epoch,
            event_kind = ?event.kind,
            "Pipeline event published"
        );

        let mut queue = mutex_lock(&self.queue, SOURCE, "publish");
        while queue.len() >= self.limit {
            queue.pop_front();
            counter!(METRIC_EVENT_DROPPED).increment(1);
        }
        queue.push_back(event);
        gauge!(METRIC_EVENT_LOG_LEN).set(queue.len() as f64);
    }

    /// Remove and return up to `limit` events in FIFO order.
    pub fn drain(&self, limit: usize) -> Vec<PipelineEvent> {
        let mut queue = mutex_lock(&self.queue, SOURCE, "drain");
        let count = limit.min(queue.len());
        let drained = queue.drain(..count).collect();
        gauge!(METRIC_EVENT_LOG_LEN).set(queue.len() as f64);
        drained
    }

    /// Copy of the current events, oldest first.
    pub fn snapshot(&self) -> Vec<PipelineEvent> {
        mutex_lock(&self.queue, SOURCE, "snapshot")
            .iter()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.queue, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        mutex_lock(&self.queue, SOURCE, "clear").clear();
        gauge!(METRIC_EVENT_LOG_LEN).set(0.0);
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}
