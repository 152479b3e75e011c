//! Content-change invalidation pipeline.
//!
//! A change event is turned into cache tags, the frontend is asked to
//! revalidate those tags, and the CDN is purged once per unit of work.
//!
//! ```text
//! ContentChangeEvent
//!        │
//!        ▼
//!   TagDeriver ──► RevalidationDispatcher ──► (detached webhook task)
//!        │
//!        ▼
//!   CdnPurgeCoordinator ──► CDN purge ──► ResponseCache::flush
//! ```

mod guard;
mod pipeline;
mod purge;
mod revalidate;
mod tags;
mod unit_of_work;

pub use guard::{
    DEFAULT_ALLOWED_KINDS, DEFAULT_PUBLIC_STATUSES, GuardPredicate, PublishGuard, SkipReason,
};
pub use pipeline::{InvalidationPipeline, PipelineReport};
pub use purge::{CdnIntegration, CdnPurgeCoordinator, PurgeError, PurgeOutcome};
pub use revalidate::{
    DELIVERY_TIMEOUT, DispatchOutcome, RevalidationConfig, RevalidationDispatcher,
    RevalidationTransport, TransportError,
};
pub use tags::{TagDeriver, TagExtension};
pub use unit_of_work::UnitOfWork;
