//! Ordered invalidation of one content change.

use tracing::{info, instrument};

use crate::domain::{ContentChangeEvent, TagSet};

use super::purge::{CdnPurgeCoordinator, PurgeOutcome};
use super::revalidate::{DispatchOutcome, RevalidationDispatcher};
use super::tags::TagDeriver;
use super::unit_of_work::UnitOfWork;

/// What happened to one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    pub tags: TagSet,
    pub revalidation: DispatchOutcome,
    pub purge: PurgeOutcome,
}

/// Tag derivation, frontend revalidation, then CDN purge.
///
/// The revalidation task is started before the purge is awaited, so the CDN
/// never drops content the frontend has not yet been told to refresh.
pub struct InvalidationPipeline {
    deriver: TagDeriver,
    dispatcher: RevalidationDispatcher,
    purge: CdnPurgeCoordinator,
}

impl InvalidationPipeline {
    pub fn new(
        deriver: TagDeriver,
        dispatcher: RevalidationDispatcher,
        purge: CdnPurgeCoordinator,
    ) -> Self {
        Self {
            deriver,
            dispatcher,
            purge,
        }
    }

    pub fn deriver(&self) -> &TagDeriver {
        &self.deriver
    }

    #[instrument(
        skip(self, uow, event),
        fields(
            unit_of_work = %uow.id(),
            entity_kind = event.entity_kind.as_str(),
            entity_id = event.entity_id,
        )
    )]
    pub async fn handle(&self, uow: &UnitOfWork, event: &ContentChangeEvent) -> PipelineReport {
        let tags = self.deriver.derive(event);
        let revalidation = self.dispatcher.dispatch(event, &tags);
        let purge = self.purge.purge(uow, event).await;

        info!(
            tags = ?tags.to_strings(),
            revalidation = ?revalidation,
            purge = ?purge,
            "Content change handled"
        );

        PipelineReport {
            tags,
            revalidation,
            purge,
        }
    }

    /// Handle every event within the same unit of work, in order.
    pub async fn handle_batch(
        &self,
        uow: &UnitOfWork,
        events: &[ContentChangeEvent],
    ) -> Vec<PipelineReport> {
        let mut reports = Vec::with_capacity(events.len());
        for event in events {
            reports.push(self.handle(uow, event).await);
        }
        reports
    }
}
