//! Domain types: content-change events and the cache tags derived from them.

pub mod tags;

pub use headwind_api_types::{
    CdnPurgeRequest, ChangeAction, ContentChangeEvent, EntityKind, RevalidationRequest,
    TaxonomyTerm,
};
pub use tags::{CacheTag, TagSet};
