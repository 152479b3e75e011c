//! Publish guard shared by the revalidation dispatcher and the purge
//! coordinator.
//!
//! Post-kind upserts only invalidate anything when they describe publicly
//! visible content: not an autosave, not a revision, in a public status and
//! of an allowed content kind. Term and menu events, and deletions, pass
//! unconditionally.

use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use crate::domain::ContentChangeEvent;

pub const DEFAULT_ALLOWED_KINDS: [&str; 2] = ["post", "page"];
pub const DEFAULT_PUBLIC_STATUSES: [&str; 1] = ["publish"];

/// Extra caller-supplied check; returning false skips the event.
pub type GuardPredicate = Arc<dyn Fn(&ContentChangeEvent) -> bool + Send + Sync>;

/// Why an invalidation step did nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Endpoint or secret is not configured.
    NotConfigured,
    /// CDN integration is absent or has purging disabled.
    Inert,
    /// A purge already ran in this unit of work.
    Debounced,
    Autosave,
    Revision,
    NotPublic { status: String },
    KindNotAllowed { kind: String },
    /// A caller-supplied predicate rejected the event.
    Rejected,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotConfigured => "not_configured",
            Self::Inert => "inert",
            Self::Debounced => "debounced",
            Self::Autosave => "autosave",
            Self::Revision => "revision",
            Self::NotPublic { .. } => "not_public",
            Self::KindNotAllowed { .. } => "kind_not_allowed",
            Self::Rejected => "rejected",
        }
    }
}

impl Display for SkipReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone)]
pub struct PublishGuard {
    allowed_kinds: BTreeSet<String>,
    public_statuses: BTreeSet<String>,
    predicates: Vec<GuardPredicate>,
}

impl PublishGuard {
    /// Build a guard from explicit lists. Empty lists fall back to the
    /// defaults.
    pub fn new<K, S>(allowed_kinds: K, public_statuses: S) -> Self
    where
        K: IntoIterator,
        K::Item: Into<String>,
        S: IntoIterator,
        S::Item: Into<String>,
    {
        let mut allowed_kinds = normalized(allowed_kinds);
        if allowed_kinds.is_empty() {
            allowed_kinds = normalized(DEFAULT_ALLOWED_KINDS);
        }
        let mut public_statuses = normalized(public_statuses);
        if public_statuses.is_empty() {
            public_statuses = normalized(DEFAULT_PUBLIC_STATUSES);
        }
        Self {
            allowed_kinds,
            public_statuses,
            predicates: Vec::new(),
        }
    }

    /// Allow an additional content kind, e.g. a custom post type.
    pub fn allow_kind(mut self, kind: impl Into<String>) -> Self {
        let kind = kind.into();
        if !kind.trim().is_empty() {
            self.allowed_kinds.insert(kind.trim().to_string());
        }
        self
    }

    pub fn with_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&ContentChangeEvent) -> bool + Send + Sync + 'static,
    {
        self.predicates.push(Arc::new(predicate));
        self
    }

    pub fn allowed_kinds(&self) -> impl Iterator<Item = &str> {
        self.allowed_kinds.iter().map(String::as_str)
    }

    pub fn check(&self, event: &ContentChangeEvent) -> Result<(), SkipReason> {
        if !event.is_post() || event.is_deletion() {
            return Ok(());
        }
        if event.is_autosave {
            return Err(SkipReason::Autosave);
        }
        if event.is_revision {
            return Err(SkipReason::Revision);
        }
        if !self.public_statuses.contains(event.status.trim()) {
            return Err(SkipReason::NotPublic {
                status: event.status.clone(),
            });
        }
        if !self.allowed_kinds.contains(event.content_kind.trim()) {
            return Err(SkipReason::KindNotAllowed {
                kind: event.content_kind.clone(),
            });
        }
        if !self.predicates.iter().all(|predicate| predicate(event)) {
            return Err(SkipReason::Rejected);
        }
        Ok(())
    }
}

impl Default for PublishGuard {
    fn default() -> Self {
        Self::new(DEFAULT_ALLOWED_KINDS, DEFAULT_PUBLIC_STATUSES)
    }
}

fn normalized<I>(values: I) -> BTreeSet<String>
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    values
        .into_iter()
        .map(Into::into)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect()
}
