//! Request-scoped invalidation state.

use std::sync::atomic::{AtomicBool, Ordering};

use uuid::Uuid;

/// One logical unit of work, typically one inbound request to the backend.
///
/// Carries the purge debounce flag: every change event handled within the
/// same unit of work shares it, so a bulk edit touching many entities issues
/// at most one CDN purge. A fresh value starts with the flag cleared; values
/// are never shared between concurrent requests.
#[derive(Debug)]
pub struct UnitOfWork {
    id: Uuid,
    purge_issued: AtomicBool,
}

impl UnitOfWork {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            purge_issued: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Claim the single purge allowed in this unit of work.
    ///
    /// Returns true exactly once; every later call returns false.
    pub fn claim_purge(&self) -> bool {
        !self.purge_issued.swap(true, Ordering::AcqRel)
    }

    pub fn purge_issued(&self) -> bool {
        self.purge_issued.load(Ordering::Acquire)
    }
}

impl Default for UnitOfWork {
    fn default() -> Self {
        Self::new()
    }
}
