use std::sync::Arc;

use axum::extract::FromRef;

use crate::application::preview::PreviewTokenService;
use crate::invalidation::InvalidationPipeline;

#[derive(Clone)]
pub struct HookState {
    pub pipeline: Arc<InvalidationPipeline>,
    /// Expected `x-headwind-hook-secret` value; `None` disables the check.
    pub secret: Option<Arc<str>>,
}

#[derive(Clone)]
pub struct PreviewState {
    /// Absent when no preview secret is configured; every token is then
    /// reported invalid.
    pub tokens: Option<Arc<PreviewTokenService>>,
}

#[derive(Clone)]
pub struct RouterState {
    pub hooks: HookState,
    pub preview: PreviewState,
}

impl FromRef<RouterState> for HookState {
    fn from_ref(state: &RouterState) -> Self {
        state.hooks.clone()
    }
}

impl FromRef<RouterState> for PreviewState {
    fn from_ref(state: &RouterState) -> Self {
        state.preview.clone()
    }
}
