//! Inbound content-change notifications from the host CMS.

use axum::{
    Json,
    body::Body,
    extract::{State, rejection::JsonRejection},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;
use tracing::info;

use crate::application::error::HttpError;
use crate::domain::TagSet;
use crate::invalidation::UnitOfWork;
use headwind_api_types::{ContentHookRequest, ContentHookResponse};

use super::state::HookState;

pub const HOOK_SECRET_HEADER: &str = "x-headwind-hook-secret";

const SOURCE: &str = "infra::http::hooks";

/// Reject requests whose hook secret header does not match the configured
/// secret. Passes everything through when no secret is configured.
pub async fn hook_auth(State(state): State<HookState>, request: Request<Body>, next: Next) -> Response {
    let Some(expected) = state.secret.as_deref() else {
        return next.run(request).await;
    };

    let presented = request
        .headers()
        .get(HOOK_SECRET_HEADER)
        .map(|value| value.as_bytes())
        .unwrap_or_default();

    if presented.ct_eq(expected.as_bytes()).unwrap_u8() == 0 {
        return HttpError::new(
            SOURCE,
            StatusCode::UNAUTHORIZED,
            "Unauthorized",
            "missing or mismatched hook secret",
        )
        .into_response();
    }

    next.run(request).await
}

/// Run every event in the body through the invalidation pipeline as one
/// unit of work.
pub async fn content_hook(
    State(state): State<HookState>,
    payload: Result<Json<ContentHookRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ContentHookResponse>), HttpError> {
    let Json(payload) = payload.map_err(|rejection| {
        HttpError::new(
            SOURCE,
            StatusCode::BAD_REQUEST,
            "Invalid content-change payload",
            rejection.body_text(),
        )
    })?;

    let events = payload.into_events();
    let uow = UnitOfWork::new();
    let reports = state.pipeline.handle_batch(&uow, &events).await;

    let mut tags = TagSet::new();
    for report in reports {
        tags.merge(report.tags);
    }

    info!(
        unit_of_work = %uow.id(),
        accepted = events.len(),
        purge_issued = uow.purge_issued(),
        "Content hook processed"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(ContentHookResponse {
            accepted: events.len(),
            tags: tags.to_strings(),
        }),
    ))
}
