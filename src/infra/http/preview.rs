//! Preview token verification for the frontend.

use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::debug;

use headwind_api_types::{PreviewErrorCode, PreviewVerifyRequest, PreviewVerifyResponse};

use super::state::PreviewState;

pub async fn verify_query(
    State(state): State<PreviewState>,
    Query(request): Query<PreviewVerifyRequest>,
) -> Response {
    verify(&state, request.token.as_deref())
}

/// Malformed bodies are treated as carrying no token.
pub async fn verify_body(State(state): State<PreviewState>, body: Bytes) -> Response {
    let request: PreviewVerifyRequest = serde_json::from_slice(&body).unwrap_or_default();
    verify(&state, request.token.as_deref())
}

fn verify(state: &PreviewState, token: Option<&str>) -> Response {
    let Some(token) = token.map(str::trim).filter(|token| !token.is_empty()) else {
        return rejected(StatusCode::BAD_REQUEST, PreviewErrorCode::MissingToken);
    };

    let Some(tokens) = state.tokens.as_ref() else {
        debug!("Preview token presented but no preview secret is configured");
        return rejected(StatusCode::UNAUTHORIZED, PreviewErrorCode::InvalidToken);
    };

    match tokens.verify(token) {
        Ok(claims) => {
            (StatusCode::OK, Json(PreviewVerifyResponse::valid(claims.entity_id))).into_response()
        }
        Err(_) => rejected(StatusCode::UNAUTHORIZED, PreviewErrorCode::InvalidToken),
    }
}

fn rejected(status: StatusCode, code: PreviewErrorCode) -> Response {
    (status, Json(PreviewVerifyResponse::rejected(code))).into_response()
}
