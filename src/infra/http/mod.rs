mod hooks;
mod middleware;
mod preview;
mod state;

pub use hooks::HOOK_SECRET_HEADER;
pub use middleware::RequestContext;
pub use state::{HookState, PreviewState, RouterState};

use axum::{
    Router,
    http::StatusCode,
    middleware as axum_middleware,
    routing::{get, post},
};

use middleware::{log_responses, set_request_context};

pub fn build_router(state: RouterState) -> Router {
    let hook_routes = Router::new()
        .route("/hooks/content", post(hooks::content_hook))
        .route_layer(axum_middleware::from_fn_with_state(
            state.hooks.clone(),
            hooks::hook_auth,
        ));

    Router::new()
        .route("/health", get(health))
        .route(
            "/preview/verify",
            get(preview::verify_query).post(preview::verify_body),
        )
        .merge(hook_routes)
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}

async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}
