mod support;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use headwind::infra::http::{HOOK_SECRET_HEADER, build_router};
use headwind::util::clock::FixedClock;
use headwind_api_types::{
    ContentHookResponse, PreviewErrorCode, PreviewVerifyResponse,
};
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;
use serde_json::json;
use tower::ServiceExt;

use support::{Harness, NOW, preview_service, wait_until};

const HOOK_SECRET: &str = "cms-hook-secret";

async fn read_json<T: DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("response body should collect")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("response body should be JSON")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

fn post_json(uri: &str, body: serde_json::Value, hook_secret: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(secret) = hook_secret {
        builder = builder.header(HOOK_SECRET_HEADER, secret);
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("request")
}

#[tokio::test]
async fn health_returns_no_content() {
    let harness = Harness::configured();
    let app = build_router(harness.router_state(None, None));

    let response = app.oneshot(get("/health")).await.expect("router");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn preview_verify_over_query_string() {
    let clock = Arc::new(FixedClock::new(NOW));
    let tokens = preview_service(clock.clone());
    let harness = Harness::configured();
    let app = build_router(harness.router_state(None, Some(tokens.clone())));

    let response = app
        .clone()
        .oneshot(get("/preview/verify"))
        .await
        .expect("router");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: PreviewVerifyResponse = read_json(response).await;
    assert_eq!(body, PreviewVerifyResponse::rejected(PreviewErrorCode::MissingToken));

    let response = app
        .clone()
        .oneshot(get("/preview/verify?token=not.a.token"))
        .await
        .expect("router");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: PreviewVerifyResponse = read_json(response).await;
    assert_eq!(body, PreviewVerifyResponse::rejected(PreviewErrorCode::InvalidToken));

    let token = tokens.issue(42, 7, 300);
    let response = app
        .clone()
        .oneshot(get(&format!("/preview/verify?token={token}")))
        .await
        .expect("router");
    assert_eq!(response.status(), StatusCode::OK);
    let body: PreviewVerifyResponse = read_json(response).await;
    assert_eq!(body, PreviewVerifyResponse::valid(42));

    clock.advance(301);
    let response = app
        .oneshot(get(&format!("/preview/verify?token={token}")))
        .await
        .expect("router");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn preview_verify_over_json_body() {
    let tokens = preview_service(Arc::new(FixedClock::new(NOW)));
    let harness = Harness::configured();
    let app = build_router(harness.router_state(None, Some(tokens.clone())));

    let token = tokens.issue(5, 1, 60);
    let response = app
        .clone()
        .oneshot(post_json("/preview/verify", json!({ "token": token }), None))
        .await
        .expect("router");
    assert_eq!(response.status(), StatusCode::OK);
    let body: PreviewVerifyResponse = read_json(response).await;
    assert_eq!(body.entity_id, Some(5));

    let response = app
        .clone()
        .oneshot(post_json("/preview/verify", json!({ "token": "  " }), None))
        .await
        .expect("router");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let malformed = Request::builder()
        .method(Method::POST)
        .uri("/preview/verify")
        .body(Body::from("{not json"))
        .expect("request");
    let response = app.oneshot(malformed).await.expect("router");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn preview_without_secret_rejects_every_token() {
    let issuer = preview_service(Arc::new(FixedClock::new(NOW)));
    let harness = Harness::configured();
    let app = build_router(harness.router_state(None, None));

    let token = issuer.issue(1, 1, 60);
    let response = app
        .oneshot(get(&format!("/preview/verify?token={token}")))
        .await
        .expect("router");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn content_hook_requires_matching_secret() {
    let harness = Harness::configured();
    let app = build_router(harness.router_state(Some(HOOK_SECRET), None));
    let event = json!({
        "entityKind": "post",
        "entityId": 1,
        "contentKind": "post",
        "status": "publish"
    });

    let response = app
        .clone()
        .oneshot(post_json("/hooks/content", event.clone(), None))
        .await
        .expect("router");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(post_json("/hooks/content", event.clone(), Some("wrong")))
        .await
        .expect("router");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(harness.purge_calls(), 0);

    let response = app
        .oneshot(post_json("/hooks/content", event, Some(HOOK_SECRET)))
        .await
        .expect("router");
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body: ContentHookResponse = read_json(response).await;
    assert_eq!(body.accepted, 1);
    assert_eq!(body.tags, vec!["post", "post-1"]);
}

#[tokio::test]
async fn content_hook_batch_is_one_unit_of_work() {
    let harness = Harness::configured();
    let app = build_router(harness.router_state(None, None));
    let events: Vec<_> = (1..=5)
        .map(|id| {
            json!({
                "entityKind": "post",
                "entityId": id,
                "contentKind": "post",
                "status": "publish",
                "taxonomyTerms": [{"taxonomy": "category", "slug": "news"}]
            })
        })
        .collect();

    let response = app
        .oneshot(post_json("/hooks/content", json!({ "events": events }), None))
        .await
        .expect("router");

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body: ContentHookResponse = read_json(response).await;
    assert_eq!(body.accepted, 5);
    assert!(body.tags.contains(&"category-news".to_string()));
    assert!(body.tags.contains(&"post-5".to_string()));
    assert_eq!(harness.purge_calls(), 1);
    wait_until(|| harness.transport.calls() == 5).await;
}

#[tokio::test]
async fn content_hook_rejects_malformed_payload() {
    let harness = Harness::configured();
    let app = build_router(harness.router_state(None, None));

    let response = app
        .oneshot(post_json("/hooks/content", json!([1, 2, 3]), None))
        .await
        .expect("router");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(harness.purge_calls(), 0);
}
