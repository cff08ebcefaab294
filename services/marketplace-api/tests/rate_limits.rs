mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{editor_token, read_json, router, router_from, test_state, token_with_role};
use http_helpers::{authed_json_request, get, json_request};
use marketplace_api::auth::roles::CONTENT_EDITOR_ROLE;
use marketplace_throttle::ManualClock;
use serde_json::json;
use std::time::Duration;
use tower::ServiceExt;

fn header<'a>(response: &'a axum::response::Response, name: &str) -> Option<&'a str> {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
}

#[tokio::test]
async fn sixth_content_write_in_a_minute_is_rejected() {
    let clock = ManualClock::default();
    let state = test_state(&clock);
    let app = router(state);

    for n in 1..=5u32 {
        let response = app
            .clone()
            .oneshot(json_request("POST", "/api/cms-pages", json!({})))
            .await
            .expect("write");
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "request {n}");
        assert_eq!(header(&response, "x-ratelimit-limit"), Some("5"));
        let remaining = (5 - n).to_string();
        assert_eq!(header(&response, "x-ratelimit-remaining"), Some(remaining.as_str()));
    }

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/cms-pages", json!({})))
        .await
        .expect("write");
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(header(&response, "retry-after"), Some("60"));
    assert_eq!(header(&response, "x-ratelimit-remaining"), Some("0"));
    let body = read_json(response).await;
    assert_eq!(body["code"], "rate_limited");
    assert_eq!(body["retry_after"], 60);

    clock.advance(Duration::from_secs(20));
    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/cms-pages", json!({})))
        .await
        .expect("write");
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(header(&response, "retry-after"), Some("40"));

    clock.advance(Duration::from_secs(40));
    let response = app
        .oneshot(json_request("POST", "/api/cms-pages", json!({})))
        .await
        .expect("write");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn rejected_write_never_reaches_the_store() {
    let clock = ManualClock::default();
    let state = test_state(&clock);
    let token = editor_token(&state).await;
    let app = router(state);

    for n in 0..5 {
        let response = app
            .clone()
            .oneshot(authed_json_request(
                "POST",
                "/api/cms-pages",
                &token,
                json!({"slug": format!("page-{n}"), "title": "Page"}),
            ))
            .await
            .expect("create");
        assert_eq!(response.status(), StatusCode::CREATED);
    }
    let response = app
        .clone()
        .oneshot(authed_json_request(
            "POST",
            "/api/cms-pages",
            &token,
            json!({"slug": "page-5", "title": "Page"}),
        ))
        .await
        .expect("create");
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    let response = app
        .oneshot(get("/api/cms-pages/page-5"))
        .await
        .expect("show");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn content_quota_is_per_user_not_per_address() {
    let clock = ManualClock::default();
    let state = test_state(&clock);
    let first = editor_token(&state).await;
    let second = token_with_role(&state, "second@example.com", CONTENT_EDITOR_ROLE).await;
    let app = router(state);

    for n in 0..5 {
        let response = app
            .clone()
            .oneshot(authed_json_request(
                "POST",
                "/api/cms-pages",
                &first,
                json!({"slug": format!("first-{n}"), "title": "First"}),
            ))
            .await
            .expect("create");
        assert_eq!(response.status(), StatusCode::CREATED);
    }
    let response = app
        .oneshot(authed_json_request(
            "POST",
            "/api/cms-pages",
            &second,
            json!({"slug": "second", "title": "Second"}),
        ))
        .await
        .expect("create");
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn search_quota_is_per_address() {
    let clock = ManualClock::default();
    let state = test_state(&clock);
    let first = router_from(state.clone(), "198.51.100.1:1000");
    let second = router_from(state, "198.51.100.2:1000");

    for _ in 0..30 {
        let response = first
            .clone()
            .oneshot(get("/api/cms-pages"))
            .await
            .expect("list");
        assert_eq!(response.status(), StatusCode::OK);
    }
    let response = first
        .oneshot(get("/api/cms-pages"))
        .await
        .expect("list");
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(header(&response, "x-ratelimit-limit"), Some("30"));

    let response = second
        .oneshot(get("/api/cms-pages"))
        .await
        .expect("list");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "x-ratelimit-remaining"), Some("29"));
}

#[tokio::test]
async fn page_reads_and_search_use_separate_buckets() {
    let clock = ManualClock::default();
    let state = test_state(&clock);
    let app = router(state);

    let response = app
        .clone()
        .oneshot(get("/api/cms-pages"))
        .await
        .expect("list");
    assert_eq!(header(&response, "x-ratelimit-limit"), Some("30"));

    let response = app
        .oneshot(get("/api/cms-pages/anything"))
        .await
        .expect("show");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(header(&response, "x-ratelimit-limit"), Some("60"));
    assert_eq!(header(&response, "x-ratelimit-remaining"), Some("59"));
}

#[tokio::test]
async fn forwarded_for_is_honored_only_when_trusted() {
    let clock = ManualClock::default();
    let mut state = test_state(&clock);
    state.trust_forwarded_for = true;
    let app = router(state);

    let forwarded = |client: &str| {
        Request::builder()
            .uri("/api/cms-pages")
            .header("x-forwarded-for", format!("{client}, 10.0.0.1"))
            .body(Body::empty())
            .expect("request")
    };
    for _ in 0..30 {
        app.clone()
            .oneshot(forwarded("192.0.2.50"))
            .await
            .expect("list");
    }
    let response = app
        .clone()
        .oneshot(forwarded("192.0.2.50"))
        .await
        .expect("list");
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    let response = app
        .oneshot(forwarded("192.0.2.51"))
        .await
        .expect("list");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn system_routes_are_not_throttled() {
    let clock = ManualClock::default();
    let state = test_state(&clock);
    let app = router(state);

    for _ in 0..100 {
        let response = app
            .clone()
            .oneshot(get("/api/system/health"))
            .await
            .expect("health");
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get("x-ratelimit-limit").is_none());
    }
}
