mod common;

use axum::http::StatusCode;
use common::{editor_token, plain_token, read_json, router, test_state};
use http_helpers::{authed, authed_json_request, get, json_request};
use marketplace_api::store::PageStore;
use marketplace_throttle::ManualClock;
use serde_json::json;
use tower::ServiceExt;

fn about_page() -> serde_json::Value {
    json!({
        "slug": "about-us",
        "title": "About us",
        "content": [
            {"type": "cta", "order": 3, "props": {"label": "Shop"}},
            {"type": "hero", "order": 1, "props": {"heading": "Hello"}},
            {"type": "text", "order": 2}
        ],
        "meta": {"description": "Who we are"}
    })
}

#[tokio::test]
async fn created_page_is_served_with_blocks_in_order() {
    let clock = ManualClock::default();
    let state = test_state(&clock);
    let token = editor_token(&state).await;
    let app = router(state);

    let response = app
        .clone()
        .oneshot(authed_json_request("POST", "/api/cms-pages", &token, about_page()))
        .await
        .expect("create");
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = read_json(response).await;
    assert_eq!(created["data"]["slug"], "about-us");
    assert_eq!(created["data"]["path"], "/about-us");

    let response = app
        .oneshot(get("/api/cms-pages/about-us"))
        .await
        .expect("show");
    assert_eq!(response.status(), StatusCode::OK);
    let page = read_json(response).await;
    let kinds: Vec<&str> = page["data"]["content"]
        .as_array()
        .expect("blocks")
        .iter()
        .map(|block| block["type"].as_str().expect("type"))
        .collect();
    assert_eq!(kinds, vec!["hero", "text", "cta"]);
    assert_eq!(page["data"]["meta"]["description"], "Who we are");
}

#[tokio::test]
async fn write_without_permission_is_forbidden_and_creates_nothing() {
    let clock = ManualClock::default();
    let state = test_state(&clock);
    let token = plain_token(&state, "nobody@example.com").await;
    let app = router(state.clone());

    let response = app
        .clone()
        .oneshot(authed_json_request("POST", "/api/cms-pages", &token, about_page()))
        .await
        .expect("create");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(read_json(response).await["code"], "forbidden");

    let response = app
        .oneshot(json_request("POST", "/api/cms-pages", about_page()))
        .await
        .expect("anonymous create");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    assert!(state.store.list_pages().await.expect("list").is_empty());
}

#[tokio::test]
async fn invalid_token_is_treated_as_anonymous() {
    let clock = ManualClock::default();
    let state = test_state(&clock);
    let app = router(state);

    let response = app
        .clone()
        .oneshot(authed_json_request(
            "POST",
            "/api/cms-pages",
            "999|not-a-real-secret",
            about_page(),
        ))
        .await
        .expect("create");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .oneshot(authed("GET", "/api/cms-pages", "garbage"))
        .await
        .expect("list");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn block_without_order_is_rejected_with_field_error() {
    let clock = ManualClock::default();
    let state = test_state(&clock);
    let token = editor_token(&state).await;
    let app = router(state.clone());

    let body = json!({
        "slug": "faq",
        "title": "FAQ",
        "content": [{"type": "hero"}]
    });
    let response = app
        .oneshot(authed_json_request("POST", "/api/cms-pages", &token, body))
        .await
        .expect("create");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let error = read_json(response).await;
    assert_eq!(error["code"], "validation_failed");
    assert_eq!(
        error["errors"]["content.0.order"][0],
        "The content.0.order field is required."
    );
    assert!(state.store.list_pages().await.expect("list").is_empty());
}

#[tokio::test]
async fn missing_fields_are_all_reported() {
    let clock = ManualClock::default();
    let state = test_state(&clock);
    let token = editor_token(&state).await;
    let app = router(state);

    let response = app
        .oneshot(authed_json_request(
            "POST",
            "/api/cms-pages",
            &token,
            json!({"content": "not blocks"}),
        ))
        .await
        .expect("create");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let error = read_json(response).await;
    let errors = error["errors"].as_object().expect("errors");
    assert!(errors.contains_key("slug"));
    assert!(errors.contains_key("title"));
    assert!(errors.contains_key("content"));
}

#[tokio::test]
async fn duplicate_slug_is_rejected() {
    let clock = ManualClock::default();
    let state = test_state(&clock);
    let token = editor_token(&state).await;
    let app = router(state);

    let response = app
        .clone()
        .oneshot(authed_json_request("POST", "/api/cms-pages", &token, about_page()))
        .await
        .expect("create");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .oneshot(authed_json_request("POST", "/api/cms-pages", &token, about_page()))
        .await
        .expect("duplicate");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let error = read_json(response).await;
    assert_eq!(error["errors"]["slug"][0], "The slug has already been taken.");
}

#[tokio::test]
async fn update_keeps_own_slug_but_not_another_pages() {
    let clock = ManualClock::default();
    let state = test_state(&clock);
    let token = editor_token(&state).await;
    let app = router(state);

    let about = read_json(
        app.clone()
            .oneshot(authed_json_request("POST", "/api/cms-pages", &token, about_page()))
            .await
            .expect("create about"),
    )
    .await;
    let about_id = about["data"]["id"].as_u64().expect("id");
    let contact = json!({"slug": "contact", "title": "Contact"});
    let response = app
        .clone()
        .oneshot(authed_json_request("POST", "/api/cms-pages", &token, contact))
        .await
        .expect("create contact");
    assert_eq!(response.status(), StatusCode::CREATED);

    let renamed = json!({"slug": "about-us", "title": "About the marketplace"});
    let response = app
        .clone()
        .oneshot(authed_json_request(
            "PUT",
            &format!("/api/cms-pages/{about_id}"),
            &token,
            renamed,
        ))
        .await
        .expect("update");
    assert_eq!(response.status(), StatusCode::OK);
    let updated = read_json(response).await;
    assert_eq!(updated["data"]["title"], "About the marketplace");
    assert_eq!(updated["data"]["slug"], "about-us");

    let clash = json!({"slug": "contact", "title": "About"});
    let response = app
        .oneshot(authed_json_request(
            "PUT",
            &format!("/api/cms-pages/{about_id}"),
            &token,
            clash,
        ))
        .await
        .expect("clash");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let error = read_json(response).await;
    assert_eq!(error["errors"]["slug"][0], "The slug has already been taken.");
}

#[tokio::test]
async fn unknown_pages_are_not_found() {
    let clock = ManualClock::default();
    let state = test_state(&clock);
    let token = editor_token(&state).await;
    let app = router(state);

    let response = app
        .clone()
        .oneshot(get("/api/cms-pages/missing"))
        .await
        .expect("show");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(read_json(response).await["code"], "not_found");

    let response = app
        .clone()
        .oneshot(authed_json_request(
            "PUT",
            "/api/cms-pages/42",
            &token,
            json!({"slug": "x", "title": "X"}),
        ))
        .await
        .expect("update");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(authed("DELETE", "/api/cms-pages/not-a-number", &token))
        .await
        .expect("delete");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleted_page_is_gone() {
    let clock = ManualClock::default();
    let state = test_state(&clock);
    let token = editor_token(&state).await;
    let app = router(state);

    let created = read_json(
        app.clone()
            .oneshot(authed_json_request("POST", "/api/cms-pages", &token, about_page()))
            .await
            .expect("create"),
    )
    .await;
    let id = created["data"]["id"].as_u64().expect("id");

    let response = app
        .clone()
        .oneshot(authed("DELETE", &format!("/api/cms-pages/{id}"), &token))
        .await
        .expect("delete");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        read_json(response).await["message"],
        "Page deleted successfully."
    );

    let response = app
        .oneshot(get("/api/cms-pages/about-us"))
        .await
        .expect("show");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_applies_search_and_ordering() {
    let clock = ManualClock::default();
    let state = test_state(&clock);
    let token = editor_token(&state).await;
    let app = router(state);

    for (slug, title) in [("returns", "Returns"), ("about-us", "About us"), ("shipping", "Shipping")] {
        let response = app
            .clone()
            .oneshot(authed_json_request(
                "POST",
                "/api/cms-pages",
                &token,
                json!({"slug": slug, "title": title}),
            ))
            .await
            .expect("create");
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let listed = read_json(
        app.clone()
            .oneshot(get("/api/cms-pages?orderBy=slug&sortedBy=desc"))
            .await
            .expect("list"),
    )
    .await;
    let slugs: Vec<&str> = listed["data"]
        .as_array()
        .expect("pages")
        .iter()
        .map(|page| page["slug"].as_str().expect("slug"))
        .collect();
    assert_eq!(slugs, vec!["shipping", "returns", "about-us"]);

    let searched = read_json(
        app.clone()
            .oneshot(get("/api/cms-pages?search=ship"))
            .await
            .expect("search"),
    )
    .await;
    assert_eq!(searched["data"].as_array().expect("pages").len(), 1);

    let response = app
        .oneshot(get("/api/cms-pages?orderBy=password"))
        .await
        .expect("bad criteria");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["data"].as_array().expect("pages").len(), 3);
}

#[tokio::test]
async fn concurrent_creates_with_same_slug_store_one_page() {
    let clock = ManualClock::default();
    let state = test_state(&clock);
    let token = editor_token(&state).await;
    let app = router(state.clone());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let app = app.clone();
            let token = token.clone();
            tokio::spawn(async move {
                app.oneshot(authed_json_request(
                    "POST",
                    "/api/cms-pages",
                    &token,
                    json!({"slug": "launch", "title": "Launch"}),
                ))
                .await
                .expect("create")
                .status()
            })
        })
        .collect();
    let mut created = 0;
    for handle in handles {
        let status = handle.await.expect("join");
        if status == StatusCode::CREATED {
            created += 1;
        } else {
            assert!(
                status == StatusCode::UNPROCESSABLE_ENTITY || status == StatusCode::CONFLICT,
                "unexpected status {status}"
            );
        }
    }
    assert_eq!(created, 1);
    assert_eq!(state.store.list_pages().await.expect("list").len(), 1);
}

#[tokio::test]
async fn update_without_path_or_meta_keeps_stored_values() {
    let clock = ManualClock::default();
    let state = test_state(&clock);
    let token = editor_token(&state).await;
    let app = router(state);

    let created = read_json(
        app.clone()
            .oneshot(authed_json_request(
                "POST",
                "/api/cms-pages",
                &token,
                json!({
                    "slug": "faq",
                    "title": "FAQ",
                    "path": "/help/faq",
                    "content": [{"type": "text", "order": 1}],
                    "meta": {"k": "v"}
                }),
            ))
            .await
            .expect("create"),
    )
    .await;
    assert_eq!(created["data"]["path"], "/help/faq");
    let id = created["data"]["id"].as_u64().expect("id");

    let response = app
        .oneshot(authed_json_request(
            "PUT",
            &format!("/api/cms-pages/{id}"),
            &token,
            json!({"slug": "faq", "title": "FAQ v2"}),
        ))
        .await
        .expect("update");
    assert_eq!(response.status(), StatusCode::OK);
    let updated = read_json(response).await;
    assert_eq!(updated["data"]["title"], "FAQ v2");
    assert_eq!(updated["data"]["path"], "/help/faq");
    assert_eq!(updated["data"]["meta"], json!({"k": "v"}));
    assert_eq!(updated["data"]["content"][0]["type"], "text");
}

#[tokio::test]
async fn slug_colliding_with_stored_path_is_a_field_error() {
    let clock = ManualClock::default();
    let state = test_state(&clock);
    let token = editor_token(&state).await;
    let app = router(state.clone());

    let response = app
        .clone()
        .oneshot(authed_json_request(
            "POST",
            "/api/cms-pages",
            &token,
            json!({"slug": "shipping", "title": "Shipping", "path": "/y"}),
        ))
        .await
        .expect("create");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .oneshot(authed_json_request(
            "POST",
            "/api/cms-pages",
            &token,
            json!({"slug": "y", "title": "Y"}),
        ))
        .await
        .expect("create");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let error = read_json(response).await;
    assert_eq!(error["errors"]["path"][0], "The path has already been taken.");
    assert_eq!(state.store.list_pages().await.expect("list").len(), 1);
}
