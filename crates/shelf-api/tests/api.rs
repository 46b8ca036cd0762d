//! End-to-end tests: the real router over an in-memory store, driven one
//! request at a time with `oneshot`.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use shelf_api::books::CatalogClient;
use shelf_api::{AppStateInner, router};
use shelf_db::Database;
use shelf_types::api::CatalogBook;

fn app() -> Router {
    let state = Arc::new(AppStateInner {
        db: Database::open_in_memory().unwrap(),
        jwt_secret: "test-secret".into(),
        token_ttl: chrono::Duration::days(1),
        // Nothing listens here; tests never reach the catalog
        catalog: CatalogClient::new("http://127.0.0.1:9", None),
    });
    router(state)
}

async fn call(app: &Router, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let req = match body {
        Some(body) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };

    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

/// Registers `name` and returns (token, user id).
async fn register(app: &Router, name: &str) -> (String, String) {
    let (status, body) = call(
        app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "username": name, "email": format!("{}@example.com", name), "password": "correct-horse" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    (
        body["token"].as_str().unwrap().to_string(),
        body["user"]["id"].as_str().unwrap().to_string(),
    )
}

fn ids(list: &Value) -> Vec<String> {
    list.as_array()
        .unwrap()
        .iter()
        .map(|f| f["id"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn health_is_public() {
    let app = app();
    let (status, body) = call(&app, "GET", "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn protected_routes_need_a_valid_token() {
    let app = app();
    let (status, _) = call(&app, "GET", "/api/library", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = call(&app, "GET", "/api/friends", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid token");
}

#[tokio::test]
async fn register_and_login() {
    let app = app();
    register(&app, "reader").await;

    let (status, _) = call(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "username": "someone", "email": "READER@example.com", "password": "correct-horse" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = call(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "reader@example.com", "password": "wrong-horse" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = call(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "Reader@Example.com", "password": "correct-horse" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["username"], "reader");

    let token = body["token"].as_str().unwrap();
    let (status, me) = call(&app, "GET", "/api/users/me", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "reader@example.com");
    assert!(me.get("password").is_none());
}

#[tokio::test]
async fn friend_request_flow() {
    let app = app();
    let (alice, alice_id) = register(&app, "alice").await;
    let (bob, bob_id) = register(&app, "bob").await;

    let (status, _) = call(&app, "POST", &format!("/api/friends/request/{}", bob_id), Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, pending) = call(&app, "GET", "/api/friends/requests", Some(&bob), None).await;
    assert_eq!(pending.as_array().unwrap().len(), 1);
    assert_eq!(pending[0]["fromUserId"], alice_id.as_str());
    assert_eq!(pending[0]["username"], "alice");
    assert!(pending[0]["requestedAt"].is_string());

    let (status, _) = call(&app, "POST", &format!("/api/friends/accept/{}", alice_id), Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, alice_friends) = call(&app, "GET", "/api/friends", Some(&alice), None).await;
    let (_, bob_friends) = call(&app, "GET", "/api/friends", Some(&bob), None).await;
    assert_eq!(ids(&alice_friends), vec![bob_id.clone()]);
    assert_eq!(ids(&bob_friends), vec![alice_id.clone()]);

    // The request is spent
    let (status, _) = call(&app, "POST", &format!("/api/friends/accept/{}", alice_id), Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(&app, "POST", &format!("/api/friends/reject/{}", alice_id), Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn friend_request_validation() {
    let app = app();
    let (alice, alice_id) = register(&app, "alice").await;

    let (status, body) = call(&app, "POST", &format!("/api/friends/request/{}", alice_id), Some(&alice), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Cannot friend yourself");

    let ghost = uuid::Uuid::new_v4();
    let (status, _) = call(&app, "POST", &format!("/api/friends/request/{}", ghost), Some(&alice), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn friend_library_is_visible_to_friends_only() {
    let app = app();
    let (alice, alice_id) = register(&app, "alice").await;
    let (bob, bob_id) = register(&app, "bob").await;

    call(
        &app,
        "POST",
        "/api/library/add",
        Some(&bob),
        Some(json!({ "book": { "googleId": "B1", "title": "Piranesi" }, "status": "read" })),
    )
    .await;

    let (status, body) = call(&app, "GET", &format!("/api/friends/{}/library", bob_id), Some(&alice), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Not friends");

    let ghost = uuid::Uuid::new_v4();
    for target in [ghost.to_string(), "whoever".to_string()] {
        let (status, _) = call(&app, "GET", &format!("/api/friends/{}/library", target), Some(&alice), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    call(&app, "POST", &format!("/api/friends/request/{}", bob_id), Some(&alice), None).await;
    call(&app, "POST", &format!("/api/friends/accept/{}", alice_id), Some(&bob), None).await;

    let (status, view) = call(&app, "GET", &format!("/api/friends/{}/library", bob_id), Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["username"], "bob");
    assert_eq!(view["library"][0]["googleId"], "B1");
    assert_eq!(view["library"][0]["status"], "read");
}

#[tokio::test]
async fn library_add_update_and_mark_read() {
    let app = app();
    let (alice, _) = register(&app, "alice").await;

    let (status, library) = call(
        &app,
        "POST",
        "/api/library/add",
        Some(&alice),
        Some(json!({ "book": { "googleId": "X1", "title": "Kindred", "authors": ["Octavia E. Butler"] }, "status": "toBeRead" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(library[0]["status"], "toBeRead");
    assert_eq!(library[0]["isRead"], false);

    let (_, library) = call(
        &app,
        "POST",
        "/api/library/add",
        Some(&alice),
        Some(json!({ "book": { "googleId": "X1", "title": "Something else" }, "status": "READ" })),
    )
    .await;
    assert_eq!(library.as_array().unwrap().len(), 1);
    assert_eq!(library[0]["status"], "read");
    assert_eq!(library[0]["isRead"], true);
    assert_eq!(library[0]["title"], "Kindred");

    let (status, library) = call(
        &app,
        "POST",
        "/api/library/mark-read",
        Some(&alice),
        Some(json!({ "googleId": "X1", "isRead": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(library[0]["status"], "toBeRead");
    assert_eq!(library[0]["isRead"], false);

    let (_, listed) = call(&app, "GET", "/api/library", Some(&alice), None).await;
    assert_eq!(listed, library);
}

#[tokio::test]
async fn library_errors_and_idempotent_remove() {
    let app = app();
    let (alice, _) = register(&app, "alice").await;

    let (status, _) = call(&app, "POST", "/api/library/add", Some(&alice), Some(json!({ "book": { "title": "No id" }, "status": "read" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(&app, "POST", "/api/library/add", Some(&alice), Some(json!({ "book": { "googleId": "X1" }, "status": "done" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("toBeRead"));

    let (status, _) = call(&app, "POST", "/api/library/mark-read", Some(&alice), Some(json!({ "googleId": "X1", "isRead": true }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, library) = call(&app, "POST", "/api/library/remove", Some(&alice), Some(json!({ "googleId": "X1" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(library, json!([]));
}

#[tokio::test]
async fn empty_book_search_skips_the_catalog() {
    let app = app();
    let (alice, _) = register(&app, "alice").await;

    let (status, body) = call(&app, "GET", "/api/books/search?q=", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "items": [], "totalItems": 0, "nextStartIndex": 0 }));
}

#[tokio::test]
async fn catalog_failure_is_a_generic_500() {
    let app = app();
    let (alice, _) = register(&app, "alice").await;

    let (status, body) = call(&app, "GET", "/api/books/search?q=dune", Some(&alice), None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Failed to fetch books from catalog");
}

#[tokio::test]
async fn untitled_catalog_hit_can_be_added() {
    let app = app();
    let (alice, _) = register(&app, "alice").await;

    let hit = CatalogBook {
        google_id: "NT1".into(),
        title: None,
        authors: vec![],
        thumbnail: None,
        rating: None,
        description: None,
        preview_link: None,
        genres: vec![],
    };
    let (status, library) = call(
        &app,
        "POST",
        "/api/library/add",
        Some(&alice),
        Some(json!({ "book": hit, "status": "read" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", library);
    assert_eq!(library[0]["googleId"], "NT1");
    assert_eq!(library[0]["title"], "");
}

#[tokio::test]
async fn malformed_bodies_get_a_message() {
    let app = app();
    let (alice, _) = register(&app, "alice").await;

    let (status, body) = call(
        &app,
        "POST",
        "/api/library/add",
        Some(&alice),
        Some(json!({ "book": { "googleId": "X1" }, "status": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());

    let req = Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn user_search_finds_by_substring() {
    let app = app();
    let (alice, _) = register(&app, "alice").await;
    register(&app, "malice").await;

    let (status, hits) = call(&app, "GET", "/api/users/search?q=LIC", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(hits.as_array().unwrap().len(), 2);
    assert!(hits[0].get("email").is_none());
}
