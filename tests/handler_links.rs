mod common;

use axum::http::StatusCode;
use serde_json::{Value, json};

use common::{OTHER_TOKEN, OWNER_TOKEN, spawn_app};

#[tokio::test]
async fn test_create_link_accepts_camel_case() {
    let app = spawn_app().await;

    let response = app
        .server
        .post("/api/links")
        .authorization_bearer(OWNER_TOKEN)
        .json(&json!({
            "originalUrl": "example.com/landing",
            "shortCode": "promo",
            "cameraEnabled": true,
            "locationEnabled": true
        }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let json = response.json::<Value>();
    assert_eq!(json["code"], "promo");
    assert_eq!(json["original_url"], "example.com/landing");
    assert_eq!(json["camera_enabled"], true);
    assert_eq!(json["location_enabled"], true);
    assert_eq!(json["is_active"], true);
    assert_eq!(json["click_count"], 0);
}

#[tokio::test]
async fn test_create_link_generates_code() {
    let app = spawn_app().await;

    let json = app
        .create_link(json!({ "original_url": "https://example.com" }))
        .await;

    assert_eq!(json["code"].as_str().unwrap().len(), 12);
}

#[tokio::test]
async fn test_create_duplicate_code_conflicts() {
    let app = spawn_app().await;
    app.create_link(json!({ "originalUrl": "https://a.example", "shortCode": "dup" }))
        .await;

    let response = app
        .server
        .post("/api/links")
        .authorization_bearer(OTHER_TOKEN)
        .json(&json!({ "originalUrl": "https://b.example", "shortCode": "dup" }))
        .await;

    response.assert_status(StatusCode::CONFLICT);
    assert_eq!(response.json::<Value>()["error"]["code"], "conflict");
}

#[tokio::test]
async fn test_create_rejects_invalid_input() {
    let app = spawn_app().await;

    for body in [
        json!({ "originalUrl": "" }),
        json!({ "originalUrl": "ftp://files.example.com" }),
        json!({ "originalUrl": "https://example.com", "shortCode": "api" }),
        json!({ "originalUrl": "https://example.com", "shortCode": "bad code!" }),
    ] {
        let response = app
            .server
            .post("/api/links")
            .authorization_bearer(OWNER_TOKEN)
            .json(&body)
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn test_create_requires_token() {
    let app = spawn_app().await;

    app.server
        .post("/api/links")
        .json(&json!({ "originalUrl": "https://example.com" }))
        .await
        .assert_status_unauthorized();
}

#[tokio::test]
async fn test_list_links_only_returns_own() {
    let app = spawn_app().await;
    app.seed_link("a1", "https://example.com/a", 1).await;
    app.seed_link("a2", "https://example.com/b", 1).await;
    app.seed_link("b1", "https://example.com/c", 2).await;

    let response = app
        .server
        .get("/api/links")
        .authorization_bearer(OWNER_TOKEN)
        .await;

    response.assert_status_ok();
    let json = response.json::<Value>();
    let codes: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["code"].as_str().unwrap())
        .collect();
    assert_eq!(codes.len(), 2);
    assert!(!codes.contains(&"b1"));
}

#[tokio::test]
async fn test_update_link() {
    let app = spawn_app().await;
    let link = app.seed_link("edit", "https://old.example", 1).await;

    let response = app
        .server
        .patch(&format!("/api/links/{}", link.id))
        .authorization_bearer(OWNER_TOKEN)
        .json(&json!({ "originalUrl": "new.example", "cameraEnabled": true }))
        .await;

    response.assert_status_ok();
    let json = response.json::<Value>();
    assert_eq!(json["original_url"], "new.example");
    assert_eq!(json["camera_enabled"], true);

    let redirect = app.server.get("/edit").await;
    redirect.assert_status(StatusCode::FOUND);
    assert_eq!(redirect.headers()["location"], "https://new.example");
}

#[tokio::test]
async fn test_update_foreign_link_is_not_found() {
    let app = spawn_app().await;
    let link = app.seed_link("theirs", "https://example.com", 2).await;

    app.server
        .patch(&format!("/api/links/{}", link.id))
        .authorization_bearer(OWNER_TOKEN)
        .json(&json!({ "isActive": false }))
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn test_update_empty_patch_rejected() {
    let app = spawn_app().await;
    let link = app.seed_link("same", "https://example.com", 1).await;

    app.server
        .patch(&format!("/api/links/{}", link.id))
        .authorization_bearer(OWNER_TOKEN)
        .json(&json!({}))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_link_removes_visits() {
    let app = spawn_app().await;
    let link = app.seed_link("bye", "https://example.com", 1).await;
    app.seed_visits(link.id, 3).await;

    app.server
        .delete(&format!("/api/links/{}", link.id))
        .authorization_bearer(OTHER_TOKEN)
        .await
        .assert_status_not_found();

    app.server
        .delete(&format!("/api/links/{}", link.id))
        .authorization_bearer(OWNER_TOKEN)
        .await
        .assert_status(StatusCode::NO_CONTENT);

    assert_eq!(app.store.visit_count(), 0);
    app.server.get("/bye").await.assert_status_not_found();
}
