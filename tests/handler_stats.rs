mod common;

use axum::http::StatusCode;
use serde_json::Value;

use common::{OTHER_TOKEN, OWNER_TOKEN, spawn_app};

#[tokio::test]
async fn test_visit_log_second_page() {
    let app = spawn_app().await;
    let link = app.seed_link("busy", "https://example.com", 1).await;
    let visits = app.seed_visits(link.id, 120).await;

    let response = app
        .server
        .get(&format!("/api/stats/links/{}/visits", link.id))
        .add_query_param("page", 2)
        .add_query_param("page_size", 50)
        .authorization_bearer(OWNER_TOKEN)
        .await;

    response.assert_status_ok();
    let json = response.json::<Value>();
    assert_eq!(json["link_id"], link.id);
    assert_eq!(json["pagination"]["page"], 2);
    assert_eq!(json["pagination"]["page_size"], 50);
    assert_eq!(json["pagination"]["total_items"], 120);
    assert_eq!(json["pagination"]["total_pages"], 3);

    let items = json["items"].as_array().unwrap();
    assert_eq!(items.len(), 50);
    // Newest first: the second page starts after the 50 newest visits.
    assert_eq!(items[0]["id"], visits[69].id);
    assert_eq!(items[49]["id"], visits[20].id);
}

#[tokio::test]
async fn test_visit_log_defaults() {
    let app = spawn_app().await;
    let link = app.seed_link("few", "https://example.com", 1).await;
    app.seed_visits(link.id, 3).await;

    let json = app
        .server
        .get(&format!("/api/stats/links/{}/visits", link.id))
        .authorization_bearer(OWNER_TOKEN)
        .await
        .json::<Value>();

    assert_eq!(json["pagination"]["page"], 1);
    assert_eq!(json["pagination"]["page_size"], 50);
    assert_eq!(json["items"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_visit_log_rejects_bad_page_size() {
    let app = spawn_app().await;
    let link = app.seed_link("paging", "https://example.com", 1).await;
    let path = format!("/api/stats/links/{}/visits", link.id);

    let response = app
        .server
        .get(&path)
        .add_query_param("page_size", 501)
        .authorization_bearer(OWNER_TOKEN)
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"]["code"], "validation_error");

    app.server
        .get(&path)
        .add_query_param("page", 0)
        .authorization_bearer(OWNER_TOKEN)
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    app.server
        .get(&path)
        .add_query_param("page_size", "lots")
        .authorization_bearer(OWNER_TOKEN)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_foreign_link_is_not_found() {
    let app = spawn_app().await;
    let link = app.seed_link("mine", "https://example.com", 1).await;
    app.seed_visits(link.id, 2).await;

    for path in [
        format!("/api/stats/links/{}/visits", link.id),
        format!("/api/stats/links/{}/recent", link.id),
    ] {
        app.server
            .get(&path)
            .authorization_bearer(OTHER_TOKEN)
            .await
            .assert_status_not_found();
    }
}

#[tokio::test]
async fn test_stats_require_token() {
    let app = spawn_app().await;

    let response = app.server.get("/api/stats/summary").await;
    response.assert_status_unauthorized();
    assert_eq!(response.headers()["www-authenticate"], "Bearer");

    app.server
        .get("/api/stats/summary")
        .authorization_bearer("not-a-token")
        .await
        .assert_status_unauthorized();
}

#[tokio::test]
async fn test_summary_is_scoped_to_owner() {
    let app = spawn_app().await;
    let first = app.seed_link("one", "https://example.com/1", 1).await;
    let second = app.seed_link("two", "https://example.com/2", 1).await;
    let foreign = app.seed_link("three", "https://example.com/3", 2).await;
    app.seed_visits(first.id, 4).await;
    app.seed_visits(second.id, 1).await;
    app.seed_visits(foreign.id, 7).await;

    let response = app
        .server
        .get("/api/stats/summary")
        .authorization_bearer(OWNER_TOKEN)
        .await;

    response.assert_status_ok();
    let json = response.json::<Value>();
    assert_eq!(json["total_clicks"], 5);
    assert_eq!(json["unique_visitors"], 4);
    assert_eq!(json["clicks_by_link"][first.id.to_string()], 4);
    assert_eq!(json["clicks_by_link"][second.id.to_string()], 1);
    assert!(json["clicks_by_link"].get(foreign.id.to_string()).is_none());
    assert_eq!(json["links"].as_array().unwrap().len(), 2);
    assert_eq!(json["daily"].as_array().unwrap().len(), 30);
}

#[tokio::test]
async fn test_summary_without_links() {
    let app = spawn_app().await;

    let json = app
        .server
        .get("/api/stats/summary")
        .authorization_bearer(OTHER_TOKEN)
        .await
        .json::<Value>();

    assert_eq!(json["total_clicks"], 0);
    assert_eq!(json["unique_visitors"], 0);
    assert!(json["links"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_recent_visits_capped_at_100() {
    let app = spawn_app().await;
    let link = app.seed_link("recent", "https://example.com", 1).await;
    let visits = app.seed_visits(link.id, 105).await;

    let response = app
        .server
        .get(&format!("/api/stats/links/{}/recent", link.id))
        .authorization_bearer(OWNER_TOKEN)
        .await;

    response.assert_status_ok();
    let json = response.json::<Value>();
    let items = json["items"].as_array().unwrap();
    assert_eq!(items.len(), 100);
    assert_eq!(items[0]["id"], visits[104].id);
}
