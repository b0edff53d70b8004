mod common;

use serde_json::Value;

use common::spawn_app;

#[tokio::test]
async fn test_destination_describes_link() {
    let app = spawn_app().await;
    app.create_link(serde_json::json!({
        "originalUrl": "//cdn.example.com/a",
        "shortCode": "cdn",
        "cameraEnabled": true
    }))
    .await;

    let response = app.server.get("/destination/cdn").await;

    response.assert_status_ok();
    let json = response.json::<Value>();
    assert_eq!(json["destination"], "https://cdn.example.com/a");
    assert_eq!(json["camera_enabled"], true);
    assert_eq!(json["location_enabled"], false);
    assert_eq!(json["requires_client_navigation"], false);
}

#[tokio::test]
async fn test_destination_flags_sensitive_hosts() {
    let app = spawn_app().await;
    app.seed_link("sso", "https://acme.okta.com/app", 1).await;

    let json = app.server.get("/destination/sso").await.json::<Value>();

    assert_eq!(json["requires_client_navigation"], true);
}

#[tokio::test]
async fn test_destination_has_no_side_effects() {
    let app = spawn_app().await;
    let link = app.seed_link("quiet", "https://example.com", 1).await;

    for _ in 0..3 {
        let response = app.server.get("/destination/quiet").await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["destination"], "https://example.com");
    }

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(app.store.visit_count(), 0);
    assert_eq!(app.link(link.id).await.click_count, 0);
}

#[tokio::test]
async fn test_destination_unknown_code() {
    let app = spawn_app().await;

    app.server
        .get("/destination/unknown")
        .await
        .assert_status_not_found();
}
