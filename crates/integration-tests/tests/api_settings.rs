use axum::http::{Method, StatusCode};
use integration_tests::TestApp;
use serde_json::json;

#[tokio::test]
async fn settings_are_public_to_read_and_admin_only_to_write() {
    let app = TestApp::spawn().await;
    let desk = app.editor("desk", &["news", "ads"]).await;

    let empty = app.get("/settings", None).await;
    assert_eq!(empty.status, StatusCode::OK);
    assert_eq!(empty.data(), &json!({}));

    let refused = app
        .send(Method::POST, "/settings", Some(desk.as_str()), Some(json!({ "site_name": "Desk Daily" })))
        .await;
    assert_eq!(refused.status, StatusCode::FORBIDDEN);

    let anonymous = app
        .send(Method::POST, "/settings", None, Some(json!({ "site_name": "Nobody" })))
        .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.get("/settings", None).await.data(), &json!({}));
}

#[tokio::test]
async fn writes_merge_into_existing_settings() {
    let app = TestApp::spawn().await;
    let admin = Some(app.admin_token.as_str());

    app.send(
        Method::POST,
        "/settings",
        admin,
        Some(json!({ "site_name": "The Gazette", "footer": "(c) Gazette" })),
    )
    .await;
    let merged = app
        .send(
            Method::POST,
            "/settings",
            admin,
            Some(json!({ "site_name": "The Evening Gazette", "contact": "desk@gazette.test" })),
        )
        .await;

    let expected = json!({
        "contact": "desk@gazette.test",
        "footer": "(c) Gazette",
        "site_name": "The Evening Gazette",
    });
    assert_eq!(merged.status, StatusCode::OK);
    assert_eq!(merged.data(), &expected);
    assert_eq!(app.get("/settings", None).await.data(), &expected);
}

#[tokio::test]
async fn rejected_batches_change_nothing() {
    let app = TestApp::spawn().await;
    let admin = Some(app.admin_token.as_str());
    app.send(Method::POST, "/settings", admin, Some(json!({ "site_name": "Before" })))
        .await;

    let empty = app.send(Method::POST, "/settings", admin, Some(json!({}))).await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);

    let not_flat = app
        .send(Method::POST, "/settings", admin, Some(json!({ "site_name": { "nested": true } })))
        .await;
    assert_eq!(not_flat.status, StatusCode::BAD_REQUEST);

    sqlx::query(
        "CREATE TRIGGER reject_poison BEFORE INSERT ON settings WHEN NEW.key = 'poison' \
         BEGIN SELECT RAISE(ABORT, 'poisoned key'); END",
    )
    .execute(app.store.pool())
    .await
    .unwrap();

    let failed = app
        .send(
            Method::POST,
            "/settings",
            admin,
            Some(json!({ "site_name": "After", "poison": "x" })),
        )
        .await;
    assert_eq!(failed.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(failed.error_kind(), Some("storage"));
    assert_eq!(app.get("/settings", None).await.data(), &json!({ "site_name": "Before" }));
}
