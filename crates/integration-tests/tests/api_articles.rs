use axum::http::{Method, StatusCode};
use domains::MAX_BULK_IDS;
use fake::faker::lorem::en::{Paragraph, Sentence};
use fake::Fake;
use integration_tests::{ids, TestApp};
use serde_json::json;

#[tokio::test]
async fn trash_restore_then_permanent_delete_round_trip() {
    let app = TestApp::spawn().await;
    let admin = Some(app.admin_token.as_str());
    let a = app.article("X", true).await;

    let reply = app
        .send(Method::POST, "/articles/bulk/trash", admin, Some(json!({ "ids": [a] })))
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.data()["affected"], 1);

    assert!(!ids(&app.get("/articles", None).await).contains(&a));
    assert!(ids(&app.get("/articles?status=trashed", admin).await).contains(&a));

    let reply = app
        .send(Method::POST, "/articles/bulk/restore", admin, Some(json!({ "ids": [a] })))
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(ids(&app.get("/articles", None).await).contains(&a));

    let reply = app
        .send(Method::DELETE, &format!("/articles/{a}?permanent=true"), admin, None)
        .await;
    assert_eq!(reply.status, StatusCode::OK);

    let reply = app.get(&format!("/articles/{a}"), admin).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.error_kind(), Some("not_found"));

    let reply = app
        .send(Method::POST, &format!("/articles/{a}/restore"), admin, None)
        .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert!(!ids(&app.get("/articles?status=trashed", admin).await).contains(&a));
}

#[tokio::test]
async fn trash_and_restore_are_idempotent() {
    let app = TestApp::spawn().await;
    let admin = Some(app.admin_token.as_str());
    let a = app.article("Storm warning", true).await;
    let uri = format!("/articles/{a}");

    let first = app.send(Method::DELETE, &uri, admin, None).await;
    let second = app.send(Method::DELETE, &uri, admin, None).await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(first.data()["affected"], 1);
    assert_eq!(second.data()["affected"], 0);
    assert_eq!(app.get(&uri, admin).await.data()["state"], "trashed");

    let restore = format!("/articles/{a}/restore");
    assert_eq!(app.send(Method::POST, &restore, admin, None).await.status, StatusCode::OK);
    let again = app.send(Method::POST, &restore, admin, None).await;
    assert_eq!(again.status, StatusCode::OK);
    assert_eq!(again.data()["affected"], 0);
    assert_eq!(app.get(&uri, admin).await.data()["state"], "active");
}

#[tokio::test]
async fn bulk_requests_are_validated_and_all_or_nothing() {
    let app = TestApp::spawn().await;
    let admin = Some(app.admin_token.as_str());
    let a = app.article("Budget", true).await;

    let empty = app
        .send(Method::POST, "/articles/bulk/trash", admin, Some(json!({ "ids": [] })))
        .await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);
    assert_eq!(empty.error_kind(), Some("validation"));

    let unknown = app
        .send(Method::POST, "/articles/bulk/trash", admin, Some(json!({ "ids": [a, 9999] })))
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
    assert!(ids(&app.get("/articles", None).await).contains(&a));

    let purge_live = app
        .send(Method::POST, "/articles/bulk/delete", admin, Some(json!({ "ids": [a] })))
        .await;
    assert_eq!(purge_live.status, StatusCode::CONFLICT);
    assert_eq!(purge_live.error_kind(), Some("conflict"));

    let malformed = app
        .send(Method::POST, "/articles/bulk/trash", admin, Some(json!({ "ids": "all" })))
        .await;
    assert_eq!(malformed.status, StatusCode::BAD_REQUEST);

    let oversized: Vec<i64> = (1..=MAX_BULK_IDS as i64 + 1).collect();
    let too_many = app
        .send(Method::POST, "/articles/bulk/trash", admin, Some(json!({ "ids": oversized })))
        .await;
    assert_eq!(too_many.status, StatusCode::BAD_REQUEST);
    assert!(ids(&app.get("/articles", None).await).contains(&a));
}

#[tokio::test]
async fn purge_needs_trash_first_and_is_final() {
    let app = TestApp::spawn().await;
    let admin = Some(app.admin_token.as_str());
    let a = app.article("Leak", true).await;
    let purge = format!("/articles/trash/{a}");

    assert_eq!(app.send(Method::DELETE, &purge, admin, None).await.status, StatusCode::CONFLICT);

    app.send(Method::DELETE, &format!("/articles/{a}"), admin, None).await;
    let direct = app
        .send(Method::DELETE, &format!("/articles/{a}?permanent=true"), admin, None)
        .await;
    assert_eq!(direct.status, StatusCode::CONFLICT);
    assert_eq!(app.send(Method::DELETE, &purge, admin, None).await.status, StatusCode::OK);
    assert_eq!(app.send(Method::DELETE, &purge, admin, None).await.status, StatusCode::NOT_FOUND);
    assert_eq!(app.get(&format!("/articles/{a}"), admin).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn toggling_a_trashed_article_is_a_conflict() {
    let app = TestApp::spawn().await;
    let admin = Some(app.admin_token.as_str());
    let a = app.article("Hidden gem", true).await;
    let toggle = format!("/articles/{a}/visibility");

    let hidden = app.send(Method::POST, &toggle, admin, None).await;
    assert_eq!(hidden.data()["state"], "hidden");
    assert_eq!(app.get(&format!("/articles/{a}"), None).await.status, StatusCode::NOT_FOUND);

    app.send(Method::DELETE, &format!("/articles/{a}"), admin, None).await;
    assert_eq!(app.send(Method::POST, &toggle, admin, None).await.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn empty_trash_purges_every_trashed_article() {
    let app = TestApp::spawn().await;
    let admin = Some(app.admin_token.as_str());
    let keep = app.article("Keep", true).await;
    let a = app.article("Gone 1", true).await;
    let b = app.article("Gone 2", false).await;
    app.send(Method::POST, "/articles/bulk/trash", admin, Some(json!({ "ids": [a, b] })))
        .await;

    let reply = app.send(Method::DELETE, "/articles/trash/empty", admin, None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.data()["affected"], 2);
    assert!(ids(&app.get("/articles?status=trashed", admin).await).is_empty());
    assert_eq!(ids(&app.get("/articles?status=live", admin).await), vec![keep]);
}

#[tokio::test]
async fn news_editor_may_trash_but_not_restore() {
    let app = TestApp::spawn().await;
    let desk = app.editor("desk", &["news"]).await;
    let a = app.article("Council vote", true).await;

    let trash = app
        .send(Method::POST, "/articles/bulk/trash", Some(desk.as_str()), Some(json!({ "ids": [a] })))
        .await;
    assert_eq!(trash.status, StatusCode::OK);

    let restore = app
        .send(Method::POST, &format!("/articles/{a}/restore"), Some(desk.as_str()), None)
        .await;
    assert_eq!(restore.status, StatusCode::FORBIDDEN);
    assert_eq!(restore.error_kind(), Some("authorization"));

    let permanent = app
        .send(Method::DELETE, &format!("/articles/{a}?permanent=true"), Some(desk.as_str()), None)
        .await;
    assert_eq!(permanent.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn listing_scopes_are_gated() {
    let app = TestApp::spawn().await;
    let archivist = app.editor("archivist", &["trash"]).await;

    assert_eq!(app.get("/articles?status=trashed", None).await.status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.get("/articles?status=trashed", Some(archivist.as_str())).await.status, StatusCode::OK);
    assert_eq!(app.get("/articles?status=hidden", Some(archivist.as_str())).await.status, StatusCode::FORBIDDEN);
    assert_eq!(app.get("/articles?status=bogus", None).await.status, StatusCode::BAD_REQUEST);
    assert_eq!(app.get("/articles", Some("not-a-token")).await.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn trash_viewer_can_open_what_the_trash_lists() {
    let app = TestApp::spawn().await;
    let admin = Some(app.admin_token.as_str());
    let archivist = app.editor("archivist", &["trash"]).await;
    let trashed = app.article("Retracted", true).await;
    let hidden = app.article("Embargoed", false).await;
    app.send(Method::DELETE, &format!("/articles/{trashed}"), admin, None).await;

    let listed = app.get("/articles?status=trashed", Some(archivist.as_str())).await;
    assert_eq!(ids(&listed), vec![trashed]);

    let opened = app.get(&format!("/articles/{trashed}"), Some(archivist.as_str())).await;
    assert_eq!(opened.status, StatusCode::OK);
    assert_eq!(opened.data()["state"], "trashed");

    let embargoed = app.get(&format!("/articles/{hidden}"), Some(archivist.as_str())).await;
    assert_eq!(embargoed.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn anonymous_reads_count_views_and_staff_reads_do_not() {
    let app = TestApp::spawn().await;
    let a = app.article("Derby result", true).await;
    let uri = format!("/articles/{a}");

    assert_eq!(app.get(&uri, None).await.data()["views"], 1);
    assert_eq!(app.get(&uri, None).await.data()["views"], 2);
    assert_eq!(app.get(&uri, Some(app.admin_token.as_str())).await.data()["views"], 2);
}

#[tokio::test]
async fn editing_updates_fields_and_refuses_trashed_articles() {
    let app = TestApp::spawn().await;
    let admin = Some(app.admin_token.as_str());
    let title: String = Sentence(3..6).fake();
    let body: String = Paragraph(2..4).fake();
    let created = app
        .send(
            Method::POST,
            "/articles",
            admin,
            Some(json!({ "title": title, "body": body, "tags": [" city ", "", "city", "sport"], "is_urgent": true })),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.data()["tags"], json!(["city", "sport"]));
    let a = created.data()["id"].as_i64().unwrap();
    let uri = format!("/articles/{a}");

    let edited = app
        .send(Method::PUT, &uri, admin, Some(json!({ "title": "Corrected headline" })))
        .await;
    assert_eq!(edited.status, StatusCode::OK);
    assert_eq!(edited.data()["title"], "Corrected headline");
    assert_eq!(edited.data()["body"], body.as_str());

    let with_media = app
        .send(Method::PUT, &uri, admin, Some(json!({ "image_url": "https://cdn.test/lead.jpg" })))
        .await;
    assert_eq!(with_media.data()["image_url"], "https://cdn.test/lead.jpg");
    let cleared = app
        .send(Method::PUT, &uri, admin, Some(json!({ "image_url": null })))
        .await;
    assert_eq!(cleared.status, StatusCode::OK);
    assert!(cleared.data()["image_url"].is_null());
    assert_eq!(cleared.data()["title"], "Corrected headline");

    let urgent = app.get("/articles?urgent=true", None).await;
    assert_eq!(ids(&urgent), vec![a]);

    app.send(Method::DELETE, &uri, admin, None).await;
    let refused = app
        .send(Method::PUT, &uri, admin, Some(json!({ "title": "Too late" })))
        .await;
    assert_eq!(refused.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn search_matches_published_title_or_body() {
    let app = TestApp::spawn().await;
    let hit = app.article("Harbour expansion approved", true).await;
    app.article("Harbour tour", false).await;
    app.article("Weather", true).await;

    let reply = app.get("/search?q=harbour", None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(ids(&reply), vec![hit]);

    assert_eq!(app.get("/search?q=", None).await.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_ids_in_the_path_get_the_error_envelope() {
    let app = TestApp::spawn().await;
    let admin = Some(app.admin_token.as_str());

    let delete = app.send(Method::DELETE, "/articles/abc", admin, None).await;
    assert_eq!(delete.status, StatusCode::BAD_REQUEST);
    assert_eq!(delete.body["success"], false);
    assert_eq!(delete.error_kind(), Some("validation"));

    let read = app.get("/articles/12x", None).await;
    assert_eq!(read.status, StatusCode::BAD_REQUEST);
    assert_eq!(read.error_kind(), Some("validation"));

    let user = app.get("/users/me", admin).await;
    assert_eq!(user.error_kind(), Some("validation"));
}
