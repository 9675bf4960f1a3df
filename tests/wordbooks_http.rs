mod common;

use axum::http::{Method, StatusCode};

use common::app::spawn_test_server;
use common::http::{request, response_json};

#[tokio::test]
async fn it_enforces_at_most_one_active_wordbook() {
    let app = spawn_test_server().await;

    let create_a = request(
        &app.app,
        Method::POST,
        "/api/v1/wordbooks",
        Some(serde_json::json!({"name": "Book A", "language": "fr"})),
        &[],
    )
    .await;
    let (_, _, body_a) = response_json(create_a).await;
    let id_a = body_a["data"]["id"].as_str().unwrap().to_string();

    let create_b = request(
        &app.app,
        Method::POST,
        "/api/v1/wordbooks",
        Some(serde_json::json!({"name": "Book B", "language": "de"})),
        &[],
    )
    .await;
    let (_, _, body_b) = response_json(create_b).await;
    let id_b = body_b["data"]["id"].as_str().unwrap().to_string();

    let activate_a = request(&app.app, Method::POST, &format!("/api/v1/wordbooks/{id_a}/activate"), None, &[]).await;
    assert_eq!(activate_a.status(), StatusCode::OK);

    let activate_b = request(&app.app, Method::POST, &format!("/api/v1/wordbooks/{id_b}/activate"), None, &[]).await;
    assert_eq!(activate_b.status(), StatusCode::OK);

    let active = request(&app.app, Method::GET, "/api/v1/wordbooks/active", None, &[]).await;
    let (status, _, body) = response_json(active).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], id_b);
}

#[tokio::test]
async fn it_refuses_to_delete_the_active_wordbook() {
    let app = spawn_test_server().await;

    let create = request(
        &app.app,
        Method::POST,
        "/api/v1/wordbooks",
        Some(serde_json::json!({"name": "Book A", "language": "fr"})),
        &[],
    )
    .await;
    let (_, _, body) = response_json(create).await;
    let id = body["data"]["id"].as_str().unwrap().to_string();

    request(&app.app, Method::POST, &format!("/api/v1/wordbooks/{id}/activate"), None, &[]).await;

    let delete = request(&app.app, Method::DELETE, &format!("/api/v1/wordbooks/{id}"), None, &[]).await;
    assert_eq!(delete.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn it_rejects_duplicate_wordbook_names() {
    let app = spawn_test_server().await;

    let first = request(
        &app.app,
        Method::POST,
        "/api/v1/wordbooks",
        Some(serde_json::json!({"name": "Same Name", "language": "fr"})),
        &[],
    )
    .await;
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = request(
        &app.app,
        Method::POST,
        "/api/v1/wordbooks",
        Some(serde_json::json!({"name": "Same Name", "language": "de"})),
        &[],
    )
    .await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
}
