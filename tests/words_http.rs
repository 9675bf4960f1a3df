mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use tower::util::ServiceExt;

use common::app::spawn_test_server;
use common::http::{request, response_json};

async fn create_and_activate_wordbook(app: &axum::Router) -> String {
    let create = request(
        app,
        Method::POST,
        "/api/v1/wordbooks",
        Some(serde_json::json!({
            "name": "French Basics",
            "language": "fr",
        })),
        &[],
    )
    .await;
    let (status, _, body) = response_json(create).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let activate = request(
        app,
        Method::POST,
        &format!("/api/v1/wordbooks/{id}/activate"),
        None,
        &[],
    )
    .await;
    let (status, _, _) = response_json(activate).await;
    assert_eq!(status, StatusCode::OK);
    id
}

fn multipart_body(wordbook_id: &str, csv: &str) -> (String, Vec<u8>) {
    let boundary = "wordflow-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"wordbookId\"\r\n\r\n{wordbook_id}\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"words.csv\"\r\nContent-Type: text/csv\r\n\r\n{csv}\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    (boundary.to_string(), body)
}

#[tokio::test]
async fn it_imports_words_and_makes_them_searchable() {
    let app = spawn_test_server().await;
    let wordbook_id = create_and_activate_wordbook(&app.app).await;

    let (boundary, body) = multipart_body(&wordbook_id, "lemma,meaning\nchat,cat\nchien,dog\n");
    let import_req = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/words/bulk")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .expect("build multipart request");

    let import_resp = app.app.clone().oneshot(import_req).await.expect("import response");
    assert_eq!(import_resp.status(), StatusCode::ACCEPTED);
    let (_, _, import_body) = response_json(import_resp).await;
    let import_id = import_body["data"]["importId"].as_str().unwrap().to_string();

    // Poll the import job until it is terminal; the supervisor runs it on a
    // background task.
    let mut job_status = String::new();
    for _ in 0..50 {
        let job = request(
            &app.app,
            Method::GET,
            &format!("/api/v1/imports/{import_id}"),
            None,
            &[],
        )
        .await;
        let (status, _, body) = response_json(job).await;
        assert_eq!(status, StatusCode::OK);
        job_status = body["data"]["status"].as_str().unwrap().to_string();
        if job_status == "completed" || job_status == "failed" {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    assert_eq!(job_status, "completed");

    let search = request(
        &app.app,
        Method::GET,
        "/api/v1/words/search?q=chat",
        None,
        &[],
    )
    .await;
    let (status, _, body) = response_json(search).await;
    assert_eq!(status, StatusCode::OK);
    let hits = body["data"]["data"].as_array().unwrap();
    assert!(hits.iter().any(|w| w["lemma"] == "chat"));
}

#[tokio::test]
async fn it_suggests_prefix_matches() {
    let app = spawn_test_server().await;
    let wordbook_id = create_and_activate_wordbook(&app.app).await;

    let (boundary, body) = multipart_body(&wordbook_id, "lemma,meaning\nchat,cat\nchateau,castle\n");
    let import_req = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/words/bulk")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .expect("build multipart request");
    let import_resp = app.app.clone().oneshot(import_req).await.expect("import response");
    assert_eq!(import_resp.status(), StatusCode::ACCEPTED);

    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    let suggest = request(
        &app.app,
        Method::GET,
        "/api/v1/words/suggest?q=cha",
        None,
        &[],
    )
    .await;
    let (status, _, body) = response_json(suggest).await;
    assert_eq!(status, StatusCode::OK);
    let suggestions = body["data"].as_array().unwrap();
    assert!(!suggestions.is_empty());
}
