use super::*;
use serde_json::json;

#[tokio::test]
async fn list_returns_entries_in_envelope() {
    let (app, _manager, temp_dir) = test_app().await;
    std::fs::write(temp_dir.path().join("b.txt"), b"hello").unwrap();
    std::fs::create_dir(temp_dir.path().join("a")).unwrap();

    let response = app.oneshot(get("/filemanager/list?path=/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    let entries = body["data"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["name"], "a");
    assert_eq!(entries[0]["type"], "dir");
    assert_eq!(entries[1]["name"], "b.txt");
    assert_eq!(entries[1]["type"], "file");
    assert_eq!(entries[1]["size"], 5);
    assert!(entries[1]["updatedAt"].is_string());
}

#[tokio::test]
async fn list_without_path_lists_root() {
    let (app, _manager, temp_dir) = test_app().await;
    std::fs::write(temp_dir.path().join("only.txt"), b"x").unwrap();

    let response = app.oneshot(get("/filemanager/list")).await.unwrap();

    let body = body_json(response).await;
    assert_eq!(body["data"][0]["name"], "only.txt");
}

#[tokio::test]
async fn list_missing_directory_is_404() {
    let (app, _manager, _temp_dir) = test_app().await;

    let response = app
        .oneshot(get("/filemanager/list?path=/missing"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "not_found");
    assert_eq!(body["error"]["details"]["path"], "/missing");
}

#[tokio::test]
async fn list_cannot_escape_base_directory() {
    let (app, _manager, temp_dir) = test_app().await;
    std::fs::write(temp_dir.path().join("inside.txt"), b"x").unwrap();

    let response = app
        .oneshot(get("/filemanager/list?path=../../.."))
        .await
        .unwrap();

    let body = body_json(response).await;
    assert_eq!(body["data"][0]["name"], "inside.txt");
}

#[tokio::test]
async fn create_dir_makes_folder() {
    let (app, _manager, temp_dir) = test_app().await;

    let response = app
        .oneshot(post_json(
            "/filemanager/dir/create",
            json!({"path": "/", "directory": "photos"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["success"], true);
    assert!(temp_dir.path().join("photos").is_dir());
}

#[tokio::test]
async fn create_dir_rejects_empty_name() {
    let (app, _manager, _temp_dir) = test_app().await;

    let response = app
        .oneshot(post_json(
            "/filemanager/dir/create",
            json!({"path": "/", "directory": "  "}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["code"], "invalid_request");
}

#[tokio::test]
async fn malformed_json_body_is_invalid_request() {
    let (app, _manager, _temp_dir) = test_app().await;

    let request = Request::builder()
        .method("POST")
        .uri("/filemanager/dir/create")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "invalid_request");
}

#[tokio::test]
async fn file_content_streams_with_attachment_header() {
    let (app, _manager, temp_dir) = test_app().await;
    std::fs::create_dir(temp_dir.path().join("docs")).unwrap();
    std::fs::write(temp_dir.path().join("docs/report.pdf"), b"%PDF-1.7").unwrap();

    let response = app
        .oneshot(get("/filemanager/file/content?path=/docs/report.pdf"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(
        headers["content-disposition"],
        "attachment; filename=\"report.pdf\""
    );
    assert_eq!(headers["content-type"], "application/octet-stream");
    assert_eq!(headers["content-length"], "8");

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"%PDF-1.7");
}

#[tokio::test]
async fn file_content_of_directory_is_unprocessable() {
    let (app, _manager, temp_dir) = test_app().await;
    std::fs::create_dir(temp_dir.path().join("docs")).unwrap();

    let response = app
        .oneshot(get("/filemanager/file/content?path=/docs"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body_json(response).await["error"]["code"],
        "not_regular_file"
    );
}

#[tokio::test]
async fn file_content_of_missing_file_does_not_leak_base_path() {
    let (app, _manager, temp_dir) = test_app().await;

    let response = app
        .oneshot(get("/filemanager/file/content?path=/nope.txt"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    let message = body["error"]["message"].as_str().unwrap();
    assert!(!message.contains(&*temp_dir.path().to_string_lossy()));
    assert_eq!(body["error"]["details"]["path"], "/nope.txt");
}
