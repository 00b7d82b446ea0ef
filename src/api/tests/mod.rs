use super::*;
use crate::test_helpers::create_test_manager;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

mod files;

/// Router over a fresh temp directory, plus the manager behind it
async fn test_app() -> (Router, Arc<FileManager>, TempDir) {
    let (manager, temp_dir) = create_test_manager().await;
    let manager = Arc::new(manager);
    let app = create_router(manager.clone(), manager.get_config());
    (app, manager, temp_dir)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: Response<Body>) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_api_server_spawns() {
    let (manager, _temp_dir) = create_test_manager().await;

    // Port 0 = OS assigns a free port
    let mut config = (*manager.get_config()).clone();
    config.server.api.bind_address = "127.0.0.1:0".parse().unwrap();
    let config = Arc::new(config);

    let api_handle = tokio::spawn({
        let manager = Arc::new(manager);
        async move { start_api_server(manager, config).await }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!api_handle.is_finished(), "server should still be running");
    api_handle.abort();
}

#[tokio::test]
async fn test_bind_failure_is_reported() {
    let (manager, _temp_dir) = create_test_manager().await;
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();

    let mut config = (*manager.get_config()).clone();
    config.server.api.bind_address = taken.local_addr().unwrap();

    let result = start_api_server(Arc::new(manager), Arc::new(config)).await;
    assert!(matches!(result, Err(crate::Error::Io(_))));
}

#[tokio::test]
async fn test_cors_exposes_content_disposition() {
    let (app, _manager, _temp_dir) = test_app().await;

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers["access-control-allow-origin"], "*");
    let exposed = headers["access-control-expose-headers"]
        .to_str()
        .unwrap()
        .to_ascii_lowercase();
    assert!(exposed.contains("content-disposition"));
}

#[tokio::test]
async fn test_cors_disabled_adds_no_headers() {
    let (manager, _temp_dir) = create_test_manager().await;
    let mut config = (*manager.get_config()).clone();
    config.server.api.cors_enabled = false;
    let app = create_router(Arc::new(manager), Arc::new(config));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert!(!response.headers().contains_key("access-control-allow-origin"));
}

#[tokio::test]
async fn test_cors_specific_origin() {
    let (manager, _temp_dir) = create_test_manager().await;
    let mut config = (*manager.get_config()).clone();
    config.server.api.cors_origins = vec!["http://app.example".to_string()];
    let app = create_router(Arc::new(manager), Arc::new(config));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://app.example")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "http://app.example"
    );
}

#[tokio::test]
async fn test_static_client_is_served_when_configured() {
    let (manager, _temp_dir) = create_test_manager().await;
    let web = tempfile::tempdir().unwrap();
    std::fs::write(web.path().join("index.html"), "<html>client</html>").unwrap();

    let mut config = (*manager.get_config()).clone();
    config.static_dir = Some(web.path().to_path_buf());
    let app = create_router(Arc::new(manager), Arc::new(config));

    let response = app
        .oneshot(get("/react-filemanager/index.html"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"<html>client</html>");
}

#[tokio::test]
async fn test_static_client_is_absent_by_default() {
    let (app, _manager, _temp_dir) = test_app().await;

    let response = app
        .oneshot(get("/react-filemanager/index.html"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_spawn_api_server_method() {
    let (manager, _temp_dir) = create_test_manager().await;
    let mut config = (*manager.get_config()).clone();
    config.server.api.bind_address = "127.0.0.1:0".parse().unwrap();
    let manager = Arc::new(FileManager::new(config).await.unwrap());

    let api_handle = manager.spawn_api_server();
    tokio::time::sleep(Duration::from_millis(100)).await;
    api_handle.abort();
}
