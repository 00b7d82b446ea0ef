//! REST API server module
//!
//! Serves the file manager over HTTP: directory listing, batch item
//! operations, uploads and downloads, the task list, and live task events
//! over WebSocket or server-sent events.

use crate::{Config, FileManager, Result};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, header::CONTENT_DISPOSITION},
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Mount point of the bundled web client
pub const STATIC_MOUNT: &str = "/react-filemanager";

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Files
/// - `GET /filemanager/list` - List a directory
/// - `POST /filemanager/dir/create` - Create a folder
/// - `GET /filemanager/file/content` - Download a file
///
/// ## Items (batch operations, one task per item)
/// - `POST /filemanager/items/copy` - Copy items
/// - `POST /filemanager/items/move` - Move items
/// - `POST /filemanager/items/remove` - Delete items
/// - `POST /filemanager/items/upload` - Upload files (multipart)
///
/// ## Tasks
/// - `GET /filemanager/tasks` - All tasks; ended tasks are swept afterwards
///
/// ## System
/// - `GET /ws` - WebSocket task event stream
/// - `GET /events` - Server-sent task event stream
/// - `GET /health` - Health check
/// - `GET /openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive Swagger UI documentation (if enabled)
/// - `GET /react-filemanager/*` - Web client static files (if configured)
pub fn create_router(manager: Arc<FileManager>, config: Arc<Config>) -> Router {
    let state = AppState::new(manager, config.clone());

    let upload = post(routes::upload_items)
        .layer(DefaultBodyLimit::max(config.server.api.max_upload_bytes));

    let router = Router::new()
        // Files
        .route("/filemanager/list", get(routes::list_directory))
        .route("/filemanager/dir/create", post(routes::create_directory))
        .route("/filemanager/file/content", get(routes::file_content))
        // Items
        .route("/filemanager/items/copy", post(routes::copy_items))
        .route("/filemanager/items/move", post(routes::move_items))
        .route("/filemanager/items/remove", post(routes::remove_items))
        .route("/filemanager/items/upload", upload)
        // Tasks
        .route("/filemanager/tasks", get(routes::list_tasks))
        // System
        .route("/ws", get(routes::websocket))
        .route("/events", get(routes::event_stream))
        .route("/health", get(routes::health_check))
        .route("/openapi.json", get(routes::openapi_spec));

    // Merge Swagger UI routes if enabled in config (before applying state)
    let router = if config.server.api.swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url("/openapi.json", ApiDoc::openapi()))
    } else {
        router
    };

    let router = match &config.static_dir {
        Some(dir) => router.nest_service(STATIC_MOUNT, ServeDir::new(dir)),
        None => router,
    };

    let router = router
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    // Apply CORS middleware if enabled in config (outermost)
    if config.server.api.cors_enabled {
        let cors = build_cors_layer(&config.server.api.cors_origins);
        router.layer(cors)
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// Allows all methods and headers, and exposes `Content-Disposition` so the
/// browser client can read download file names.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    let layer = if allow_any || origins.is_empty() {
        CorsLayer::new().allow_origin(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        CorsLayer::new().allow_origin(AllowOrigin::list(allowed))
    };

    layer
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([CONTENT_DISPOSITION])
}

/// Start the API server on the configured bind address.
///
/// Binds a TCP listener and serves the router until the server stops.
///
/// # Example
///
/// ```no_run
/// use filebrowser::{Config, FileManager};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::default());
/// let manager = Arc::new(FileManager::new((*config).clone()).await?);
///
/// // Start API server (blocks until shutdown)
/// filebrowser::api::start_api_server(manager, config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(manager: Arc<FileManager>, config: Arc<Config>) -> Result<()> {
    let bind_address = config.server.api.bind_address;

    tracing::info!(
        address = %bind_address,
        "Starting API server"
    );

    let app = create_router(manager, config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(
        address = %bind_address,
        "API server listening"
    );

    axum::serve(listener, app)
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
