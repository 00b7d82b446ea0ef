//! OpenAPI documentation and schema generation
//!
//! This module defines the OpenAPI specification for the filebrowser REST API
//! using utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the filebrowser REST API
///
/// The spec can be accessed via:
/// - `/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "filebrowser REST API",
        version = "0.1.0",
        description = "Browse, upload, download, copy, move and delete files; every batch item runs as a task whose lifecycle is pushed to clients over WebSocket or SSE",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    paths(
        // Files
        crate::api::routes::list_directory,
        crate::api::routes::create_directory,
        crate::api::routes::file_content,

        // Items
        crate::api::routes::copy_items,
        crate::api::routes::move_items,
        crate::api::routes::remove_items,
        crate::api::routes::upload_items,

        // Tasks
        crate::api::routes::list_tasks,

        // System
        crate::api::routes::websocket,
        crate::api::routes::event_stream,
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
    ),
    components(
        schemas(
            // Core types
            crate::types::TaskId,
            crate::types::TaskKind,
            crate::types::TaskStatus,
            crate::types::TaskInfo,
            crate::types::FileType,
            crate::types::FileEntry,
            crate::hub::Message,

            // Configuration types
            crate::config::Config,
            crate::config::OperationsConfig,
            crate::config::HubConfig,
            crate::config::ServerIntegrationConfig,
            crate::config::ApiConfig,

            // API request types
            crate::api::routes::PathQuery,
            crate::api::routes::CreateDirRequest,
            crate::api::routes::ItemsRequest,
            crate::api::routes::RemoveRequest,

            // Error types
            crate::error::ApiError,
            crate::error::ErrorDetail,
        )
    ),
    tags(
        (name = "files", description = "Files - Directory listing, folder creation and downloads"),
        (name = "items", description = "Items - Batch copy, move, remove and upload, one task per item"),
        (name = "tasks", description = "Tasks - Live and recently ended operations"),
        (name = "system", description = "System endpoints - Health checks, OpenAPI spec, live task events"),
    )
)]
pub struct ApiDoc;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_lists_every_route() {
        let spec = ApiDoc::openapi();

        for path in [
            "/filemanager/list",
            "/filemanager/dir/create",
            "/filemanager/file/content",
            "/filemanager/items/copy",
            "/filemanager/items/move",
            "/filemanager/items/remove",
            "/filemanager/items/upload",
            "/filemanager/tasks",
            "/ws",
            "/events",
            "/health",
            "/openapi.json",
        ] {
            assert!(
                spec.paths.paths.contains_key(path),
                "OpenAPI spec is missing {path}"
            );
        }
    }

    #[test]
    fn spec_has_task_and_file_schemas() {
        let spec = ApiDoc::openapi();
        let components = spec.components.expect("components defined");

        for schema in ["TaskInfo", "FileEntry", "Message", "ApiError", "ItemsRequest"] {
            assert!(
                components.schemas.contains_key(schema),
                "missing schema {schema}"
            );
        }
    }

    #[test]
    fn spec_has_tags() {
        let spec = ApiDoc::openapi();
        let tags = spec.tags.unwrap();
        let tag_names: Vec<&str> = tags.iter().map(|t| t.name.as_str()).collect();

        assert_eq!(tag_names, vec!["files", "items", "tasks", "system"]);
    }

    #[test]
    fn spec_info() {
        let spec = ApiDoc::openapi();

        assert_eq!(spec.info.title, "filebrowser REST API");
        assert_eq!(spec.info.version, "0.1.0");
        assert!(spec.info.description.is_some());
    }
}
