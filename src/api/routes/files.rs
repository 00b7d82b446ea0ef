//! Directory and single-file handlers.

use super::{ApiResponse, CreateDirRequest, PathQuery, json_body};
use crate::api::AppState;
use crate::error::{Error, Result};
use crate::types::FileEntry;
use crate::utils::{attachment_disposition, clean_path};
use axum::{
    Json,
    body::Body,
    extract::{Query, State, rejection::JsonRejection},
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};
use tokio_util::io::ReaderStream;

/// GET /filemanager/list - List a directory
#[utoipa::path(
    get,
    path = "/filemanager/list",
    tag = "files",
    params(PathQuery),
    responses(
        (status = 200, description = "Directory entries sorted by name, wrapped in {success, data}", body = Vec<FileEntry>),
        (status = 404, description = "Directory not found", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError)
    )
)]
pub async fn list_directory(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
) -> Result<Json<ApiResponse<Vec<FileEntry>>>> {
    let entries = state.manager.list(&query.path).await?;
    Ok(ApiResponse::ok(entries))
}

/// POST /filemanager/dir/create - Create a folder
#[utoipa::path(
    post,
    path = "/filemanager/dir/create",
    tag = "files",
    request_body = CreateDirRequest,
    responses(
        (status = 200, description = "Folder created"),
        (status = 400, description = "Missing or malformed body", body = crate::error::ApiError),
        (status = 500, description = "Folder could not be created", body = crate::error::ApiError)
    )
)]
pub async fn create_directory(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreateDirRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<()>>> {
    let request = json_body(payload)?;
    if request.directory.trim().is_empty() {
        return Err(Error::InvalidRequest("directory name is empty".to_string()));
    }

    state
        .manager
        .create_dir(&request.path, &request.directory)
        .await?;
    Ok(ApiResponse::ok(()))
}

/// GET /filemanager/file/content - Download a file
///
/// The body is streamed from disk; it is never buffered whole.
#[utoipa::path(
    get,
    path = "/filemanager/file/content",
    tag = "files",
    params(PathQuery),
    responses(
        (status = 200, description = "File bytes with a Content-Disposition attachment header", content_type = "application/octet-stream"),
        (status = 404, description = "File not found", body = crate::error::ApiError),
        (status = 422, description = "Path is a directory", body = crate::error::ApiError)
    )
)]
pub async fn file_content(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
) -> Result<Response> {
    let client_path = clean_path(&query.path);
    let location = state.manager.resolve(&query.path);

    let metadata = tokio::fs::metadata(&location)
        .await
        .map_err(|e| Error::from_io(e, &client_path))?;
    if !metadata.is_file() {
        return Err(Error::NotRegularFile { path: client_path });
    }

    let file = tokio::fs::File::open(&location)
        .await
        .map_err(|e| Error::from_io(e, &client_path))?;

    let file_name = client_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let disposition = HeaderValue::from_str(&attachment_disposition(&file_name))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    tracing::debug!(path = %client_path.display(), size = metadata.len(), "Serving file");

    Ok((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/octet-stream"),
            ),
            (header::CONTENT_LENGTH, HeaderValue::from(metadata.len())),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response())
}
