//! Batch item handlers. Each request item becomes one task; the response
//! arrives once every item has settled.

use super::{ApiResponse, ItemsRequest, RemoveRequest, json_body};
use crate::api::AppState;
use crate::batch::UploadItem;
use crate::error::{Error, Result};
use axum::{
    Json,
    extract::{Multipart, State, rejection::JsonRejection},
};
use std::io::Cursor;

/// Multipart field names carrying files
const FILE_FIELDS: [&str; 2] = ["file[]", "file"];
/// Multipart field naming the target directory
const PATH_FIELD: &str = "path";

/// POST /filemanager/items/copy - Copy items into a directory
#[utoipa::path(
    post,
    path = "/filemanager/items/copy",
    tag = "items",
    request_body = ItemsRequest,
    responses(
        (status = 200, description = "Bytes copied per item, in request order", body = Vec<u64>),
        (status = 404, description = "An item does not exist", body = crate::error::ApiError),
        (status = 422, description = "An item is not a regular file", body = crate::error::ApiError),
        (status = 503, description = "Shutting down", body = crate::error::ApiError)
    )
)]
pub async fn copy_items(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ItemsRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<Vec<u64>>>> {
    let request = json_body(payload)?;
    let copied = state
        .manager
        .copy(&request.path, &request.filenames, &request.destination)
        .await?;
    Ok(ApiResponse::ok(copied))
}

/// POST /filemanager/items/move - Move items into a directory
#[utoipa::path(
    post,
    path = "/filemanager/items/move",
    tag = "items",
    request_body = ItemsRequest,
    responses(
        (status = 200, description = "Bytes moved per item, in request order", body = Vec<u64>),
        (status = 404, description = "An item does not exist", body = crate::error::ApiError),
        (status = 422, description = "An item is not a regular file", body = crate::error::ApiError),
        (status = 503, description = "Shutting down", body = crate::error::ApiError)
    )
)]
pub async fn move_items(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ItemsRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<Vec<u64>>>> {
    let request = json_body(payload)?;
    let moved = state
        .manager
        .move_items(&request.path, &request.filenames, &request.destination)
        .await?;
    Ok(ApiResponse::ok(moved))
}

/// POST /filemanager/items/remove - Delete items
#[utoipa::path(
    post,
    path = "/filemanager/items/remove",
    tag = "items",
    request_body = RemoveRequest,
    responses(
        (status = 200, description = "One null per removed item"),
        (status = 404, description = "An item does not exist", body = crate::error::ApiError),
        (status = 503, description = "Shutting down", body = crate::error::ApiError)
    )
)]
pub async fn remove_items(
    State(state): State<AppState>,
    payload: std::result::Result<Json<RemoveRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<Vec<()>>>> {
    let request = json_body(payload)?;
    let removed = state
        .manager
        .delete(&request.path, &request.filenames)
        .await?;
    Ok(ApiResponse::ok(removed))
}

/// POST /filemanager/items/upload - Upload files into a directory
///
/// Expects multipart fields `file[]` (repeated) and `path`, in any order.
#[utoipa::path(
    post,
    path = "/filemanager/items/upload",
    tag = "items",
    request_body(content = Vec<u8>, description = "Files as `file[]` parts plus a `path` part (multipart/form-data)", content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Bytes written per file, in upload order", body = Vec<u64>),
        (status = 400, description = "Malformed multipart body or unusable file name", body = crate::error::ApiError),
        (status = 503, description = "Shutting down", body = crate::error::ApiError)
    )
)]
pub async fn upload_items(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<Vec<u64>>>> {
    let mut destination = String::new();
    let mut uploads = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::InvalidRequest(e.body_text()))?
    {
        let name = field.name().unwrap_or("").to_string();

        if name == PATH_FIELD {
            destination = field
                .text()
                .await
                .map_err(|e| Error::InvalidRequest(e.body_text()))?;
        } else if FILE_FIELDS.contains(&name.as_str()) {
            let file_name = field.file_name().unwrap_or("").to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| Error::InvalidRequest(e.body_text()))?;
            uploads.push(UploadItem::new(file_name, Box::new(Cursor::new(bytes))));
        } else {
            tracing::debug!(field = %name, "Ignoring unknown multipart field");
        }
    }

    tracing::debug!(
        files = uploads.len(),
        destination = %destination,
        "Upload received"
    );

    let written = state.manager.upload(uploads, &destination).await?;
    Ok(ApiResponse::ok(written))
}
