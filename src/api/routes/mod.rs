//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`files`] - Directory listing, folder creation, file download
//! - [`items`] - Batch copy, move, remove and upload
//! - [`tasks`] - Task list
//! - [`system`] - Health, OpenAPI, live event streams

use axum::Json;
use axum::extract::rejection::JsonRejection;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

mod files;
mod items;
mod system;
mod tasks;

// Re-export all handlers so `routes::function_name` works
pub use files::*;
pub use items::*;
pub use system::*;
pub use tasks::*;

// ============================================================================
// Query/Request Types (shared across handlers)
// ============================================================================

/// Query parameters naming one client path (GET /filemanager/list,
/// GET /filemanager/file/content)
#[derive(Debug, Deserialize, Serialize, utoipa::IntoParams, utoipa::ToSchema)]
#[into_params(parameter_in = Query)]
pub struct PathQuery {
    /// Client path, relative to the served root (default: "/")
    #[serde(default)]
    pub path: String,
}

/// Request body for POST /filemanager/dir/create
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct CreateDirRequest {
    /// Parent directory
    #[serde(default)]
    pub path: String,
    /// Name of the folder to create
    pub directory: String,
}

/// Request body for POST /filemanager/items/copy and /filemanager/items/move
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct ItemsRequest {
    /// Directory holding the items
    #[serde(default)]
    pub path: String,
    /// Item names inside `path`
    #[serde(default)]
    pub filenames: Vec<String>,
    /// Target directory
    pub destination: String,
}

/// Request body for POST /filemanager/items/remove
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct RemoveRequest {
    /// Directory holding the items
    #[serde(default)]
    pub path: String,
    /// Item names inside `path`
    #[serde(default)]
    pub filenames: Vec<String>,
    /// Sent by the web client; directories are always removed with their contents
    #[serde(default)]
    pub recursive: bool,
}

/// Success envelope: `{"success": true, "data": ...}`
#[derive(Debug, Deserialize, Serialize)]
pub struct ApiResponse<T> {
    /// Always true
    pub success: bool,
    /// Handler payload
    pub data: T,
}

impl<T> ApiResponse<T> {
    /// Wrap a successful payload
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
        })
    }
}

/// Turn a JSON extractor rejection into the API's error body
pub(crate) fn json_body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| Error::InvalidRequest(rejection.body_text()))
}
