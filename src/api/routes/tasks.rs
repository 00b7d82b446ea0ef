//! Task list handler.

use super::ApiResponse;
use crate::api::AppState;
use crate::types::TaskInfo;
use axum::{Json, extract::State};

/// GET /filemanager/tasks - List tasks
///
/// Returns every registered task, then sweeps the ended ones, so a finished
/// task shows up in exactly one listing.
#[utoipa::path(
    get,
    path = "/filemanager/tasks",
    tag = "tasks",
    responses(
        (status = 200, description = "All tasks, wrapped in {success, data}", body = Vec<TaskInfo>)
    )
)]
pub async fn list_tasks(State(state): State<AppState>) -> Json<ApiResponse<Vec<TaskInfo>>> {
    ApiResponse::ok(state.manager.task_list().await)
}
