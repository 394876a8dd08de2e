use axum::extract::{Path, State};
use axum::Json;

use crate::api::error::ApiError;
use crate::error::Error;
use crate::http::server::AppState;
use crate::tasks::TaskStatus;

pub async fn list_tasks(State(state): State<AppState>) -> Json<Vec<TaskStatus>> {
    Json(state.tasks.list())
}

pub async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TaskStatus>, ApiError> {
    state
        .tasks
        .get(&id)
        .map(|task| Json(task.status()))
        .ok_or_else(|| Error::NotFound(format!("task {}", id)).into())
}

/// Stop a running task; forget a finished one.
pub async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TaskStatus>, ApiError> {
    state
        .tasks
        .stop(&id)
        .map(Json)
        .ok_or_else(|| Error::NotFound(format!("task {}", id)).into())
}
