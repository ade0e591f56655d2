//! Task API endpoints
//!
//! RESTful API for task CRUD and status transitions.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};

use tracker_core::task::{Task, TaskStatus};
use tracker_core::Error;

use crate::state::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskRequest {
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct ListTasksQuery {
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResponse {
    pub id: u64,
    pub description: String,
    pub status: TaskStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            description: task.description,
            status: task.status,
            created_at: task.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            updated_at: task.updated_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type RouteError = (StatusCode, Json<ErrorResponse>);

fn map_task_error(err: Error) -> RouteError {
    let status = match &err {
        Error::Validation(_) => StatusCode::BAD_REQUEST,
        Error::TaskNotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if !err.is_client_error() {
        tracing::error!("Task operation failed: {}", err);
    }
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /tasks - List tasks, optionally filtered by status
async fn list_tasks(
    State(state): State<AppState>,
    Query(query): Query<ListTasksQuery>,
) -> Result<Json<Vec<TaskResponse>>, RouteError> {
    let tasks = state
        .tasks()
        .list(query.status.as_deref())
        .await
        .map_err(map_task_error)?;

    Ok(Json(tasks.into_iter().map(TaskResponse::from).collect()))
}

/// POST /tasks - Create a new task
async fn create_task(
    State(state): State<AppState>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<TaskResponse>), RouteError> {
    let created = state
        .tasks()
        .add(&req.description)
        .await
        .map_err(map_task_error)?;

    Ok((StatusCode::CREATED, Json(TaskResponse::from(created))))
}

/// GET /tasks/:id - Get a single task
async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<TaskResponse>, RouteError> {
    let task = state.tasks().get(id).await.map_err(map_task_error)?;
    Ok(Json(TaskResponse::from(task)))
}

/// PUT /tasks/:id - Replace a task's description
async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(req): Json<UpdateTaskRequest>,
) -> Result<Json<TaskResponse>, RouteError> {
    let updated = state
        .tasks()
        .update(id, &req.description)
        .await
        .map_err(map_task_error)?;

    Ok(Json(TaskResponse::from(updated)))
}

/// DELETE /tasks/:id - Delete a task
async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<StatusCode, RouteError> {
    state.tasks().delete(id).await.map_err(map_task_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /tasks/:id/status/:status - Move a task to another status
async fn change_status(
    State(state): State<AppState>,
    Path((id, status)): Path<(u64, String)>,
) -> Result<Json<TaskResponse>, RouteError> {
    let updated = state
        .tasks()
        .change_status(id, &status)
        .await
        .map_err(map_task_error)?;

    Ok(Json(TaskResponse::from(updated)))
}

// ============================================================================
// Router
// ============================================================================

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tasks", get(list_tasks).post(create_task))
        .route(
            "/tasks/{id}",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route("/tasks/{id}/status/{status}", post(change_status))
}
