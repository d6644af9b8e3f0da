/// Task endpoints
///
/// Every handler runs behind the bearer-token layer and acts for the
/// authenticated owner only. Owner fields in request bodies are ignored.
///
/// # Endpoints
///
/// - `POST   /api/tasks` - Create a task
/// - `GET    /api/tasks` - List own tasks, newest first
/// - `POST   /api/tasks/check-title` - Check title availability
/// - `GET    /api/tasks/:id` - Get an owned task
/// - `PUT    /api/tasks/:id` - Update an owned task
/// - `DELETE /api/tasks/:id` - Delete an owned task

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    wire::{deserialize_completed, deserialize_due_date, ApiJson, TaskBody},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use rtask_shared::{
    auth::middleware::AuthContext,
    models::task::{TaskInput, TaskPatch, TaskPriority, TaskStatus},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Create task request
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub priority: Option<TaskPriority>,

    #[serde(default)]
    pub status: Option<TaskStatus>,

    #[serde(default, deserialize_with = "deserialize_due_date")]
    pub due_date: Option<Option<DateTime<Utc>>>,

    /// `true`/`"Yes"` or `false`/`"No"`
    #[serde(default, deserialize_with = "deserialize_completed")]
    pub completed: Option<bool>,
}

impl From<CreateTaskRequest> for TaskInput {
    fn from(req: CreateTaskRequest) -> Self {
        TaskInput {
            title: req.title,
            description: req.description,
            priority: req.priority,
            status: req.status,
            due_date: req.due_date.flatten(),
            completed: req.completed,
        }
    }
}

/// Update task request; absent fields are left unchanged
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub priority: Option<TaskPriority>,

    #[serde(default)]
    pub status: Option<TaskStatus>,

    /// `null` or `""` clears the due date
    #[serde(default, deserialize_with = "deserialize_due_date")]
    pub due_date: Option<Option<DateTime<Utc>>>,

    #[serde(default, deserialize_with = "deserialize_completed")]
    pub completed: Option<bool>,
}

impl From<UpdateTaskRequest> for TaskPatch {
    fn from(req: UpdateTaskRequest) -> Self {
        TaskPatch {
            title: req.title,
            description: req.description,
            priority: req.priority,
            status: req.status,
            due_date: req.due_date,
            completed: req.completed,
        }
    }
}

/// Title availability request
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckTitleRequest {
    #[serde(default)]
    pub title: Option<String>,

    /// Task being edited, excluded from the check
    #[serde(default)]
    pub task_id: Option<String>,
}

/// Single task response
#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub success: bool,
    pub task: TaskBody,
}

/// Task list response
#[derive(Debug, Serialize)]
pub struct TaskListResponse {
    pub success: bool,
    pub tasks: Vec<TaskBody>,
}

/// Plain message response
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

/// Title availability response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckTitleResponse {
    pub success: bool,
    pub is_unique: bool,
}

fn task_response(task: impl Into<TaskBody>) -> Json<TaskResponse> {
    Json(TaskResponse {
        success: true,
        task: task.into(),
    })
}

/// Malformed ids can never match an owned task
fn parse_task_id(raw: &str, not_found: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::NotFound(not_found.to_string()))
}

/// Create a task
///
/// # Endpoint
///
/// ```text
/// POST /api/tasks
/// Authorization: Bearer <token>
///
/// { "title": "Write report", "priority": "High", "dueDate": "2025-03-01", "completed": "No" }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Missing title, unknown priority/status, bad date
/// - `409 Conflict`: The caller already has a task with this title
pub async fn create_task(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(req): ApiJson<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<TaskResponse>)> {
    let task = state.tasks.create(auth.owner(), req.into()).await?;
    Ok((StatusCode::CREATED, task_response(task)))
}

/// List the caller's tasks, newest first
pub async fn list_tasks(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<TaskListResponse>> {
    let tasks = state.tasks.list(auth.owner()).await?;

    Ok(Json(TaskListResponse {
        success: true,
        tasks: tasks.into_iter().map(TaskBody::from).collect(),
    }))
}

/// Get one owned task
///
/// Tasks owned by someone else answer `404`, same as missing ones.
pub async fn get_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> ApiResult<Json<TaskResponse>> {
    let id = parse_task_id(&id, "Task not found")?;
    let task = state.tasks.get(auth.owner(), id).await?;
    Ok(task_response(task))
}

/// Update an owned task
///
/// # Errors
///
/// - `400 Bad Request`: Blank title or malformed field
/// - `404 Not Found`: No owned task with this id
/// - `409 Conflict`: New title already used by another owned task
pub async fn update_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateTaskRequest>,
) -> ApiResult<Json<TaskResponse>> {
    let id = parse_task_id(&id, "Task not found or not yours")?;
    let task = state.tasks.update(auth.owner(), id, req.into()).await?;
    Ok(task_response(task))
}

/// Delete an owned task
pub async fn delete_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let id = parse_task_id(&id, "Task not found or not yours")?;
    state.tasks.delete(auth.owner(), id).await?;

    Ok(Json(MessageResponse {
        success: true,
        message: "Task deleted".to_string(),
    }))
}

/// Check whether a title is free among the caller's tasks
///
/// # Endpoint
///
/// ```text
/// POST /api/tasks/check-title
///
/// { "title": "Write report", "taskId": "<id of the task being edited>" }
/// ```
///
/// # Response
///
/// ```json
/// { "success": true, "isUnique": false }
/// ```
pub async fn check_title(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(req): ApiJson<CheckTitleRequest>,
) -> ApiResult<Json<CheckTitleResponse>> {
    let title = req.title.unwrap_or_default();
    let exclude = req
        .task_id
        .as_deref()
        .and_then(|id| Uuid::parse_str(id.trim()).ok());

    let is_unique = state
        .tasks
        .is_title_unique(auth.owner(), &title, exclude)
        .await?;

    Ok(Json(CheckTitleResponse {
        success: true,
        is_unique,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_ignores_owner_and_decodes_quirks() {
        let req: CreateTaskRequest = serde_json::from_str(
            r#"{"title": "Report", "owner": "someone-else", "completed": "Yes", "dueDate": ""}"#,
        )
        .unwrap();

        let input = TaskInput::from(req);
        assert_eq!(input.title, "Report");
        assert_eq!(input.completed, Some(true));
        assert_eq!(input.due_date, None);
    }

    #[test]
    fn test_unknown_priority_rejected() {
        let result = serde_json::from_str::<CreateTaskRequest>(r#"{"title": "x", "priority": "Urgent"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_update_request_distinguishes_absent_and_null_due_date() {
        let absent: UpdateTaskRequest = serde_json::from_str(r#"{"title": "x"}"#).unwrap();
        assert_eq!(TaskPatch::from(absent).due_date, None);

        let cleared: UpdateTaskRequest = serde_json::from_str(r#"{"dueDate": null}"#).unwrap();
        assert_eq!(TaskPatch::from(cleared).due_date, Some(None));
    }

    #[test]
    fn test_malformed_id_is_not_found() {
        assert!(matches!(
            parse_task_id("not-a-uuid", "Task not found"),
            Err(ApiError::NotFound(_))
        ));
    }
}
