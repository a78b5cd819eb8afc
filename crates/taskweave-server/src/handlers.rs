//! HTTP handlers for the control plane.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use taskweave_core::{loader, Task, TaskState};

use crate::state::AppState;

/// Error responses; the body shape is always `{"error": <message>}`.
#[derive(Debug)]
pub enum ApiError {
    NotFound(&'static str),
    BadRequest(String),
    Conflict(&'static str),
    PayloadTooLarge,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.to_string()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg.to_string()),
            ApiError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "Request entity too large".to_string(),
            ),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct TaskSummary {
    id: i32,
    name: String,
    priority: &'static str,
    state: u8,
    retry_count: u32,
    max_retries: u32,
    #[serde(rename = "type")]
    kind: String,
    worker_id: u32,
}

impl TaskSummary {
    fn from_task(task: &Task) -> Self {
        let snapshot = task.snapshot();
        TaskSummary {
            id: snapshot.id,
            name: snapshot.name,
            priority: snapshot.priority.as_str(),
            state: snapshot.state.code(),
            retry_count: snapshot.retry_count,
            max_retries: snapshot.max_retries,
            kind: snapshot.kind,
            worker_id: snapshot.worker_id,
        }
    }
}

/// GET /health
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "engine": "running",
        "timestamp": chrono::Utc::now().timestamp(),
    }))
}

/// GET /metrics and /api/metrics
pub async fn metrics_overview(State(state): State<AppState>) -> Json<serde_json::Value> {
    let mut pending = 0usize;
    let mut running = 0usize;
    let mut completed = 0usize;
    let mut failed = 0usize;

    let tasks = state.registry.all();
    for task in &tasks {
        match task.state() {
            // Not yet handed to a worker.
            TaskState::Created | TaskState::Ready | TaskState::Retrying => pending += 1,
            TaskState::Running => running += 1,
            TaskState::Completed => completed += 1,
            TaskState::Failed => failed += 1,
        }
    }

    Json(json!({
        "total_tasks": tasks.len(),
        "pending": pending,
        "running": running,
        "completed": completed,
        "failed": failed,
        "uptime_seconds": state.uptime_seconds(),
        "thread_pool_size": state.pool.size(),
    }))
}

/// GET /tasks
pub async fn list_tasks(State(state): State<AppState>) -> Json<serde_json::Value> {
    let tasks: Vec<TaskSummary> = state
        .registry
        .all()
        .iter()
        .map(|task| TaskSummary::from_task(task))
        .collect();
    Json(json!({ "tasks": tasks }))
}

/// GET /tasks/{id}
pub async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TaskSummary>, ApiError> {
    let id: i32 = id
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid task ID".to_string()))?;
    let task = state
        .registry
        .get(id)
        .ok_or(ApiError::NotFound("Task not found"))?;
    Ok(Json(TaskSummary::from_task(&task)))
}

/// POST /tasks
///
/// The body is a task document; only the first definition is taken. The
/// size check runs before any parsing so oversized bodies are rejected
/// cheaply.
pub async fn submit_task(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<serde_json::Value>, ApiError> {
    if body.len() > state.config.max_request_size {
        return Err(ApiError::PayloadTooLarge);
    }

    let definitions = loader::load_from_str(&body);
    let Some(def) = definitions.into_iter().next() else {
        warn!("rejecting task submission: no valid definition in body");
        return Err(ApiError::BadRequest("Invalid task format".to_string()));
    };

    let task = state.catalog.build(&def);
    if state.registry.register(task.clone()).is_err() {
        warn!(id = def.id, "rejecting task submission: id already exists");
        return Err(ApiError::Conflict("Task ID already exists"));
    }
    state.events.task_created(&task.snapshot());
    state.pool.submit(task);
    info!(id = def.id, "task submitted");

    Ok(Json(json!({ "status": "submitted", "task_id": def.id })))
}

/// GET / /dashboard /dashboard.html
pub async fn dashboard(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    match tokio::fs::read_to_string(&state.config.dashboard_path).await {
        Ok(contents) => Ok(Html(contents)),
        Err(_) => Err(ApiError::NotFound("Not found")),
    }
}

/// Fallback for unmatched routes.
pub async fn not_found() -> ApiError {
    ApiError::NotFound("Not found")
}
