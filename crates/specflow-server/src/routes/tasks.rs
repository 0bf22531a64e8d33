use axum::extract::{Path, State};
use axum::Json;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/openspec/tasks/:task_id/status: poll one task.
pub async fn get_task_status(
    State(app): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let tasks = app.tasks.lock().await;
    let task = tasks.get(&task_id)?;
    Ok(Json(serde_json::json!({
        "success": true,
        "task": task,
    })))
}

/// GET /api/openspec/projects/:project_id/tasks: every attempt for a project, oldest first.
pub async fn list_project_tasks(
    State(app): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    app.projects.lock().await.get(&project_id)?;
    let tasks = app.tasks.lock().await;
    Ok(Json(serde_json::json!({
        "success": true,
        "tasks": tasks.list_for_project(&project_id),
    })))
}
