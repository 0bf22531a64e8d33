use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::Json;
use specflow_core::project::DEFAULT_BRANCH_BASE;

use super::optional_json;
use crate::error::AppError;
use crate::generation::{GenerationJob, Orchestrator};
use crate::state::AppState;

#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateBody {
    pub branch_name: Option<String>,
    /// Instructions for the task agent, when one is configured.
    pub prompt: Option<String>,
}

/// POST /api/openspec/projects/:project_id/generate: start a generation
/// run and return its task id without waiting for it.
pub async fn start_generation(
    State(app): State<AppState>,
    Path(project_id): Path<String>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    let body: GenerateBody = optional_json(&body)?;
    let branch_name = body
        .branch_name
        .map(|b| b.trim().to_string())
        .filter(|b| !b.is_empty())
        .unwrap_or_else(|| DEFAULT_BRANCH_BASE.to_string());

    let project = app.projects.lock().await.get(&project_id)?.clone();
    let task = app.tasks.lock().await.create(&project.id, &branch_name);
    tracing::info!(project_id = %project.id, task_id = %task.id, branch = %branch_name, "generation started");

    Orchestrator::from_state(&app).spawn(GenerationJob {
        task_id: task.id.clone(),
        project,
        branch_name,
        prompt: body.prompt,
    });

    Ok(Json(serde_json::json!({
        "success": true,
        "taskId": task.id,
        "message": "Code generation started",
    })))
}
